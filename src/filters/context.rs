//! Building the primitive descriptions for one `<filter>` element.
//!
//! An [`SVGFilterInstance`] resolves the filter region of a `<filter>` for the element
//! being filtered, and appends one [`FilterPrimitiveDescription`] per primitive element
//! to the description of the whole chain.

use std::collections::HashMap;
use std::f64::consts::SQRT_2;

use crate::color::RGBA;
use crate::coord_units::CoordUnits;
use crate::error::FilterResolveError;
use crate::filter::SvgFilter;
use crate::length::{NormalizeParams, UserSpaceMetrics};
use crate::parsers::CustomIdent;
use crate::rect::{IRect, Rect};
use crate::session::Session;

use super::bounds::BoundsBuilder;
use super::{
    ColorSpace, FilterElement, FilterPrimitiveDescription, Input, InputRef, Primitive,
    PrimitiveAttributes,
};

/// Everything a primitive needs to resolve its parameters into filter space.
pub struct PrimitiveContext<'a> {
    instance: &'a SVGFilterInstance<'a>,
    subregion: IRect,
    input_subregions: &'a [IRect],
}

impl<'a> PrimitiveContext<'a> {
    /// The primitive's subregion, already clipped to the filter region.
    pub fn subregion(&self) -> IRect {
        self.subregion
    }

    /// Subregion of the node used as input `index`; the filter region for standard inputs.
    pub fn input_subregion(&self, index: usize) -> IRect {
        self.input_subregions
            .get(index)
            .copied()
            .unwrap_or(self.instance.filter_space_bounds)
    }

    /// The value of `color` for the element being filtered, used for `currentColor`.
    pub fn current_color(&self) -> RGBA {
        self.instance.current_color
    }

    pub fn session(&self) -> &Session {
        self.instance.session
    }

    pub fn user_space_to_filter_space_scale(&self) -> (f64, f64) {
        self.instance.scale
    }

    /// Converts a horizontal number in primitiveUnits into filter-space pixels.
    pub fn number_x(&self, v: f64) -> f64 {
        self.instance.primitive_number(v, Axis::X)
    }

    /// Converts a vertical number in primitiveUnits into filter-space pixels.
    pub fn number_y(&self, v: f64) -> f64 {
        self.instance.primitive_number(v, Axis::Y)
    }

    /// Converts a number that has no orientation, like a radius, into filter-space pixels.
    pub fn number(&self, v: f64) -> f64 {
        self.instance.primitive_number(v, Axis::Both)
    }

    pub fn number_pair(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (self.number_x(x), self.number_y(y))
    }

    /// Converts a point in primitiveUnits, like a light position, into filter space.
    pub fn point(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        let inst = self.instance;
        let (sx, sy) = inst.scale;

        let (x, y) = match inst.primitive_units {
            CoordUnits::UserSpaceOnUse => (x, y),
            CoordUnits::ObjectBoundingBox => (
                inst.target_bbox.x0 + x * inst.target_bbox.width(),
                inst.target_bbox.y0 + y * inst.target_bbox.height(),
            ),
        };

        (x * sx, y * sy, self.number(z))
    }
}

#[derive(Copy, Clone)]
enum Axis {
    X,
    Y,
    Both,
}

/// Length of the diagonal of a `w` by `h` rectangle, divided by `sqrt(2)`.
fn normalized_hypot(w: f64, h: f64) -> f64 {
    w.hypot(h) / SQRT_2
}

/// Builds the primitive descriptions of a single `<filter>` element.
pub struct SVGFilterInstance<'a> {
    filter: &'a SvgFilter,
    session: &'a Session,

    /// Bounding box of the element being filtered, in user space.
    target_bbox: Rect,

    scale: (f64, f64),
    params: NormalizeParams,
    primitive_units: CoordUnits,
    current_color: RGBA,

    /// The filter region in filter space, before snapping to pixels.
    filter_region: Rect,

    /// The filter region in filter space, rounded out.
    filter_space_bounds: IRect,

    /// Index of the node that `SourceGraphic` refers to, or `None` for the first filter.
    source_graphic_index: Option<usize>,

    /// The `SourceAlpha` input, once it has been requested.
    source_alpha: Option<InputRef>,
}

impl<'a> SVGFilterInstance<'a> {
    /// Resolves the filter region of `filter` for an element with the given bounding box.
    ///
    /// `scale` converts user space into filter space.
    pub fn new(
        filter: &'a SvgFilter,
        target_bbox: Rect,
        scale: (f64, f64),
        metrics: &dyn UserSpaceMetrics,
        current_color: RGBA,
        session: &'a Session,
    ) -> Result<SVGFilterInstance<'a>, FilterResolveError> {
        let params = NormalizeParams::new(metrics);

        let user_space_region = filter.resolve_region(&target_bbox, &params)?;
        let filter_region = user_space_region.scale(scale.0, scale.1);

        let filter_space_bounds = filter_region
            .to_irect_checked()
            .ok_or(FilterResolveError::Overflow)?;

        if filter_space_bounds.is_empty() {
            return Err(FilterResolveError::InvalidFilterRegion);
        }

        Ok(SVGFilterInstance {
            filter,
            session,
            target_bbox,
            scale,
            params,
            primitive_units: filter.primitive_units(),
            current_color,
            filter_region,
            filter_space_bounds,
            source_graphic_index: None,
            source_alpha: None,
        })
    }

    pub fn filter_region(&self) -> Rect {
        self.filter_region
    }

    pub fn filter_space_bounds(&self) -> IRect {
        self.filter_space_bounds
    }

    /// Appends the primitives of the filter to `descriptions`.
    ///
    /// The nodes already in `descriptions` come from earlier entries in the filter chain;
    /// the last one is this filter's `SourceGraphic`.
    pub fn build_primitives(
        &mut self,
        descriptions: &mut Vec<FilterPrimitiveDescription>,
        input_is_tainted: bool,
    ) -> Result<(), FilterResolveError> {
        self.source_graphic_index = descriptions.len().checked_sub(1);
        self.source_alpha = None;

        // Clip the previous filter's output to this filter's region.
        if let Some(i) = self.source_graphic_index {
            let descr = &mut descriptions[i];
            descr.subregion = descr.subregion.intersect(&self.filter_space_bounds);
        }

        let mut results: HashMap<CustomIdent, usize> = HashMap::new();

        let filter = self.filter;

        for element in filter.primitives() {
            let effect = element.as_filter_effect();

            let mut inputs = Vec::new();
            for input in effect.inputs() {
                inputs.push(self.resolve_input(&input, descriptions, &results)?);
            }

            let subregion = self.compute_subregion(element, &inputs, descriptions);

            let input_subregions: Vec<IRect> = inputs
                .iter()
                .map(|&(input, standard)| match input {
                    InputRef::Primitive(k) if !standard => descriptions[k].subregion,
                    _ => self.filter_space_bounds,
                })
                .collect();

            let attributes = {
                let ctx = PrimitiveContext {
                    instance: self,
                    subregion,
                    input_subregions: &input_subregions,
                };

                effect.build(&ctx)
            };

            let mut descr = FilterPrimitiveDescription::new(attributes);

            let inputs_tainted = inputs.iter().any(|&(input, _)| match input {
                InputRef::Primitive(k) => descriptions[k].is_tainted,
                _ => input_is_tainted,
            });

            let image_is_cross_origin = matches!(
                descr.attributes,
                PrimitiveAttributes::Image(ref image) if image.image.cross_origin
            );

            descr.is_tainted = inputs_tainted || image_is_cross_origin;
            descr.filter_space_bounds = self.filter_space_bounds;
            descr.subregion = subregion;

            for (i, &(input, _)) in inputs.iter().enumerate() {
                let input_space = match input {
                    InputRef::Primitive(k) => descriptions[k].output_color_space,
                    _ => ColorSpace::SRgb,
                };

                let desired = if effect.operates_on_srgb(i, input_space == ColorSpace::SRgb) {
                    ColorSpace::SRgb
                } else {
                    ColorSpace::LinearRgb
                };

                descr.add_input(input, desired);

                if i == 0 {
                    descr.output_color_space = desired;
                }
            }

            if inputs.is_empty() {
                descr.output_color_space = if effect.operates_on_srgb(0, true) {
                    ColorSpace::SRgb
                } else {
                    ColorSpace::LinearRgb
                };
            }

            descriptions.push(descr);

            if let Some(ref name) = effect.primitive().result {
                results.insert(name.clone(), descriptions.len() - 1);
            }
        }

        Ok(())
    }

    /// Index of the last node in the chain so far.
    fn last_result(descriptions: &[FilterPrimitiveDescription]) -> InputRef {
        match descriptions.len() {
            0 => InputRef::SourceGraphic,
            n => InputRef::Primitive(n - 1),
        }
    }

    fn source_graphic(&self) -> InputRef {
        self.source_graphic_index
            .map_or(InputRef::SourceGraphic, InputRef::Primitive)
    }

    /// Resolves an input to a node index or sentinel, and whether it is a standard input.
    fn resolve_input(
        &mut self,
        input: &Input,
        descriptions: &mut Vec<FilterPrimitiveDescription>,
        results: &HashMap<CustomIdent, usize>,
    ) -> Result<(InputRef, bool), FilterResolveError> {
        let input_ref = match *input {
            Input::SourceGraphic => self.source_graphic(),
            Input::SourceAlpha => self.get_or_create_source_alpha(descriptions),
            Input::FillPaint => InputRef::FillPaint,
            Input::StrokePaint => InputRef::StrokePaint,
            Input::BackgroundImage => {
                return Err(FilterResolveError::UnsupportedInput(
                    "BackgroundImage".to_string(),
                ))
            }
            Input::BackgroundAlpha => {
                return Err(FilterResolveError::UnsupportedInput(
                    "BackgroundAlpha".to_string(),
                ))
            }
            Input::Unspecified => Self::last_result(descriptions),
            Input::FilterOutput(ref name) => match results.get(name) {
                Some(&i) => InputRef::Primitive(i),
                None => {
                    fegraph_log!(
                        self.session,
                        "filter primitive input \"{}\" not found, using the last result",
                        name.0
                    );
                    Self::last_result(descriptions)
                }
            },
        };

        let standard = input_ref.is_sentinel()
            || input_ref.primitive_index() == self.source_graphic_index;

        Ok((input_ref, standard))
    }

    /// For the first filter in the chain, `SourceAlpha` is a sentinel; otherwise it is a
    /// node that extracts the alpha of the previous filter's output, created on first use.
    fn get_or_create_source_alpha(
        &mut self,
        descriptions: &mut Vec<FilterPrimitiveDescription>,
    ) -> InputRef {
        if let Some(input) = self.source_alpha {
            return input;
        }

        let input = match self.source_graphic_index {
            None => InputRef::SourceAlpha,

            Some(source) => {
                let source_descr = &descriptions[source];
                let color_space = source_descr.output_color_space;

                let mut descr = FilterPrimitiveDescription::new(PrimitiveAttributes::ToAlpha);
                descr.add_input(InputRef::Primitive(source), color_space);
                descr.output_color_space = color_space;
                descr.subregion = source_descr.subregion;
                descr.filter_space_bounds = self.filter_space_bounds;
                descr.is_tainted = source_descr.is_tainted;

                descriptions.push(descr);
                InputRef::Primitive(descriptions.len() - 1)
            }
        };

        self.source_alpha = Some(input);
        input
    }

    fn compute_subregion(
        &self,
        element: &FilterElement,
        inputs: &[(InputRef, bool)],
        descriptions: &[FilterPrimitiveDescription],
    ) -> IRect {
        let (x, y, width, height) = self.resolve_primitive_rect(element.as_filter_effect().primitive());

        let mut bounds = BoundsBuilder::new(self.filter_space_bounds, x, y, width, height);

        if element.uses_filter_region_as_default_subregion() {
            bounds = bounds.add_standard_input();
        } else {
            for &(input, standard) in inputs {
                bounds = match input {
                    InputRef::Primitive(k) if !standard => bounds.add_input(&descriptions[k].subregion),
                    _ => bounds.add_standard_input(),
                };
            }
        }

        bounds.into_irect()
    }

    /// Resolves the primitive's `x`, `y`, `width`, `height` into filter space.
    fn resolve_primitive_rect(
        &self,
        primitive: &Primitive,
    ) -> (Option<f64>, Option<f64>, Option<f64>, Option<f64>) {
        let (sx, sy) = self.scale;
        let bbox = &self.target_bbox;

        match self.primitive_units {
            CoordUnits::UserSpaceOnUse => {
                let params = &self.params;

                (
                    primitive.x.map(|l| l.to_user(params) * sx),
                    primitive.y.map(|l| l.to_user(params) * sy),
                    primitive.width.map(|l| l.to_user(params) * sx),
                    primitive.height.map(|l| l.to_user(params) * sy),
                )
            }

            CoordUnits::ObjectBoundingBox => {
                let params = self.params.for_object_bounding_box();

                (
                    primitive
                        .x
                        .map(|l| (bbox.x0 + l.to_user(&params) * bbox.width()) * sx),
                    primitive
                        .y
                        .map(|l| (bbox.y0 + l.to_user(&params) * bbox.height()) * sy),
                    primitive
                        .width
                        .map(|l| l.to_user(&params) * bbox.width() * sx),
                    primitive
                        .height
                        .map(|l| l.to_user(&params) * bbox.height() * sy),
                )
            }
        }
    }

    fn primitive_number(&self, v: f64, axis: Axis) -> f64 {
        let (sx, sy) = self.scale;
        let bbox = &self.target_bbox;
        let obb = self.primitive_units == CoordUnits::ObjectBoundingBox;

        match axis {
            Axis::X => {
                let v = if obb { v * bbox.width() } else { v };
                v * sx
            }

            Axis::Y => {
                let v = if obb { v * bbox.height() } else { v };
                v * sy
            }

            Axis::Both => {
                let v = if obb {
                    v * normalized_hypot(bbox.width(), bbox.height())
                } else {
                    v
                };
                v * normalized_hypot(sx, sy)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::Attributes;
    use crate::color::RGBA;
    use crate::filters::offset::Offset;
    use crate::length::SimpleUserSpaceMetrics;
    use matches::matches;

    fn filter(attrs: &[(&str, &str)], children: &[(&str, &[(&str, &str)])]) -> SvgFilter {
        let session = Session::new_with_logging(false);
        let attrs: Attributes = attrs.iter().copied().collect();
        let mut filter = SvgFilter::new(&attrs, &session);

        for &(name, attrs) in children {
            let attrs: Attributes = attrs.iter().copied().collect();
            filter.add_primitive(name, &attrs, &session);
        }

        filter
    }

    fn build(
        filter: &SvgFilter,
        descriptions: &mut Vec<FilterPrimitiveDescription>,
        tainted: bool,
    ) -> Result<IRect, FilterResolveError> {
        let session = Session::new_with_logging(false);
        let metrics = SimpleUserSpaceMetrics::default();
        let mut instance = SVGFilterInstance::new(
            filter,
            Rect::new(0.0, 0.0, 100.0, 100.0),
            (1.0, 1.0),
            &metrics,
            RGBA::new(0, 0, 0, 255),
            &session,
        )?;

        instance.build_primitives(descriptions, tainted)?;
        Ok(instance.filter_space_bounds())
    }

    #[test]
    fn default_filter_region_is_larger_than_bbox() {
        let f = filter(&[], &[("feOffset", &[("dx", "5")])]);
        let mut descrs = Vec::new();

        let bounds = build(&f, &mut descrs, false).unwrap();
        assert_eq!(bounds, IRect::new(-10, -10, 110, 110));

        assert_eq!(descrs.len(), 1);
        assert_eq!(descrs[0].subregion, bounds);
        assert_eq!(descrs[0].inputs.as_slice(), &[InputRef::SourceGraphic]);
        assert_eq!(
            descrs[0].attributes,
            PrimitiveAttributes::Offset(Offset { dx: 5.0, dy: 0.0 })
        );
    }

    #[test]
    fn empty_filter_region_fails() {
        let f = filter(&[("width", "0")], &[("feOffset", &[])]);
        let mut descrs = Vec::new();

        assert_eq!(
            build(&f, &mut descrs, false),
            Err(FilterResolveError::InvalidFilterRegion)
        );
    }

    #[test]
    fn background_image_is_unsupported() {
        let f = filter(&[], &[("feOffset", &[("in", "BackgroundImage")])]);
        let mut descrs = Vec::new();

        assert!(matches!(
            build(&f, &mut descrs, false),
            Err(FilterResolveError::UnsupportedInput(_))
        ));
    }

    #[test]
    fn resolves_named_results() {
        let f = filter(
            &[],
            &[
                ("feFlood", &[("result", "a"), ("width", "10")]),
                ("feOffset", &[("in", "SourceGraphic")]),
                ("feComposite", &[("in", "a"), ("in2", "nonexistent")]),
            ],
        );
        let mut descrs = Vec::new();
        build(&f, &mut descrs, false).unwrap();

        assert_eq!(descrs.len(), 3);
        assert_eq!(descrs[0].inputs.len(), 0);
        assert_eq!(descrs[0].subregion, IRect::new(-10, -10, 0, 110));
        assert_eq!(
            descrs[2].inputs.as_slice(),
            &[InputRef::Primitive(0), InputRef::Primitive(1)]
        );
    }

    #[test]
    fn source_alpha_of_later_filter_is_a_node() {
        let f1 = filter(&[], &[("feOffset", &[])]);
        let f2 = filter(
            &[],
            &[
                ("feOffset", &[("in", "SourceAlpha")]),
                ("feOffset", &[("in", "SourceAlpha")]),
            ],
        );

        let mut descrs = Vec::new();
        build(&f1, &mut descrs, false).unwrap();
        build(&f2, &mut descrs, false).unwrap();

        assert_eq!(descrs.len(), 4);
        assert_eq!(descrs[1].attributes, PrimitiveAttributes::ToAlpha);
        assert_eq!(descrs[1].inputs.as_slice(), &[InputRef::Primitive(0)]);
        assert_eq!(descrs[2].inputs.as_slice(), &[InputRef::Primitive(1)]);
        assert_eq!(descrs[3].inputs.as_slice(), &[InputRef::Primitive(1)]);
    }

    #[test]
    fn color_spaces() {
        let f = filter(
            &[],
            &[
                ("feGaussianBlur", &[("stdDeviation", "2")]),
                ("feOffset", &[("color-interpolation-filters", "sRGB")]),
                ("feFlood", &[("color-interpolation-filters", "sRGB")]),
            ],
        );
        let mut descrs = Vec::new();
        build(&f, &mut descrs, false).unwrap();

        assert_eq!(descrs[0].input_color_space(0), ColorSpace::LinearRgb);
        assert_eq!(descrs[0].output_color_space, ColorSpace::LinearRgb);

        // feOffset keeps the color space of its input
        assert_eq!(descrs[1].input_color_space(0), ColorSpace::LinearRgb);
        assert_eq!(descrs[1].output_color_space, ColorSpace::LinearRgb);

        assert_eq!(descrs[2].output_color_space, ColorSpace::SRgb);
    }

    #[test]
    fn taint_comes_from_inputs() {
        let f = filter(
            &[],
            &[
                ("feFlood", &[("result", "flood")]),
                ("feOffset", &[("in", "SourceGraphic")]),
                ("feOffset", &[("in", "flood")]),
            ],
        );
        let mut descrs = Vec::new();
        build(&f, &mut descrs, true).unwrap();

        assert!(!descrs[0].is_tainted);
        assert!(descrs[1].is_tainted);
        assert!(!descrs[2].is_tainted);
    }

    #[test]
    fn object_bounding_box_primitive_units() {
        let f = filter(
            &[("primitiveUnits", "objectBoundingBox")],
            &[("feOffset", &[("dx", "0.1"), ("x", "0.5"), ("width", "25%")])],
        );
        let mut descrs = Vec::new();
        build(&f, &mut descrs, false).unwrap();

        assert_eq!(descrs[0].subregion, IRect::new(50, -10, 75, 110));
        assert_eq!(
            descrs[0].attributes,
            PrimitiveAttributes::Offset(Offset { dx: 10.0, dy: 0.0 })
        );
    }
}
