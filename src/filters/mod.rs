//! Filter primitives and the primitive description graph.
//!
//! A filter chain is turned into a [`FilterDescription`]: a flat list of
//! [`FilterPrimitiveDescription`] nodes in evaluation order.  Each node references its
//! inputs by index into the same list, or through one of the sentinel inputs like
//! `SourceGraphic`; an index always points to an earlier node.
//!
//! Each `feFoo` element lives in its own submodule, which has:
//!
//! * The `FeFoo` element struct, which parses its attributes.
//!
//! * The resolved parameters for the primitive, in filter-space units, which are carried by
//!   [`PrimitiveAttributes`].
//!
//! * The rules for how the primitive moves pixels around, used by [`crate::regions`].

use cssparser::{BasicParseError, Parser};
use tinyvec::TinyVec;

use crate::attributes::Attributes;
use crate::error::*;
use crate::length::*;
use crate::parse_identifiers;
use crate::parsers::{parse_attribute, set_attribute, CustomIdent, Parse};
use crate::rect::{IRect, Rect};
use crate::session::Session;

mod bounds;
pub use self::bounds::BoundsBuilder;

pub mod context;
use self::context::PrimitiveContext;

pub mod blend;
pub mod color_matrix;
pub mod component_transfer;
pub mod composite;
pub mod convolve_matrix;
pub mod displacement_map;
pub mod drop_shadow;
pub mod flood;
pub mod gaussian_blur;
pub mod image;
pub mod lighting;
pub mod merge;
pub mod morphology;
pub mod offset;
pub mod opacity;
pub mod tile;
pub mod turbulence;

/// Where a primitive gets one of its inputs from.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum InputRef {
    /// The element being filtered, or the output of the previous filter in the chain.
    #[default]
    SourceGraphic,

    /// The alpha channel of the element being filtered.
    SourceAlpha,

    FillPaint,
    StrokePaint,

    /// The result of an earlier primitive, by index into the description.
    Primitive(usize),
}

impl InputRef {
    pub fn primitive_index(&self) -> Option<usize> {
        match *self {
            InputRef::Primitive(i) => Some(i),
            _ => None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.primitive_index().is_none()
    }
}

/// Color space in which a primitive reads its inputs or produces its result.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    #[default]
    SRgb,
    LinearRgb,
}

/// The `color-interpolation-filters` attribute.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum ColorInterpolationFilters {
    Auto,
    #[default]
    LinearRgb,
    SRgb,
}

impl Parse for ColorInterpolationFilters {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Self, ParseError<'i>> {
        Ok(parse_identifiers!(
            parser,
            "auto" => ColorInterpolationFilters::Auto,
            "linearRGB" => ColorInterpolationFilters::LinearRgb,
            "sRGB" => ColorInterpolationFilters::SRgb,
        )?)
    }
}

impl From<ColorInterpolationFilters> for ColorSpace {
    fn from(c: ColorInterpolationFilters) -> ColorSpace {
        match c {
            ColorInterpolationFilters::LinearRgb => ColorSpace::LinearRgb,
            ColorInterpolationFilters::Auto | ColorInterpolationFilters::SRgb => ColorSpace::SRgb,
        }
    }
}

/// Resolved parameters for each kind of primitive.
///
/// All lengths are in filter-space pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveAttributes {
    /// A primitive with invalid parameters; its result is transparent black.
    Empty,
    Blend(blend::Blend),
    ColorMatrix(color_matrix::ColorMatrix),
    ComponentTransfer(component_transfer::ComponentTransfer),
    Composite(composite::Composite),
    ConvolveMatrix(convolve_matrix::ConvolveMatrix),
    DiffuseLighting(lighting::DiffuseLighting),
    DisplacementMap(displacement_map::DisplacementMap),
    DropShadow(drop_shadow::DropShadow),
    Flood(flood::Flood),
    GaussianBlur(gaussian_blur::GaussianBlur),
    Image(image::Image),
    Merge,
    Morphology(morphology::Morphology),
    Offset(offset::Offset),
    Opacity(opacity::Opacity),
    SpecularLighting(lighting::SpecularLighting),
    Tile(tile::Tile),
    ToAlpha,
    Turbulence(turbulence::Turbulence),
}

impl PrimitiveAttributes {
    #[rustfmt::skip]
    pub fn name(&self) -> &'static str {
        use PrimitiveAttributes::*;

        match self {
            Empty                => "Empty",
            Blend(..)            => "Blend",
            ColorMatrix(..)      => "ColorMatrix",
            ComponentTransfer(..)=> "ComponentTransfer",
            Composite(..)        => "Composite",
            ConvolveMatrix(..)   => "ConvolveMatrix",
            DiffuseLighting(..)  => "DiffuseLighting",
            DisplacementMap(..)  => "DisplacementMap",
            DropShadow(..)       => "DropShadow",
            Flood(..)            => "Flood",
            GaussianBlur(..)     => "GaussianBlur",
            Image(..)            => "Image",
            Merge                => "Merge",
            Morphology(..)       => "Morphology",
            Offset(..)           => "Offset",
            Opacity(..)          => "Opacity",
            SpecularLighting(..) => "SpecularLighting",
            Tile(..)             => "Tile",
            ToAlpha              => "ToAlpha",
            Turbulence(..)       => "Turbulence",
        }
    }
}

/// One node of a [`FilterDescription`].
#[derive(Debug, Clone, PartialEq)]
pub struct FilterPrimitiveDescription {
    pub attributes: PrimitiveAttributes,

    /// The result is clipped to this rectangle, in filter space.
    pub subregion: IRect,

    /// Filter region of the filter that this node belongs to, in filter space.
    pub filter_space_bounds: IRect,

    pub inputs: TinyVec<[InputRef; 2]>,
    pub input_color_spaces: TinyVec<[ColorSpace; 2]>,
    pub output_color_space: ColorSpace,

    /// Whether the result may depend on cross-origin content.
    pub is_tainted: bool,
}

impl FilterPrimitiveDescription {
    pub fn new(attributes: PrimitiveAttributes) -> FilterPrimitiveDescription {
        FilterPrimitiveDescription {
            attributes,
            subregion: IRect::default(),
            filter_space_bounds: IRect::default(),
            inputs: TinyVec::new(),
            input_color_spaces: TinyVec::new(),
            output_color_space: ColorSpace::SRgb,
            is_tainted: false,
        }
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn input(&self, index: usize) -> Option<InputRef> {
        self.inputs.get(index).copied()
    }

    /// Color space in which input `index` is read; sRGB if it was never set.
    pub fn input_color_space(&self, index: usize) -> ColorSpace {
        self.input_color_spaces
            .get(index)
            .copied()
            .unwrap_or_default()
    }

    pub fn add_input(&mut self, input: InputRef, color_space: ColorSpace) {
        self.inputs.push(input);
        self.input_color_spaces.push(color_space);
    }
}

/// The whole graph of primitives for a filter chain, in evaluation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterDescription {
    pub primitives: Vec<FilterPrimitiveDescription>,

    /// The unsnapped region of the last filter in the chain, in filter space.
    pub filter_region: Rect,
}

impl FilterDescription {
    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    pub fn last(&self) -> Option<&FilterPrimitiveDescription> {
        self.primitives.last()
    }
}

/// An enumeration of possible inputs for a filter primitive.
#[derive(Debug, Default, Clone, Eq, PartialEq, Hash)]
pub enum Input {
    #[default]
    Unspecified,
    SourceGraphic,
    SourceAlpha,
    BackgroundImage,
    BackgroundAlpha,
    FillPaint,
    StrokePaint,
    FilterOutput(CustomIdent),
}

impl Parse for Input {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Self, ParseError<'i>> {
        parser
            .try_parse(|p| {
                parse_identifiers!(
                    p,
                    "SourceGraphic" => Input::SourceGraphic,
                    "SourceAlpha" => Input::SourceAlpha,
                    "BackgroundImage" => Input::BackgroundImage,
                    "BackgroundAlpha" => Input::BackgroundAlpha,
                    "FillPaint" => Input::FillPaint,
                    "StrokePaint" => Input::StrokePaint,
                )
            })
            .or_else(|_: BasicParseError<'_>| {
                let ident = CustomIdent::parse(parser)?;
                Ok(Input::FilterOutput(ident))
            })
    }
}

/// The base filter primitive node containing common properties.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Primitive {
    pub x: Option<Length<Horizontal>>,
    pub y: Option<Length<Vertical>>,
    pub width: Option<ULength<Horizontal>>,
    pub height: Option<ULength<Vertical>>,
    pub result: Option<CustomIdent>,
    pub color_interpolation_filters: ColorInterpolationFilters,
}

impl Primitive {
    fn parse_standard_attributes(&mut self, attrs: &Attributes, session: &Session) -> (Input, Input) {
        let mut input_1 = Input::Unspecified;
        let mut input_2 = Input::Unspecified;

        for (attr, value) in attrs.iter() {
            match attr {
                "x" => set_attribute(&mut self.x, parse_attribute(attr, value), session),
                "y" => set_attribute(&mut self.y, parse_attribute(attr, value), session),
                "width" => set_attribute(&mut self.width, parse_attribute(attr, value), session),
                "height" => set_attribute(&mut self.height, parse_attribute(attr, value), session),
                "result" => set_attribute(&mut self.result, parse_attribute(attr, value), session),
                "in" => set_attribute(&mut input_1, parse_attribute(attr, value), session),
                "in2" => set_attribute(&mut input_2, parse_attribute(attr, value), session),
                "color-interpolation-filters" => set_attribute(
                    &mut self.color_interpolation_filters,
                    parse_attribute(attr, value),
                    session,
                ),
                _ => (),
            }
        }

        (input_1, input_2)
    }

    pub fn parse_no_inputs(&mut self, attrs: &Attributes, session: &Session) {
        let (_, _) = self.parse_standard_attributes(attrs, session);
    }

    pub fn parse_one_input(&mut self, attrs: &Attributes, session: &Session) -> Input {
        let (input_1, _) = self.parse_standard_attributes(attrs, session);
        input_1
    }

    pub fn parse_two_inputs(&mut self, attrs: &Attributes, session: &Session) -> (Input, Input) {
        self.parse_standard_attributes(attrs, session)
    }

    /// Whether the primitive wants its inputs in sRGB.
    pub fn operates_on_srgb(&self) -> bool {
        ColorSpace::from(self.color_interpolation_filters) == ColorSpace::SRgb
    }
}

/// A filter primitive interface.
pub trait FilterEffect {
    fn set_attributes(&mut self, attrs: &Attributes, session: &Session);

    fn primitive(&self) -> &Primitive;

    /// The primitive's inputs, in order.
    fn inputs(&self) -> Vec<Input>;

    /// Whether input `input_index` is read in sRGB, given the color space in which the
    /// input was produced.
    fn operates_on_srgb(&self, _input_index: usize, _input_is_srgb: bool) -> bool {
        self.primitive().operates_on_srgb()
    }

    /// Resolves the primitive's parameters into filter space.
    fn build(&self, ctx: &PrimitiveContext<'_>) -> PrimitiveAttributes;
}

/// A filter primitive element, as a child of a `<filter>`.
#[derive(Debug, Clone)]
pub enum FilterElement {
    Blend(blend::FeBlend),
    ColorMatrix(color_matrix::FeColorMatrix),
    ComponentTransfer(component_transfer::FeComponentTransfer),
    Composite(composite::FeComposite),
    ConvolveMatrix(convolve_matrix::FeConvolveMatrix),
    DiffuseLighting(lighting::FeDiffuseLighting),
    DisplacementMap(displacement_map::FeDisplacementMap),
    DropShadow(drop_shadow::FeDropShadow),
    Flood(flood::FeFlood),
    GaussianBlur(gaussian_blur::FeGaussianBlur),
    Image(image::FeImage),
    Merge(merge::FeMerge),
    Morphology(morphology::FeMorphology),
    Offset(offset::FeOffset),
    SpecularLighting(lighting::FeSpecularLighting),
    Tile(tile::FeTile),
    Turbulence(turbulence::FeTurbulence),
}

impl FilterElement {
    /// Creates the primitive element called `name`, or returns `None` if `name` is not a
    /// filter primitive.
    #[rustfmt::skip]
    pub fn create(name: &str, attrs: &Attributes, session: &Session) -> Option<FilterElement> {
        use FilterElement::*;

        let mut element = match name {
            "feBlend"             => Blend(Default::default()),
            "feColorMatrix"       => ColorMatrix(Default::default()),
            "feComponentTransfer" => ComponentTransfer(Default::default()),
            "feComposite"         => Composite(Default::default()),
            "feConvolveMatrix"    => ConvolveMatrix(Default::default()),
            "feDiffuseLighting"   => DiffuseLighting(Default::default()),
            "feDisplacementMap"   => DisplacementMap(Default::default()),
            "feDropShadow"        => DropShadow(Default::default()),
            "feFlood"             => Flood(Default::default()),
            "feGaussianBlur"      => GaussianBlur(Default::default()),
            "feImage"             => Image(Default::default()),
            "feMerge"             => Merge(Default::default()),
            "feMorphology"        => Morphology(Default::default()),
            "feOffset"            => Offset(Default::default()),
            "feSpecularLighting"  => SpecularLighting(Default::default()),
            "feTile"              => Tile(Default::default()),
            "feTurbulence"        => Turbulence(Default::default()),
            _ => return None,
        };

        element.as_filter_effect_mut().set_attributes(attrs, session);

        Some(element)
    }

    /// Adds a child element like `feMergeNode`, `feFuncA` or a light source.
    ///
    /// Returns `false` if this kind of primitive does not take such a child.
    pub fn add_child(&mut self, name: &str, attrs: &Attributes, session: &Session) -> bool {
        match *self {
            FilterElement::ComponentTransfer(ref mut e) => e.add_function(name, attrs, session),
            FilterElement::Merge(ref mut e) if name == "feMergeNode" => {
                e.add_node(attrs, session);
                true
            }
            FilterElement::DiffuseLighting(ref mut e) => e.add_light_source(name, attrs, session),
            FilterElement::SpecularLighting(ref mut e) => e.add_light_source(name, attrs, session),
            _ => false,
        }
    }

    #[rustfmt::skip]
    pub fn as_filter_effect(&self) -> &dyn FilterEffect {
        use FilterElement::*;

        match self {
            Blend(e)             => e,
            ColorMatrix(e)       => e,
            ComponentTransfer(e) => e,
            Composite(e)         => e,
            ConvolveMatrix(e)    => e,
            DiffuseLighting(e)   => e,
            DisplacementMap(e)   => e,
            DropShadow(e)        => e,
            Flood(e)             => e,
            GaussianBlur(e)      => e,
            Image(e)             => e,
            Merge(e)             => e,
            Morphology(e)        => e,
            Offset(e)            => e,
            SpecularLighting(e)  => e,
            Tile(e)              => e,
            Turbulence(e)        => e,
        }
    }

    #[rustfmt::skip]
    fn as_filter_effect_mut(&mut self) -> &mut dyn FilterEffect {
        use FilterElement::*;

        match self {
            Blend(e)             => e,
            ColorMatrix(e)       => e,
            ComponentTransfer(e) => e,
            Composite(e)         => e,
            ConvolveMatrix(e)    => e,
            DiffuseLighting(e)   => e,
            DisplacementMap(e)   => e,
            DropShadow(e)        => e,
            Flood(e)             => e,
            GaussianBlur(e)      => e,
            Image(e)             => e,
            Merge(e)             => e,
            Morphology(e)        => e,
            Offset(e)            => e,
            SpecularLighting(e)  => e,
            Tile(e)              => e,
            Turbulence(e)        => e,
        }
    }

    /// Whether the default subregion is the filter region, regardless of the inputs.
    pub fn uses_filter_region_as_default_subregion(&self) -> bool {
        matches!(*self, FilterElement::Tile(_)) || self.as_filter_effect().inputs().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inputs() {
        assert_eq!(Input::parse_str("SourceGraphic").unwrap(), Input::SourceGraphic);
        assert_eq!(Input::parse_str("StrokePaint").unwrap(), Input::StrokePaint);
        assert_eq!(
            Input::parse_str("blur").unwrap(),
            Input::FilterOutput(CustomIdent("blur".to_string()))
        );
        assert!(Input::parse_str("inherit").is_err());
        assert!(Input::parse_str("").is_err());
    }

    #[test]
    fn parses_color_interpolation_filters() {
        assert_eq!(
            ColorInterpolationFilters::parse_str("sRGB").unwrap(),
            ColorInterpolationFilters::SRgb
        );
        assert_eq!(
            ColorSpace::from(ColorInterpolationFilters::Auto),
            ColorSpace::SRgb
        );
        assert_eq!(
            ColorSpace::from(ColorInterpolationFilters::default()),
            ColorSpace::LinearRgb
        );
    }

    #[test]
    fn parses_standard_attributes() {
        let session = Session::new_with_logging(false);
        let attrs: Attributes = [
            ("x", "10"),
            ("width", "-5"),
            ("result", "r"),
            ("in", "SourceAlpha"),
            ("in2", "r0"),
        ]
        .into_iter()
        .collect();

        let mut p = Primitive::default();
        let (in1, in2) = p.parse_two_inputs(&attrs, &session);

        assert_eq!(in1, Input::SourceAlpha);
        assert_eq!(in2, Input::FilterOutput(CustomIdent("r0".to_string())));
        assert_eq!(p.x, Some(Length::new(10.0, LengthUnit::Px)));
        // negative width is ignored
        assert_eq!(p.width, None);
        assert_eq!(p.result, Some(CustomIdent("r".to_string())));
    }

    #[test]
    fn creates_known_elements_only() {
        let session = Session::new_with_logging(false);
        let attrs = Attributes::new();

        assert!(matches!(
            FilterElement::create("feOffset", &attrs, &session),
            Some(FilterElement::Offset(_))
        ));
        assert!(FilterElement::create("rect", &attrs, &session).is_none());
    }

    #[test]
    fn merge_takes_merge_nodes() {
        let session = Session::new_with_logging(false);
        let attrs = Attributes::new();

        let mut merge = FilterElement::create("feMerge", &attrs, &session).unwrap();
        assert!(merge.uses_filter_region_as_default_subregion());

        assert!(merge.add_child("feMergeNode", &attrs, &session));
        assert!(!merge.add_child("feFuncA", &attrs, &session));
        assert_eq!(merge.as_filter_effect().inputs(), vec![Input::Unspecified]);
        assert!(!merge.uses_filter_region_as_default_subregion());
    }
}
