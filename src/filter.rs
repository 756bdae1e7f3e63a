//! The `filter` element, and the value of the `filter` property.

use cssparser::Parser;
use std::collections::HashMap;
use std::slice::Iter;

use crate::attributes::Attributes;
use crate::coord_units;
use crate::coord_units::CoordUnits;
use crate::error::*;
use crate::filter_func::FilterFunction;
use crate::filters::image::ImageInfo;
use crate::filters::FilterElement;
use crate::length::*;
use crate::parsers::{parse_attribute, set_attribute, Parse};
use crate::rect::Rect;
use crate::session::Session;

coord_units!(FilterUnits, CoordUnits::ObjectBoundingBox);

coord_units!(PrimitiveUnits, CoordUnits::UserSpaceOnUse);

/// The `<filter>` element, with its primitive children.
#[derive(Debug, Clone)]
pub struct SvgFilter {
    id: Option<String>,
    x: Length<Horizontal>,
    y: Length<Vertical>,
    width: ULength<Horizontal>,
    height: ULength<Vertical>,
    filter_units: FilterUnits,
    primitive_units: PrimitiveUnits,
    primitives: Vec<FilterElement>,
}

impl Default for SvgFilter {
    /// Constructs a new `SvgFilter` with default properties.
    fn default() -> Self {
        Self {
            id: None,
            x: Length::new(-0.1, LengthUnit::Percent),
            y: Length::new(-0.1, LengthUnit::Percent),
            width: ULength::new(1.2, LengthUnit::Percent),
            height: ULength::new(1.2, LengthUnit::Percent),
            filter_units: Default::default(),
            primitive_units: Default::default(),
            primitives: Vec::new(),
        }
    }
}

/// With objectBoundingBox units, lengths are fractions or percentages of the bounding box.
fn check_units<N: Normalize, V: Validate>(
    length: CssLength<N, V>,
    object_bounding_box: bool,
) -> Result<CssLength<N, V>, ValueErrorKind> {
    if !object_bounding_box {
        return Ok(length);
    }

    match length.unit {
        LengthUnit::Px | LengthUnit::Percent => Ok(length),
        _ => Err(ValueErrorKind::parse_error(
            "unit identifiers are not allowed with filterUnits set to objectBoundingBox",
        )),
    }
}

impl SvgFilter {
    pub fn new(attrs: &Attributes, session: &Session) -> SvgFilter {
        let mut filter = SvgFilter::default();

        // Parse filterUnits first as it affects x, y, width, height checks.
        if let Some(value) = attrs.get("filterUnits") {
            set_attribute(
                &mut filter.filter_units,
                parse_attribute("filterUnits", value),
                session,
            );
        }

        let obb = filter.filter_units() == CoordUnits::ObjectBoundingBox;

        for (attr, value) in attrs.iter() {
            match attr {
                "id" => filter.id = Some(value.to_string()),
                "x" => set_attribute(
                    &mut filter.x,
                    parse_attribute(attr, value).and_then(|l| check_units(l, obb).attribute(attr)),
                    session,
                ),
                "y" => set_attribute(
                    &mut filter.y,
                    parse_attribute(attr, value).and_then(|l| check_units(l, obb).attribute(attr)),
                    session,
                ),
                "width" => set_attribute(
                    &mut filter.width,
                    parse_attribute(attr, value).and_then(|l| check_units(l, obb).attribute(attr)),
                    session,
                ),
                "height" => set_attribute(
                    &mut filter.height,
                    parse_attribute(attr, value).and_then(|l| check_units(l, obb).attribute(attr)),
                    session,
                ),
                "primitiveUnits" => set_attribute(
                    &mut filter.primitive_units,
                    parse_attribute(attr, value),
                    session,
                ),
                _ => (),
            }
        }

        filter
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn filter_units(&self) -> CoordUnits {
        self.filter_units.into()
    }

    pub fn primitive_units(&self) -> CoordUnits {
        self.primitive_units.into()
    }

    pub fn primitives(&self) -> &[FilterElement] {
        &self.primitives
    }

    /// Appends a primitive element called `name`.
    ///
    /// Returns the new element so that children like `feMergeNode` can be added to it, or
    /// `None` if `name` is not a filter primitive; such elements are ignored.
    pub fn add_primitive(
        &mut self,
        name: &str,
        attrs: &Attributes,
        session: &Session,
    ) -> Option<&mut FilterElement> {
        match FilterElement::create(name, attrs, session) {
            Some(element) => {
                self.primitives.push(element);
                self.primitives.last_mut()
            }

            None => {
                fegraph_log!(session, "ignoring unknown filter primitive <{}>", name);
                None
            }
        }
    }

    /// Supplies the size and origin of an image once the host has loaded it, for every
    /// `feImage` that references `href`.
    pub fn set_image_info(&mut self, href: &str, info: ImageInfo) {
        for element in self.primitives.iter_mut() {
            if let FilterElement::Image(ref mut image) = *element {
                if image.href() == Some(href) {
                    image.set_image_info(info);
                }
            }
        }
    }

    /// Computes the filter region in user space for an element with bounding box `bbox`.
    pub fn resolve_region(
        &self,
        bbox: &Rect,
        params: &NormalizeParams,
    ) -> Result<Rect, FilterResolveError> {
        let (x, y, w, h) = match self.filter_units() {
            CoordUnits::UserSpaceOnUse => (
                self.x.to_user(params),
                self.y.to_user(params),
                self.width.to_user(params),
                self.height.to_user(params),
            ),

            CoordUnits::ObjectBoundingBox => {
                if bbox.is_empty() {
                    return Err(FilterResolveError::EmptyBoundingBox);
                }

                let params = params.for_object_bounding_box();

                (
                    bbox.x0 + self.x.to_user(&params) * bbox.width(),
                    bbox.y0 + self.y.to_user(&params) * bbox.height(),
                    self.width.to_user(&params) * bbox.width(),
                    self.height.to_user(&params) * bbox.height(),
                )
            }
        };

        Ok(Rect::new(x, y, x + w, y + h))
    }
}

/// One entry of the `filter` property.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Reference to a `<filter>` element.
    Url(String),
    Function(FilterFunction),
}

impl FilterValue {
    pub fn is_url(&self) -> bool {
        matches!(*self, FilterValue::Url(_))
    }
}

/// The value of the `filter` property: a chain of filters applied in order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FilterValueList(Vec<FilterValue>);

impl FilterValueList {
    pub fn new(values: Vec<FilterValue>) -> FilterValueList {
        FilterValueList(values)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> Iter<'_, FilterValue> {
        self.0.iter()
    }

    /// Resolves every `url()` entry to its `<filter>` element, in order.
    ///
    /// Returns `None` if any reference is invalid; the chain must not be applied then.
    pub fn resolve_frames<'a>(
        &self,
        resolver: &'a dyn FilterFrameResolver,
        session: &Session,
    ) -> Option<Vec<&'a SvgFilter>> {
        let mut frames = Vec::new();

        for value in self.iter() {
            if let FilterValue::Url(ref url) = *value {
                match resolver.resolve_filter(url) {
                    Ok(filter) => frames.push(filter),
                    Err(e) => {
                        fegraph_log!(session, "filter \"{}\" will not be applied: {}", url, e);
                        return None;
                    }
                }
            }
        }

        Some(frames)
    }
}

impl Parse for FilterValueList {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Self, ParseError<'i>> {
        let mut result = FilterValueList::default();

        if parser
            .try_parse(|p| p.expect_ident_matching("none"))
            .is_ok()
        {
            return Ok(result);
        }

        loop {
            if let Ok(url) = parser.try_parse(|p| p.expect_url()) {
                result.0.push(FilterValue::Url(url.as_ref().to_string()));
            } else {
                let func = FilterFunction::parse(parser)?;
                result.0.push(FilterValue::Function(func));
            }

            if parser.is_exhausted() {
                break;
            }
        }

        Ok(result)
    }
}

/// Finds the `<filter>` element for a `url()` entry of a filter chain.
pub trait FilterFrameResolver {
    fn resolve_filter(&self, url: &str) -> Result<&SvgFilter, FilterResolveError>;
}

/// The `<filter>` elements of a document, by id.
///
/// Only same-document references like `url(#blur)` are resolved.
#[derive(Debug, Default, Clone)]
pub struct FilterDefs {
    filters: HashMap<String, SvgFilter>,
}

impl FilterDefs {
    pub fn new() -> FilterDefs {
        FilterDefs::default()
    }

    /// Adds a filter under its id; filters without an id cannot be referenced and are
    /// dropped.  Returns whether the filter was added.
    pub fn insert(&mut self, filter: SvgFilter) -> bool {
        match filter.id().map(str::to_string) {
            Some(id) => {
                self.filters.insert(id, filter);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&SvgFilter> {
        self.filters.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut SvgFilter> {
        self.filters.get_mut(id)
    }
}

impl FilterFrameResolver for FilterDefs {
    fn resolve_filter(&self, url: &str) -> Result<&SvgFilter, FilterResolveError> {
        match url.split_once('#') {
            Some(("", fragment)) if !fragment.is_empty() => self
                .get(fragment)
                .ok_or(FilterResolveError::MissingFilterFrame),

            _ => Err(FilterResolveError::InvalidReference(url.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter_func::{Blur, Sepia};
    use crate::length::SimpleUserSpaceMetrics;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs.iter().copied().collect()
    }

    fn region(filter: &SvgFilter, bbox: Rect) -> Result<Rect, FilterResolveError> {
        let params = NormalizeParams::new(&SimpleUserSpaceMetrics::default());
        filter.resolve_region(&bbox, &params)
    }

    #[test]
    fn parses_filter_value_list() {
        assert_eq!(
            FilterValueList::parse_str("url(#bar) url(foo.svg#baz)").unwrap(),
            FilterValueList(vec![
                FilterValue::Url("#bar".to_string()),
                FilterValue::Url("foo.svg#baz".to_string()),
            ])
        );

        assert_eq!(
            FilterValueList::parse_str("blur(2px) url(#a) sepia()").unwrap(),
            FilterValueList(vec![
                FilterValue::Function(FilterFunction::Blur(Blur {
                    std_deviation: Some(ULength::new(2.0, LengthUnit::Px)),
                })),
                FilterValue::Url("#a".to_string()),
                FilterValue::Function(FilterFunction::Sepia(Sepia { proportion: None })),
            ])
        );
    }

    #[test]
    fn none_is_an_empty_chain() {
        assert!(FilterValueList::parse_str("none").unwrap().is_empty());
    }

    #[test]
    fn detects_invalid_filter_value_list() {
        assert!(FilterValueList::parse_str("").is_err());
        assert!(FilterValueList::parse_str("fail").is_err());
        assert!(FilterValueList::parse_str("url(#test) none").is_err());
        assert!(FilterValueList::parse_str("none url(#test)").is_err());
    }

    #[test]
    fn default_region_is_relative_to_bbox() {
        let session = Session::new_with_logging(false);
        let f = SvgFilter::new(&Attributes::new(), &session);

        let r = region(&f, Rect::new(10.0, 20.0, 110.0, 70.0)).unwrap();
        assert!(r.approx_eq(&Rect::new(0.0, 15.0, 120.0, 75.0)));
    }

    #[test]
    fn object_bounding_box_rejects_units() {
        let session = Session::new_with_logging(false);

        let f = SvgFilter::new(&attrs(&[("x", "1in"), ("width", "50%")]), &session);
        let r = region(&f, Rect::new(0.0, 0.0, 100.0, 100.0)).unwrap();
        // x keeps its default of -10%
        assert!(r.approx_eq(&Rect::new(-10.0, -10.0, 40.0, 110.0)));

        let f = SvgFilter::new(
            &attrs(&[("x", "1in"), ("filterUnits", "userSpaceOnUse"), ("width", "10")]),
            &session,
        );
        let r = region(&f, Rect::new(0.0, 0.0, 100.0, 100.0)).unwrap();
        assert!(r.approx_eq(&Rect::new(96.0, -15.0, 106.0, 165.0)));
    }

    #[test]
    fn negative_size_keeps_default() {
        let session = Session::new_with_logging(false);
        let f = SvgFilter::new(&attrs(&[("width", "-1")]), &session);
        assert_eq!(f.width, ULength::new(1.2, LengthUnit::Percent));
    }

    #[test]
    fn empty_bbox_with_object_bounding_box_fails() {
        let session = Session::new_with_logging(false);
        let f = SvgFilter::new(&Attributes::new(), &session);

        assert_eq!(
            region(&f, Rect::new(0.0, 0.0, 0.0, 100.0)),
            Err(FilterResolveError::EmptyBoundingBox)
        );
    }

    #[test]
    fn ignores_unknown_primitives() {
        let session = Session::new_with_logging(false);
        let mut f = SvgFilter::new(&Attributes::new(), &session);

        assert!(f.add_primitive("feFoo", &Attributes::new(), &session).is_none());
        assert!(f.add_primitive("feTile", &Attributes::new(), &session).is_some());
        assert_eq!(f.primitives().len(), 1);
    }

    #[test]
    fn resolves_fragments() {
        let session = Session::new_with_logging(false);
        let mut defs = FilterDefs::new();

        assert!(defs.insert(SvgFilter::new(&attrs(&[("id", "blur")]), &session)));
        assert!(!defs.insert(SvgFilter::new(&Attributes::new(), &session)));

        assert!(defs.resolve_filter("#blur").is_ok());
        assert_eq!(
            defs.resolve_filter("#nope").unwrap_err(),
            FilterResolveError::MissingFilterFrame
        );
        assert!(matches!(
            defs.resolve_filter("other.svg#blur"),
            Err(FilterResolveError::InvalidReference(_))
        ));

        let chain = FilterValueList::parse_str("url(#blur) sepia() url(#blur)").unwrap();
        assert_eq!(chain.resolve_frames(&defs, &session).unwrap().len(), 2);

        let chain = FilterValueList::parse_str("url(#blur) url(#nope)").unwrap();
        assert!(chain.resolve_frames(&defs, &session).is_none());
    }
}
