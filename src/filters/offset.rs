use crate::attributes::Attributes;
use crate::parsers::{parse_attribute, set_attribute};
use crate::rect::coord_from_f64;
use crate::region::IRegion;
use crate::session::Session;

use super::context::PrimitiveContext;
use super::{FilterEffect, Input, Primitive, PrimitiveAttributes};

/// The `feOffset` filter primitive.
#[derive(Debug, Default, Clone)]
pub struct FeOffset {
    base: Primitive,
    in1: Input,
    dx: f64,
    dy: f64,
}

/// Resolved `feOffset` primitive, in filter-space pixels.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Offset {
    pub dx: f64,
    pub dy: f64,
}

impl FilterEffect for FeOffset {
    fn set_attributes(&mut self, attrs: &Attributes, session: &Session) {
        self.in1 = self.base.parse_one_input(attrs, session);

        for (attr, value) in attrs.iter() {
            match attr {
                "dx" => set_attribute(&mut self.dx, parse_attribute(attr, value), session),
                "dy" => set_attribute(&mut self.dy, parse_attribute(attr, value), session),
                _ => (),
            }
        }
    }

    fn primitive(&self) -> &Primitive {
        &self.base
    }

    fn inputs(&self) -> Vec<Input> {
        vec![self.in1.clone()]
    }

    fn operates_on_srgb(&self, _input_index: usize, input_is_srgb: bool) -> bool {
        input_is_srgb
    }

    fn build(&self, ctx: &PrimitiveContext<'_>) -> PrimitiveAttributes {
        let (dx, dy) = ctx.number_pair((self.dx, self.dy));

        PrimitiveAttributes::Offset(Offset { dx, dy })
    }
}

impl Offset {
    /// The offset rounded to whole pixels, as the result is moved by pixel amounts.
    pub fn pixel_offset(&self) -> (i32, i32) {
        (coord_from_f64(self.dx.round()), coord_from_f64(self.dy.round()))
    }

    pub fn is_identity(&self) -> bool {
        self.pixel_offset() == (0, 0)
    }

    pub fn needed_input_region(&self, region: &IRegion) -> IRegion {
        let (dx, dy) = self.pixel_offset();
        region.translate((-dx, -dy))
    }

    pub fn result_change_region(&self, change: &IRegion) -> IRegion {
        change.translate(self.pixel_offset())
    }

    pub fn post_filter_extents(&self, extents: &IRegion) -> IRegion {
        self.result_change_region(extents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rect::IRect;

    #[test]
    fn moves_regions_both_ways() {
        let offset = Offset { dx: 5.4, dy: -2.0 };
        let r = IRegion::from_rect(IRect::new(0, 0, 10, 10));

        assert_eq!(
            offset.needed_input_region(&r).bounds(),
            IRect::new(-5, 2, 5, 12)
        );
        assert_eq!(
            offset.result_change_region(&r).bounds(),
            IRect::new(5, -2, 15, 8)
        );
    }

    #[test]
    fn subpixel_offset_is_identity() {
        assert!(Offset { dx: 0.4, dy: -0.2 }.is_identity());
        assert!(!Offset { dx: 0.6, dy: 0.0 }.is_identity());
    }
}
