use cssparser::Parser;

use crate::attributes::Attributes;
use crate::error::*;
use crate::parse_identifiers;
use crate::parsers::{parse_attribute, set_attribute, Parse};
use crate::rect::coord_from_f64;
use crate::region::IRegion;
use crate::session::Session;

use super::context::PrimitiveContext;
use super::{FilterEffect, Input, Primitive, PrimitiveAttributes};

/// Enumeration of the color channels the displacement map can source.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum ColorChannel {
    R,
    G,
    B,
    #[default]
    A,
}

/// The `feDisplacementMap` filter primitive.
#[derive(Debug, Default, Clone)]
pub struct FeDisplacementMap {
    base: Primitive,
    in1: Input,
    in2: Input,
    scale: f64,
    x_channel_selector: ColorChannel,
    y_channel_selector: ColorChannel,
}

/// Resolved `feDisplacementMap` primitive.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct DisplacementMap {
    /// Maximum displacement, in filter-space pixels.
    pub scale: f64,
    pub x_channel_selector: ColorChannel,
    pub y_channel_selector: ColorChannel,
}

impl FilterEffect for FeDisplacementMap {
    fn set_attributes(&mut self, attrs: &Attributes, session: &Session) {
        let (in1, in2) = self.base.parse_two_inputs(attrs, session);
        self.in1 = in1;
        self.in2 = in2;

        for (attr, value) in attrs.iter() {
            match attr {
                "scale" => set_attribute(&mut self.scale, parse_attribute(attr, value), session),
                "xChannelSelector" => set_attribute(
                    &mut self.x_channel_selector,
                    parse_attribute(attr, value),
                    session,
                ),
                "yChannelSelector" => set_attribute(
                    &mut self.y_channel_selector,
                    parse_attribute(attr, value),
                    session,
                ),
                _ => (),
            }
        }
    }

    fn primitive(&self) -> &Primitive {
        &self.base
    }

    fn inputs(&self) -> Vec<Input> {
        vec![self.in1.clone(), self.in2.clone()]
    }

    /// The displaced image is not converted; only the map is read in
    /// `color-interpolation-filters`.
    fn operates_on_srgb(&self, input_index: usize, input_is_srgb: bool) -> bool {
        match input_index {
            0 => input_is_srgb,
            _ => self.base.operates_on_srgb(),
        }
    }

    fn build(&self, ctx: &PrimitiveContext<'_>) -> PrimitiveAttributes {
        PrimitiveAttributes::DisplacementMap(DisplacementMap {
            scale: ctx.number(self.scale),
            x_channel_selector: self.x_channel_selector,
            y_channel_selector: self.y_channel_selector,
        })
    }
}

impl DisplacementMap {
    /// Pixels move by at most half the scale in each direction.
    fn reach(&self) -> i32 {
        coord_from_f64((self.scale.abs() / 2.0).ceil())
    }

    pub fn needed_input_region(&self, input_index: usize, region: &IRegion) -> IRegion {
        match input_index {
            0 => region.inflate(self.reach(), self.reach()),
            _ => region.clone(),
        }
    }

    pub fn result_change_region(&self, changes: &[IRegion]) -> IRegion {
        let mut result = IRegion::new();

        if let Some(c0) = changes.first() {
            result = result.union(&c0.inflate(self.reach(), self.reach()));
        }

        if let Some(c1) = changes.get(1) {
            result = result.union(c1);
        }

        result
    }

    pub fn post_filter_extents(&self, extents: &[IRegion]) -> IRegion {
        extents
            .first()
            .map(|e0| e0.inflate(self.reach(), self.reach()))
            .unwrap_or_default()
    }
}

impl Parse for ColorChannel {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Self, ParseError<'i>> {
        Ok(parse_identifiers!(
            parser,
            "R" => ColorChannel::R,
            "G" => ColorChannel::G,
            "B" => ColorChannel::B,
            "A" => ColorChannel::A,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rect::IRect;

    #[test]
    fn displaced_input_is_inflated_by_half_the_scale() {
        let d = DisplacementMap {
            scale: -9.0,
            ..Default::default()
        };
        let r = IRegion::from_rect(IRect::new(0, 0, 10, 10));

        assert_eq!(d.needed_input_region(0, &r).bounds(), IRect::new(-5, -5, 15, 15));
        assert_eq!(d.needed_input_region(1, &r), r);

        let map_change = IRegion::from_rect(IRect::new(50, 50, 60, 60));
        let change = d.result_change_region(&[IRegion::new(), map_change.clone()]);
        assert_eq!(change, map_change);

        assert_eq!(
            d.post_filter_extents(&[r, map_change]).bounds(),
            IRect::new(-5, -5, 15, 15)
        );
    }

    #[test]
    fn map_input_uses_its_own_color_space() {
        let session = Session::new_with_logging(false);
        let attrs: Attributes = [("color-interpolation-filters", "sRGB"), ("xChannelSelector", "G")]
            .into_iter()
            .collect();

        let mut e = FeDisplacementMap::default();
        e.set_attributes(&attrs, &session);

        assert_eq!(e.x_channel_selector, ColorChannel::G);
        assert_eq!(e.y_channel_selector, ColorChannel::A);
        assert!(!e.operates_on_srgb(0, false));
        assert!(e.operates_on_srgb(1, false));
    }
}
