use crate::attributes::Attributes;
use crate::color::ColorF;
use crate::parsers::{parse_attribute, set_attribute, NumberOptionalNumber};
use crate::rect::coord_from_f64;
use crate::region::IRegion;
use crate::session::Session;

use super::context::PrimitiveContext;
use super::flood::FloodPaint;
use super::gaussian_blur::blur_inflation;
use super::{FilterEffect, Input, Primitive, PrimitiveAttributes};

/// The `feDropShadow` filter primitive.
#[derive(Debug, Clone)]
pub struct FeDropShadow {
    base: Primitive,
    in1: Input,
    dx: f64,
    dy: f64,
    std_deviation: NumberOptionalNumber<f64>,
    paint: FloodPaint,
}

impl Default for FeDropShadow {
    fn default() -> FeDropShadow {
        FeDropShadow {
            base: Default::default(),
            in1: Default::default(),
            dx: 2.0,
            dy: 2.0,
            std_deviation: NumberOptionalNumber(2.0, 2.0),
            paint: Default::default(),
        }
    }
}

/// Resolved `feDropShadow` primitive, also used for the `drop-shadow()` filter function.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct DropShadow {
    /// Blur of the shadow, in filter-space pixels.
    pub std_deviation: (f64, f64),

    /// Offset of the shadow, in filter-space pixels.
    pub offset: (f64, f64),

    pub color: ColorF,
}

impl FilterEffect for FeDropShadow {
    fn set_attributes(&mut self, attrs: &Attributes, session: &Session) {
        self.in1 = self.base.parse_one_input(attrs, session);

        for (attr, value) in attrs.iter() {
            match attr {
                "dx" => set_attribute(&mut self.dx, parse_attribute(attr, value), session),
                "dy" => set_attribute(&mut self.dy, parse_attribute(attr, value), session),
                "stdDeviation" => {
                    set_attribute(&mut self.std_deviation, parse_attribute(attr, value), session)
                }
                _ => self.paint.set_attribute(attr, value, session),
            }
        }
    }

    fn primitive(&self) -> &Primitive {
        &self.base
    }

    fn inputs(&self) -> Vec<Input> {
        vec![self.in1.clone()]
    }

    fn build(&self, ctx: &PrimitiveContext<'_>) -> PrimitiveAttributes {
        let NumberOptionalNumber(sx, sy) = self.std_deviation;

        if sx < 0.0 || sy < 0.0 {
            return PrimitiveAttributes::Empty;
        }

        PrimitiveAttributes::DropShadow(DropShadow {
            std_deviation: ctx.number_pair((sx, sy)),
            offset: ctx.number_pair((self.dx, self.dy)),
            color: self.paint.resolve(ctx.current_color()),
        })
    }
}

impl DropShadow {
    fn pixel_offset(&self) -> (i32, i32) {
        (
            coord_from_f64(self.offset.0.round()),
            coord_from_f64(self.offset.1.round()),
        )
    }

    fn inflation(&self) -> (i32, i32) {
        (
            blur_inflation(self.std_deviation.0),
            blur_inflation(self.std_deviation.1),
        )
    }

    pub fn needed_input_region(&self, region: &IRegion) -> IRegion {
        let (dx, dy) = self.pixel_offset();
        let (ix, iy) = self.inflation();

        region.union(&region.translate((-dx, -dy)).inflate(ix, iy))
    }

    pub fn result_change_region(&self, change: &IRegion) -> IRegion {
        let (ix, iy) = self.inflation();

        change.union(&change.translate(self.pixel_offset()).inflate(ix, iy))
    }

    pub fn post_filter_extents(&self, extents: &IRegion) -> IRegion {
        self.result_change_region(extents)
    }
}
