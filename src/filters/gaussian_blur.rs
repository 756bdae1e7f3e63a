use crate::attributes::Attributes;
use crate::parsers::{parse_attribute, set_attribute, NumberOptionalNumber};
use crate::region::IRegion;
use crate::session::Session;

use super::context::PrimitiveContext;
use super::{FilterEffect, Input, Primitive, PrimitiveAttributes};

/// The maximum standard deviation, in filter-space pixels, that is honored for blurs.
///
/// The value of 500 is used in webkit.
pub const MAXIMUM_STD_DEVIATION: f64 = 500.0;

/// The `feGaussianBlur` filter primitive.
#[derive(Debug, Default, Clone)]
pub struct FeGaussianBlur {
    base: Primitive,
    in1: Input,
    std_deviation: NumberOptionalNumber<f64>,
}

/// Resolved `feGaussianBlur` primitive, in filter-space pixels.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct GaussianBlur {
    pub std_deviation: (f64, f64),
}

impl FilterEffect for FeGaussianBlur {
    fn set_attributes(&mut self, attrs: &Attributes, session: &Session) {
        self.in1 = self.base.parse_one_input(attrs, session);

        for (attr, value) in attrs.iter() {
            if attr == "stdDeviation" {
                set_attribute(
                    &mut self.std_deviation,
                    parse_attribute(attr, value),
                    session,
                );
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
        let NumberOptionalNumber(x, y) = self.std_deviation;

        if x < 0.0 || y < 0.0 {
            return PrimitiveAttributes::Empty;
        }

        PrimitiveAttributes::GaussianBlur(GaussianBlur {
            std_deviation: ctx.number_pair((x, y)),
        })
    }
}

/// How far a blur with `std_deviation` spreads pixels, in whole pixels.
pub fn blur_inflation(std_deviation: f64) -> i32 {
    (std_deviation.clamp(0.0, MAXIMUM_STD_DEVIATION) * 3.0).ceil() as i32
}

impl GaussianBlur {
    pub fn is_identity(&self) -> bool {
        self.std_deviation == (0.0, 0.0)
    }

    fn inflation(&self) -> (i32, i32) {
        (
            blur_inflation(self.std_deviation.0),
            blur_inflation(self.std_deviation.1),
        )
    }

    pub fn needed_input_region(&self, region: &IRegion) -> IRegion {
        let (dx, dy) = self.inflation();
        region.inflate(dx, dy)
    }

    pub fn result_change_region(&self, change: &IRegion) -> IRegion {
        self.needed_input_region(change)
    }

    pub fn post_filter_extents(&self, extents: &IRegion) -> IRegion {
        self.needed_input_region(extents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rect::IRect;

    #[test]
    fn inflates_by_three_deviations() {
        let blur = GaussianBlur {
            std_deviation: (5.0, 0.5),
        };
        let r = IRegion::from_rect(IRect::new(0, 0, 100, 100));

        assert_eq!(
            blur.needed_input_region(&r).bounds(),
            IRect::new(-15, -2, 115, 102)
        );
        assert_eq!(blur.post_filter_extents(&r), blur.result_change_region(&r));
    }

    #[test]
    fn huge_deviation_is_clamped() {
        assert_eq!(blur_inflation(1e20), 1500);
        assert_eq!(blur_inflation(f64::INFINITY), 1500);
        assert_eq!(blur_inflation(0.0), 0);
    }
}
