use cssparser::Parser;

use crate::attributes::Attributes;
use crate::error::*;
use crate::parse_identifiers;
use crate::parsers::{parse_attribute, set_attribute, NumberOptionalNumber, Parse};
use crate::rect::coord_from_f64;
use crate::region::IRegion;
use crate::session::Session;

use super::context::PrimitiveContext;
use super::{FilterEffect, Input, Primitive, PrimitiveAttributes};

/// Enumeration of the possible morphology operations.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Operator {
    #[default]
    Erode,
    Dilate,
}

/// The `feMorphology` filter primitive.
#[derive(Debug, Default, Clone)]
pub struct FeMorphology {
    base: Primitive,
    in1: Input,
    operator: Operator,
    radius: NumberOptionalNumber<f64>,
}

/// Resolved `feMorphology` primitive.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Morphology {
    pub operator: Operator,

    /// In filter-space pixels; both are positive.
    pub radius: (f64, f64),
}

impl FilterEffect for FeMorphology {
    fn set_attributes(&mut self, attrs: &Attributes, session: &Session) {
        self.in1 = self.base.parse_one_input(attrs, session);

        for (attr, value) in attrs.iter() {
            match attr {
                "operator" => {
                    set_attribute(&mut self.operator, parse_attribute(attr, value), session)
                }
                "radius" => set_attribute(&mut self.radius, parse_attribute(attr, value), session),
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

    fn build(&self, ctx: &PrimitiveContext<'_>) -> PrimitiveAttributes {
        let NumberOptionalNumber(rx, ry) = self.radius;

        if rx <= 0.0 || ry <= 0.0 {
            return PrimitiveAttributes::Empty;
        }

        PrimitiveAttributes::Morphology(Morphology {
            operator: self.operator,
            radius: ctx.number_pair((rx, ry)),
        })
    }
}

impl Morphology {
    fn reach(&self) -> (i32, i32) {
        (
            coord_from_f64(self.radius.0.ceil()),
            coord_from_f64(self.radius.1.ceil()),
        )
    }

    pub fn needed_input_region(&self, region: &IRegion) -> IRegion {
        let (rx, ry) = self.reach();
        region.inflate(rx, ry)
    }

    pub fn result_change_region(&self, change: &IRegion) -> IRegion {
        self.needed_input_region(change)
    }

    pub fn post_filter_extents(&self, extents: &IRegion) -> IRegion {
        match self.operator {
            Operator::Dilate => self.needed_input_region(extents),
            Operator::Erode => extents.clone(),
        }
    }
}

impl Parse for Operator {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Self, ParseError<'i>> {
        Ok(parse_identifiers!(
            parser,
            "erode" => Operator::Erode,
            "dilate" => Operator::Dilate,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rect::IRect;

    #[test]
    fn only_dilate_grows_extents() {
        let r = IRegion::from_rect(IRect::new(0, 0, 10, 10));

        let dilate = Morphology {
            operator: Operator::Dilate,
            radius: (1.5, 2.0),
        };
        assert_eq!(
            dilate.post_filter_extents(&r).bounds(),
            IRect::new(-2, -2, 12, 12)
        );

        let erode = Morphology {
            operator: Operator::Erode,
            ..dilate
        };
        assert_eq!(erode.post_filter_extents(&r), r);
        assert_eq!(
            erode.needed_input_region(&r).bounds(),
            IRect::new(-2, -2, 12, 12)
        );
    }
}
