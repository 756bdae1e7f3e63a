use cssparser::Parser;

use crate::attributes::Attributes;
use crate::error::*;
use crate::parse_identifiers;
use crate::parsers::{parse_attribute, set_attribute, Parse};
use crate::rect::IRect;
use crate::region::IRegion;
use crate::session::Session;

use super::context::PrimitiveContext;
use super::{FilterEffect, Input, Primitive, PrimitiveAttributes};

/// Enumeration of the possible compositing operations.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Operator {
    #[default]
    Over,
    In,
    Out,
    Atop,
    Xor,
    Arithmetic,
    Lighter,
}

/// The `feComposite` filter primitive.
#[derive(Debug, Default, Clone)]
pub struct FeComposite {
    base: Primitive,
    in1: Input,
    in2: Input,
    params: Composite,
}

/// Resolved `feComposite` primitive.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Composite {
    pub operator: Operator,
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
    pub k4: f64,
}

impl FilterEffect for FeComposite {
    fn set_attributes(&mut self, attrs: &Attributes, session: &Session) {
        let (in1, in2) = self.base.parse_two_inputs(attrs, session);
        self.in1 = in1;
        self.in2 = in2;

        let p = &mut self.params;

        for (attr, value) in attrs.iter() {
            match attr {
                "operator" => set_attribute(&mut p.operator, parse_attribute(attr, value), session),
                "k1" => set_attribute(&mut p.k1, parse_attribute(attr, value), session),
                "k2" => set_attribute(&mut p.k2, parse_attribute(attr, value), session),
                "k3" => set_attribute(&mut p.k3, parse_attribute(attr, value), session),
                "k4" => set_attribute(&mut p.k4, parse_attribute(attr, value), session),
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

    fn build(&self, _ctx: &PrimitiveContext<'_>) -> PrimitiveAttributes {
        PrimitiveAttributes::Composite(self.params)
    }
}

impl Composite {
    /// Extents of the result given the extents of `in` and `in2`.
    pub fn post_filter_extents(&self, inputs: &[IRegion], subregion: &IRect) -> IRegion {
        let empty = IRegion::new();
        let e0 = inputs.first().unwrap_or(&empty);
        let e1 = inputs.get(1).unwrap_or(&empty);

        match self.operator {
            Operator::Over | Operator::Xor | Operator::Lighter => e0.union(e1),
            Operator::In => e0.intersect(e1),
            Operator::Out => e0.clone(),
            Operator::Atop => e1.clone(),
            Operator::Arithmetic => {
                if self.k4 > 0.0 {
                    return IRegion::from_rect(*subregion);
                }

                let mut extents = IRegion::new();
                if self.k1 > 0.0 {
                    extents = extents.union(&e0.intersect(e1));
                }
                if self.k2 > 0.0 {
                    extents = extents.union(e0);
                }
                if self.k3 > 0.0 {
                    extents = extents.union(e1);
                }
                extents
            }
        }
    }
}

impl Parse for Operator {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Self, ParseError<'i>> {
        Ok(parse_identifiers!(
            parser,
            "over" => Operator::Over,
            "in" => Operator::In,
            "out" => Operator::Out,
            "atop" => Operator::Atop,
            "xor" => Operator::Xor,
            "arithmetic" => Operator::Arithmetic,
            "lighter" => Operator::Lighter,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regions() -> [IRegion; 2] {
        [
            IRegion::from_rect(IRect::new(0, 0, 10, 10)),
            IRegion::from_rect(IRect::new(5, 5, 20, 20)),
        ]
    }

    fn composite(operator: Operator) -> Composite {
        Composite {
            operator,
            ..Default::default()
        }
    }

    #[test]
    fn extents_per_operator() {
        let inputs = regions();
        let s = IRect::new(-100, -100, 100, 100);

        assert_eq!(
            composite(Operator::Over).post_filter_extents(&inputs, &s).bounds(),
            IRect::new(0, 0, 20, 20)
        );
        assert_eq!(
            composite(Operator::In).post_filter_extents(&inputs, &s).bounds(),
            IRect::new(5, 5, 10, 10)
        );
        assert_eq!(
            composite(Operator::Out).post_filter_extents(&inputs, &s),
            inputs[0]
        );
        assert_eq!(
            composite(Operator::Atop).post_filter_extents(&inputs, &s),
            inputs[1]
        );
    }

    #[test]
    fn arithmetic_extents_follow_coefficients() {
        let inputs = regions();
        let s = IRect::new(-100, -100, 100, 100);

        let k1_only = Composite {
            operator: Operator::Arithmetic,
            k1: 1.0,
            ..Default::default()
        };
        assert_eq!(
            k1_only.post_filter_extents(&inputs, &s).bounds(),
            IRect::new(5, 5, 10, 10)
        );

        let with_k4 = Composite {
            k4: 0.1,
            ..k1_only
        };
        assert_eq!(with_k4.post_filter_extents(&inputs, &s).bounds(), s);

        assert!(composite(Operator::Arithmetic)
            .post_filter_extents(&inputs, &s)
            .is_empty());
    }

    #[test]
    fn parses_operators() {
        let session = Session::new_with_logging(false);
        let attrs: Attributes = [("operator", "arithmetic"), ("k2", "0.5"), ("k3", "bad")]
            .into_iter()
            .collect();

        let mut e = FeComposite::default();
        e.set_attributes(&attrs, &session);

        assert_eq!(e.params.operator, Operator::Arithmetic);
        assert_eq!(e.params.k2, 0.5);
        assert_eq!(e.params.k3, 0.0);
    }
}
