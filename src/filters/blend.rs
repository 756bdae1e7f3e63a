use cssparser::Parser;

use crate::attributes::Attributes;
use crate::error::*;
use crate::parse_identifiers;
use crate::parsers::{parse_attribute, set_attribute, Parse};
use crate::session::Session;

use super::context::PrimitiveContext;
use super::{FilterEffect, Input, Primitive, PrimitiveAttributes};

/// Enumeration of the possible blending modes.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Mode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Darken,
    Lighten,
    Overlay,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

/// The `feBlend` filter primitive.
#[derive(Debug, Default, Clone)]
pub struct FeBlend {
    base: Primitive,
    in1: Input,
    in2: Input,
    mode: Mode,
}

/// Resolved `feBlend` primitive.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Blend {
    pub mode: Mode,
}

impl FilterEffect for FeBlend {
    fn set_attributes(&mut self, attrs: &Attributes, session: &Session) {
        let (in1, in2) = self.base.parse_two_inputs(attrs, session);
        self.in1 = in1;
        self.in2 = in2;

        for (attr, value) in attrs.iter() {
            if attr == "mode" {
                set_attribute(&mut self.mode, parse_attribute(attr, value), session);
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
        PrimitiveAttributes::Blend(Blend { mode: self.mode })
    }
}

impl Parse for Mode {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Self, ParseError<'i>> {
        Ok(parse_identifiers!(
            parser,
            "normal" => Mode::Normal,
            "multiply" => Mode::Multiply,
            "screen" => Mode::Screen,
            "darken" => Mode::Darken,
            "lighten" => Mode::Lighten,
            "overlay" => Mode::Overlay,
            "color-dodge" => Mode::ColorDodge,
            "color-burn" => Mode::ColorBurn,
            "hard-light" => Mode::HardLight,
            "soft-light" => Mode::SoftLight,
            "difference" => Mode::Difference,
            "exclusion" => Mode::Exclusion,
            "hue" => Mode::Hue,
            "saturation" => Mode::Saturation,
            "color" => Mode::Color,
            "luminosity" => Mode::Luminosity,
        )?)
    }
}
