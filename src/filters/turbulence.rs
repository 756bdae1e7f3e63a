use cssparser::Parser;

use crate::attributes::Attributes;
use crate::error::*;
use crate::parse_identifiers;
use crate::parsers::{parse_attribute, set_attribute, NumberOptionalNumber, Parse};
use crate::session::Session;

use super::context::PrimitiveContext;
use super::{FilterEffect, Input, Primitive, PrimitiveAttributes};

/// Enumeration of the tile stitching modes.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
pub enum StitchTiles {
    Stitch,
    #[default]
    NoStitch,
}

/// Enumeration of the noise types.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Hash)]
pub enum NoiseType {
    FractalNoise,
    #[default]
    Turbulence,
}

/// The `feTurbulence` filter primitive.
#[derive(Debug, Clone)]
pub struct FeTurbulence {
    base: Primitive,
    base_frequency: NumberOptionalNumber<f64>,
    num_octaves: i32,
    seed: f64,
    stitch_tiles: StitchTiles,
    type_: NoiseType,
}

impl Default for FeTurbulence {
    fn default() -> FeTurbulence {
        FeTurbulence {
            base: Default::default(),
            base_frequency: NumberOptionalNumber(0.0, 0.0),
            num_octaves: 1,
            seed: 0.0,
            stitch_tiles: Default::default(),
            type_: Default::default(),
        }
    }
}

/// Resolved `feTurbulence` primitive.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Turbulence {
    /// Frequency in cycles per filter-space pixel.
    pub base_frequency: (f64, f64),
    pub num_octaves: i32,
    pub seed: i32,
    pub stitch_tiles: StitchTiles,
    pub type_: NoiseType,
}

impl FilterEffect for FeTurbulence {
    fn set_attributes(&mut self, attrs: &Attributes, session: &Session) {
        self.base.parse_no_inputs(attrs, session);

        for (attr, value) in attrs.iter() {
            match attr {
                "baseFrequency" => {
                    set_attribute(&mut self.base_frequency, parse_attribute(attr, value), session)
                }
                "numOctaves" => {
                    set_attribute(&mut self.num_octaves, parse_attribute(attr, value), session)
                }
                // Yes, seed needs to be parsed as a number and then truncated.
                "seed" => set_attribute(&mut self.seed, parse_attribute(attr, value), session),
                "stitchTiles" => {
                    set_attribute(&mut self.stitch_tiles, parse_attribute(attr, value), session)
                }
                "type" => set_attribute(&mut self.type_, parse_attribute(attr, value), session),
                _ => (),
            }
        }
    }

    fn primitive(&self) -> &Primitive {
        &self.base
    }

    fn inputs(&self) -> Vec<Input> {
        Vec::new()
    }

    fn build(&self, ctx: &PrimitiveContext<'_>) -> PrimitiveAttributes {
        let NumberOptionalNumber(fx, fy) = self.base_frequency;

        if fx < 0.0 || fy < 0.0 {
            return PrimitiveAttributes::Empty;
        }

        // A frequency is the inverse of a length.
        let base_frequency = (fx / ctx.number_x(1.0), fy / ctx.number_y(1.0));

        if !(base_frequency.0.is_finite() && base_frequency.1.is_finite()) {
            return PrimitiveAttributes::Empty;
        }

        let seed = self
            .seed
            .trunc()
            .clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32;

        PrimitiveAttributes::Turbulence(Turbulence {
            base_frequency,
            num_octaves: self.num_octaves,
            seed,
            stitch_tiles: self.stitch_tiles,
            type_: self.type_,
        })
    }
}

impl Parse for StitchTiles {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Self, ParseError<'i>> {
        Ok(parse_identifiers!(
            parser,
            "stitch" => StitchTiles::Stitch,
            "noStitch" => StitchTiles::NoStitch,
        )?)
    }
}

impl Parse for NoiseType {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Self, ParseError<'i>> {
        Ok(parse_identifiers!(
            parser,
            "fractalNoise" => NoiseType::FractalNoise,
            "turbulence" => NoiseType::Turbulence,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_attributes() {
        let session = Session::new_with_logging(false);
        let attrs: Attributes = [
            ("baseFrequency", "0.05 0.1"),
            ("seed", "3.7"),
            ("type", "fractalNoise"),
            ("stitchTiles", "bogus"),
        ]
        .into_iter()
        .collect();

        let mut e = FeTurbulence::default();
        e.set_attributes(&attrs, &session);

        assert_eq!(e.base_frequency, NumberOptionalNumber(0.05, 0.1));
        assert_eq!(e.seed, 3.7);
        assert_eq!(e.type_, NoiseType::FractalNoise);
        assert_eq!(e.stitch_tiles, StitchTiles::NoStitch);
        assert_eq!(e.num_octaves, 1);
    }
}
