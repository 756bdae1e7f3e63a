//! CSS angle values.

use std::f64::consts::*;

use cssparser::{Parser, Token};
use float_cmp::approx_eq;

use crate::error::*;
use crate::parsers::{finite_f32, Parse};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Angle(f64);

impl Angle {
    pub fn new(rad: f64) -> Angle {
        Angle(Angle::normalize(rad))
    }

    pub fn from_degrees(deg: f64) -> Angle {
        Angle(Angle::normalize(deg.to_radians()))
    }

    pub fn radians(self) -> f64 {
        self.0
    }

    pub fn degrees(self) -> f64 {
        self.0.to_degrees()
    }

    // Normalizes an angle to [0.0, 2*PI)
    fn normalize(rad: f64) -> f64 {
        let res = rad % (PI * 2.0);
        if approx_eq!(f64, res, 0.0) {
            0.0
        } else if res < 0.0 {
            res + PI * 2.0
        } else {
            res
        }
    }
}

// angle:
// https://www.w3.org/TR/css-values-3/#angles
//
// angle ::= number ("deg" | "grad" | "rad" | "turn")?
//
// A unitless number is accepted as degrees, which also covers the CSS `0` shorthand.
impl Parse for Angle {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Angle, ParseError<'i>> {
        let angle = {
            let loc = parser.current_source_location();

            let token = parser.next()?;

            match *token {
                Token::Number { value, .. } => {
                    let degrees = finite_f32(value).map_err(|e| loc.new_custom_error(e))?;
                    Angle::from_degrees(f64::from(degrees))
                }

                Token::Dimension {
                    value, ref unit, ..
                } => {
                    let value = f64::from(finite_f32(value).map_err(|e| loc.new_custom_error(e))?);

                    match unit.as_ref() {
                        "deg" => Angle::from_degrees(value),
                        "grad" => Angle::from_degrees(value * 360.0 / 400.0),
                        "rad" => Angle::new(value),
                        "turn" => Angle::from_degrees(value * 360.0),
                        _ => {
                            return Err(loc.new_unexpected_token_error(token.clone()));
                        }
                    }
                }

                _ => return Err(loc.new_unexpected_token_error(token.clone())),
            }
        };

        Ok(angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_angle() {
        assert_eq!(Angle::parse_str("0").unwrap(), Angle::new(0.0));
        assert_eq!(Angle::parse_str("15").unwrap(), Angle::from_degrees(15.0));
        assert_eq!(
            Angle::parse_str("180.5deg").unwrap(),
            Angle::from_degrees(180.5)
        );
        assert_eq!(Angle::parse_str("1rad").unwrap(), Angle::new(1.0));
        assert_eq!(
            Angle::parse_str("-400grad").unwrap(),
            Angle::from_degrees(-360.0)
        );
        assert_eq!(
            Angle::parse_str("0.5turn").unwrap(),
            Angle::from_degrees(180.0)
        );

        assert!(Angle::parse_str("").is_err());
        assert!(Angle::parse_str("foo").is_err());
        assert!(Angle::parse_str("300foo").is_err());
    }

    #[test]
    fn normalizes_negative_angles() {
        let a = Angle::from_degrees(-90.0);
        assert!(approx_eq!(f64, a.degrees(), 270.0, epsilon = 1e-9));
    }
}
