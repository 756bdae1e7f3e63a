//! CSS color values.

use cssparser::Parser;

use crate::error::*;
use crate::parsers::Parse;

pub use cssparser::{Color, RGBA};

impl Parse for cssparser::Color {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<cssparser::Color, ParseError<'i>> {
        Ok(cssparser::Color::parse(parser)?)
    }
}

impl Parse for cssparser::RGBA {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<cssparser::RGBA, ParseError<'i>> {
        let loc = parser.current_source_location();

        match cssparser::Color::parse(parser)? {
            cssparser::Color::RGBA(rgba) => Ok(rgba),
            cssparser::Color::CurrentColor => Err(loc.new_custom_error(ValueErrorKind::Value(
                "currentColor is not allowed here".to_string(),
            ))),
        }
    }
}

/// Resolves `currentColor` against the element's `color`.
pub fn resolve_color(color: &Color, current_color: RGBA) -> RGBA {
    match *color {
        Color::RGBA(rgba) => rgba,
        Color::CurrentColor => current_color,
    }
}

/// A non-premultiplied color with float components in `[0.0, 1.0]`.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct ColorF {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorF {
    pub const TRANSPARENT: ColorF = ColorF {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    pub fn new(r: f32, g: f32, b: f32, a: f32) -> ColorF {
        ColorF { r, g, b, a }
    }

    /// Multiplies the alpha channel by `opacity`, clamped to `[0.0, 1.0]`.
    pub fn with_opacity(self, opacity: f64) -> ColorF {
        ColorF {
            a: self.a * (opacity.clamp(0.0, 1.0) as f32),
            ..self
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.a <= 0.0
    }
}

impl From<RGBA> for ColorF {
    fn from(c: RGBA) -> ColorF {
        ColorF {
            r: c.red_f32(),
            g: c.green_f32(),
            b: c.blue_f32(),
            a: c.alpha_f32(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rgba() {
        assert_eq!(
            RGBA::parse_str("#ff0000").unwrap(),
            RGBA::new(255, 0, 0, 255)
        );
        assert!(RGBA::parse_str("currentColor").is_err());
    }

    #[test]
    fn resolves_current_color() {
        let black = RGBA::new(0, 0, 0, 255);
        let c = Color::parse_str("currentColor").unwrap();
        assert_eq!(resolve_color(&c, black), black);
    }

    #[test]
    fn applies_opacity() {
        let c = ColorF::from(RGBA::new(255, 255, 255, 255)).with_opacity(0.5);
        assert_eq!(c.a, 0.5);
        assert!(!c.is_transparent());
        assert!(ColorF::from(RGBA::transparent()).is_transparent());
    }
}
