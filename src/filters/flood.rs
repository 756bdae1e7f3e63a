use crate::attributes::Attributes;
use crate::color::{resolve_color, Color, ColorF, RGBA};
use crate::parsers::{parse_attribute, set_attribute, NumberOrPercentage};
use crate::rect::IRect;
use crate::region::IRegion;
use crate::session::Session;

use super::context::PrimitiveContext;
use super::{FilterEffect, Input, Primitive, PrimitiveAttributes};

/// The `flood-color` and `flood-opacity` attributes, shared by `feFlood` and
/// `feDropShadow`.
#[derive(Debug, Clone, PartialEq)]
pub struct FloodPaint {
    color: Color,
    opacity: f64,
}

impl Default for FloodPaint {
    fn default() -> FloodPaint {
        FloodPaint {
            color: Color::RGBA(RGBA::new(0, 0, 0, 255)),
            opacity: 1.0,
        }
    }
}

impl FloodPaint {
    /// Parses `attr` if it is one of the flood attributes.
    pub fn set_attribute(&mut self, attr: &str, value: &str, session: &Session) {
        match attr {
            "flood-color" => set_attribute(&mut self.color, parse_attribute(attr, value), session),
            "flood-opacity" => {
                let mut opacity = NumberOrPercentage { value: self.opacity };
                set_attribute(&mut opacity, parse_attribute(attr, value), session);
                self.opacity = opacity.value.clamp(0.0, 1.0);
            }
            _ => (),
        }
    }

    pub fn resolve(&self, current_color: RGBA) -> ColorF {
        ColorF::from(resolve_color(&self.color, current_color)).with_opacity(self.opacity)
    }
}

/// The `feFlood` filter primitive.
#[derive(Debug, Default, Clone)]
pub struct FeFlood {
    base: Primitive,
    paint: FloodPaint,
}

/// Resolved `feFlood` primitive.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Flood {
    pub color: ColorF,
}

impl FilterEffect for FeFlood {
    fn set_attributes(&mut self, attrs: &Attributes, session: &Session) {
        self.base.parse_no_inputs(attrs, session);

        for (attr, value) in attrs.iter() {
            self.paint.set_attribute(attr, value, session);
        }
    }

    fn primitive(&self) -> &Primitive {
        &self.base
    }

    fn inputs(&self) -> Vec<Input> {
        Vec::new()
    }

    fn build(&self, ctx: &PrimitiveContext<'_>) -> PrimitiveAttributes {
        PrimitiveAttributes::Flood(Flood {
            color: self.paint.resolve(ctx.current_color()),
        })
    }
}

impl Flood {
    pub fn post_filter_extents(&self, subregion: &IRect) -> IRegion {
        if self.color.is_transparent() {
            IRegion::new()
        } else {
            IRegion::from_rect(*subregion)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_flood_paint() {
        let session = Session::new_with_logging(false);
        let mut paint = FloodPaint::default();
        paint.set_attribute("flood-color", "currentColor", &session);
        paint.set_attribute("flood-opacity", "50%", &session);

        let c = paint.resolve(RGBA::new(255, 0, 0, 255));
        assert_eq!(c, ColorF::new(1.0, 0.0, 0.0, 0.5));
    }

    #[test]
    fn flood_opacity_is_clamped() {
        let session = Session::new_with_logging(false);
        let mut paint = FloodPaint::default();
        paint.set_attribute("flood-opacity", "3", &session);
        assert_eq!(paint.resolve(RGBA::new(0, 0, 0, 255)).a, 1.0);

        paint.set_attribute("flood-opacity", "-1", &session);
        assert!(paint.resolve(RGBA::new(0, 0, 0, 255)).is_transparent());
    }

    #[test]
    fn transparent_flood_has_no_extents() {
        let r = IRect::new(0, 0, 10, 10);
        assert!(Flood::default().post_filter_extents(&r).is_empty());

        let flood = Flood {
            color: ColorF::new(0.0, 0.0, 0.0, 1.0),
        };
        assert_eq!(flood.post_filter_extents(&r).bounds(), r);
    }
}
