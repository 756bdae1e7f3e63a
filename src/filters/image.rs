use crate::aspect_ratio::AspectRatio;
use crate::attributes::{is_href, Attributes};
use crate::parsers::{parse_attribute, set_attribute};
use crate::rect::Rect;
use crate::session::Session;
use crate::transform::Transform;

use super::context::PrimitiveContext;
use super::{FilterEffect, Input, Primitive, PrimitiveAttributes};

/// What the host knows about the image referenced by an `feImage`.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct ImageInfo {
    /// Size of the image in pixels.
    pub width: u32,
    pub height: u32,

    /// Whether the image comes from another origin, which taints the filter result.
    pub cross_origin: bool,
}

/// An image referenced from a filter, as handed to the renderer.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FilterImage {
    pub href: String,
    pub width: u32,
    pub height: u32,
    pub cross_origin: bool,
}

/// The `feImage` filter primitive.
#[derive(Debug, Default, Clone)]
pub struct FeImage {
    base: Primitive,
    aspect: AspectRatio,
    href: Option<String>,
    info: Option<ImageInfo>,
}

/// Resolved `feImage` primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub image: FilterImage,

    /// Maps image pixels into filter space.
    pub transform: Transform,
}

impl FeImage {
    pub fn href(&self) -> Option<&str> {
        self.href.as_deref()
    }

    /// Provides the size and origin of the image once the host has loaded it.
    pub fn set_image_info(&mut self, info: ImageInfo) {
        self.info = Some(info);
    }
}

impl FilterEffect for FeImage {
    fn set_attributes(&mut self, attrs: &Attributes, session: &Session) {
        self.base.parse_no_inputs(attrs, session);

        for (attr, value) in attrs.iter() {
            match attr {
                "preserveAspectRatio" => {
                    set_attribute(&mut self.aspect, parse_attribute(attr, value), session)
                }

                // "href" takes precedence over "xlink:href"
                a if is_href(a) && (self.href.is_none() || a == "href") => {
                    self.href = Some(value.to_string());
                }

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

    /// Images are always produced in sRGB.
    fn operates_on_srgb(&self, _input_index: usize, _input_is_srgb: bool) -> bool {
        true
    }

    fn build(&self, ctx: &PrimitiveContext<'_>) -> PrimitiveAttributes {
        let (href, info) = match (self.href.as_ref(), self.info) {
            (Some(href), Some(info)) => (href, info),
            _ => return PrimitiveAttributes::Empty,
        };

        let image_size = (f64::from(info.width), f64::from(info.height));
        let viewport = Rect::from(ctx.subregion());

        match self.aspect.image_transform(image_size, &viewport) {
            Some(transform) => PrimitiveAttributes::Image(Image {
                image: FilterImage {
                    href: href.clone(),
                    width: info.width,
                    height: info.height,
                    cross_origin: info.cross_origin,
                },
                transform,
            }),

            None => PrimitiveAttributes::Empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_href_wins() {
        let session = Session::new_with_logging(false);

        let attrs: Attributes = [("href", "a.png"), ("xlink:href", "b.png")]
            .into_iter()
            .collect();
        let mut e = FeImage::default();
        e.set_attributes(&attrs, &session);
        assert_eq!(e.href(), Some("a.png"));

        let attrs: Attributes = [("xlink:href", "b.png")].into_iter().collect();
        let mut e = FeImage::default();
        e.set_attributes(&attrs, &session);
        assert_eq!(e.href(), Some("b.png"));
    }
}
