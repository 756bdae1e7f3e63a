//! Handling of `preserveAspectRatio` values.
//!
//! `feImage` places its image inside the primitive subregion according to
//! [`AspectRatio`], as described for the [`preserveAspectRatio` attribute][attr].
//!
//! ```
//! # use fegraph::aspect_ratio::AspectRatio;
//! # use fegraph::parsers::Parse;
//! assert_eq!(
//!     AspectRatio::parse_str("xMidYMid").unwrap(),
//!     AspectRatio::default()
//! );
//! ```
//!
//! [attr]: https://www.w3.org/TR/SVG/coords.html#PreserveAspectRatioAttribute

use cssparser::{BasicParseError, Parser};
use std::ops::Deref;

use crate::error::*;
use crate::parse_identifiers;
use crate::parsers::Parse;
use crate::rect::Rect;
use crate::transform::Transform;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
enum FitMode {
    #[default]
    Meet,
    Slice,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
enum Align1D {
    Min,
    #[default]
    Mid,
    Max,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
struct X(Align1D);
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
struct Y(Align1D);

impl Deref for X {
    type Target = Align1D;

    fn deref(&self) -> &Align1D {
        &self.0
    }
}

impl Deref for Y {
    type Target = Align1D;

    fn deref(&self) -> &Align1D {
        &self.0
    }
}

impl Align1D {
    fn compute(self, dest_pos: f64, dest_size: f64, obj_size: f64) -> f64 {
        match self {
            Align1D::Min => dest_pos,
            Align1D::Mid => dest_pos + (dest_size - obj_size) / 2.0,
            Align1D::Max => dest_pos + dest_size - obj_size,
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
struct Align {
    x: X,
    y: Y,
    fit: FitMode,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AspectRatio {
    defer: bool,
    align: Option<Align>,
}

impl Default for AspectRatio {
    fn default() -> AspectRatio {
        AspectRatio {
            defer: false,
            align: Some(Align::default()),
        }
    }
}

impl AspectRatio {
    pub fn is_slice(&self) -> bool {
        matches!(
            self.align,
            Some(Align {
                fit: FitMode::Slice,
                ..
            })
        )
    }

    /// Computes where an object of `obj_size` goes inside `viewport`.
    pub fn compute(&self, obj_size: (f64, f64), viewport: &Rect) -> Rect {
        match self.align {
            None => *viewport,

            Some(Align { x, y, fit }) => {
                let (obj_width, obj_height) = obj_size;
                let (vp_width, vp_height) = viewport.size();

                let w_factor = vp_width / obj_width;
                let h_factor = vp_height / obj_height;

                let factor = match fit {
                    FitMode::Meet => w_factor.min(h_factor),
                    FitMode::Slice => w_factor.max(h_factor),
                };

                let w = obj_width * factor;
                let h = obj_height * factor;

                let xpos = x.compute(viewport.x0, vp_width, w);
                let ypos = y.compute(viewport.y0, vp_height, h);

                Rect::new(xpos, ypos, xpos + w, ypos + h)
            }
        }
    }

    /// Computes the transform that maps an image of `image_size` pixels into `viewport`.
    ///
    /// Returns `None` if either the image or the viewport are empty, or if the resulting
    /// transform is not invertible; in those cases nothing should be drawn.
    pub fn image_transform(&self, image_size: (f64, f64), viewport: &Rect) -> Option<Transform> {
        let (w, h) = image_size;

        if viewport.is_empty() || !(w > 0.0 && h > 0.0) {
            return None;
        }

        let r = self.compute(image_size, viewport);
        let transform = Transform::new_translate(r.x0, r.y0).pre_scale(r.width() / w, r.height() / h);

        if transform.is_invertible() {
            Some(transform)
        } else {
            None
        }
    }
}

fn parse_align_xy<'i>(parser: &mut Parser<'i, '_>) -> Result<Option<(X, Y)>, BasicParseError<'i>> {
    use self::Align1D::*;

    parse_identifiers!(
        parser,

        "none" => None,

        "xMinYMin" => Some((X(Min), Y(Min))),
        "xMidYMin" => Some((X(Mid), Y(Min))),
        "xMaxYMin" => Some((X(Max), Y(Min))),

        "xMinYMid" => Some((X(Min), Y(Mid))),
        "xMidYMid" => Some((X(Mid), Y(Mid))),
        "xMaxYMid" => Some((X(Max), Y(Mid))),

        "xMinYMax" => Some((X(Min), Y(Max))),
        "xMidYMax" => Some((X(Mid), Y(Max))),
        "xMaxYMax" => Some((X(Max), Y(Max))),
    )
}

fn parse_fit_mode<'i>(parser: &mut Parser<'i, '_>) -> Result<FitMode, BasicParseError<'i>> {
    parse_identifiers!(
        parser,
        "meet" => FitMode::Meet,
        "slice" => FitMode::Slice,
    )
}

impl Parse for AspectRatio {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<AspectRatio, ParseError<'i>> {
        let defer = parser
            .try_parse(|p| p.expect_ident_matching("defer"))
            .is_ok();

        let align_xy = parser.try_parse(parse_align_xy)?;
        let fit = parser.try_parse(parse_fit_mode).unwrap_or_default();
        let align = align_xy.map(|(x, y)| Align { x, y, fit });

        Ok(AspectRatio { defer, align })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsing_invalid_strings_yields_error() {
        assert!(AspectRatio::parse_str("").is_err());
        assert!(AspectRatio::parse_str("defer").is_err());
        assert!(AspectRatio::parse_str("xMidYMid foo").is_err());
    }

    #[test]
    fn parses_slice() {
        assert!(AspectRatio::parse_str("xMinYMax slice").unwrap().is_slice());
        assert!(!AspectRatio::parse_str("none").unwrap().is_slice());
    }

    #[test]
    fn meet_centers_image() {
        let r = AspectRatio::default().compute((10.0, 20.0), &Rect::new(0.0, 0.0, 100.0, 100.0));
        assert!(r.approx_eq(&Rect::new(25.0, 0.0, 75.0, 100.0)));
    }

    #[test]
    fn none_stretches_image() {
        let a = AspectRatio::parse_str("none").unwrap();
        let t = a
            .image_transform((10.0, 20.0), &Rect::new(0.0, 0.0, 100.0, 100.0))
            .unwrap();
        assert_eq!(t.transform_point(10.0, 20.0), (100.0, 100.0));
    }

    #[test]
    fn empty_image_has_no_transform() {
        assert!(AspectRatio::default()
            .image_transform((0.0, 20.0), &Rect::new(0.0, 0.0, 100.0, 100.0))
            .is_none());
    }
}
