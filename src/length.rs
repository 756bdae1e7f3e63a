//! CSS length values.
//!
//! [`CssLength`] represents the lengths used by filter primitive attributes and CSS filter
//! functions.  A length needs to know whether it will be normalized with respect to the
//! width, height, or both dimensions of the current viewport, and whether it may be
//! negative; hence the two type parameters [`Normalize`] and [`Validate`].  We provide
//! the [`Length`] and [`ULength`] aliases for signed and unsigned lengths.
//!
//! Lengths are resolved into user-space units with [`CssLength::to_user`], which takes a
//! [`NormalizeParams`] built from a [`UserSpaceMetrics`].

use cssparser::{_cssparser_internal_to_lowercase, match_ignore_ascii_case, Parser, Token};
use std::f64::consts::*;
use std::fmt;
use std::marker::PhantomData;

use crate::error::*;
use crate::parsers::{finite_f32, Parse};

/// Units for length values.
#[derive(Debug, PartialEq, Copy, Clone)]
pub enum LengthUnit {
    /// `1.0` means 100%
    Percent,

    /// Pixels, or the CSS default unit
    Px,

    /// Size of the current font
    Em,

    /// x-height of the current font
    Ex,

    /// Inches (25.4 mm)
    In,

    /// Centimeters
    Cm,

    /// Millimeters
    Mm,

    /// Points (1/72 inch)
    Pt,

    /// Picas (12 points)
    Pc,
}

/// Used for the `N` type parameter of `CssLength<N: Normalize, V: Validate>`.
pub trait Normalize {
    /// Computes an orientation-based scaling factor.
    ///
    /// This is used in the [`CssLength::to_user`] method to resolve lengths with percentage
    /// units; they need to be resolved with respect to the width, height, or [normalized
    /// diagonal][diag] of the current viewport.
    ///
    /// [diag]: https://www.w3.org/TR/SVG/coords.html#Units
    fn normalize(x: f64, y: f64) -> f64;
}

/// Allows declaring `CssLength<Horizontal>`.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Horizontal;

/// Allows declaring `CssLength<Vertical>`.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Vertical;

/// Allows declaring `CssLength<Both>`.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Both;

impl Normalize for Horizontal {
    #[inline]
    fn normalize(x: f64, _y: f64) -> f64 {
        x
    }
}

impl Normalize for Vertical {
    #[inline]
    fn normalize(_x: f64, y: f64) -> f64 {
        y
    }
}

impl Normalize for Both {
    #[inline]
    fn normalize(x: f64, y: f64) -> f64 {
        viewport_percentage(x, y)
    }
}

/// Used for the `V` type parameter of `CssLength<N: Normalize, V: Validate>`.
pub trait Validate {
    /// Checks if the specified value is acceptable
    ///
    /// This is used when parsing a length value
    fn validate(v: f64) -> Result<f64, ValueErrorKind> {
        Ok(v)
    }
}

#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Signed;

impl Validate for Signed {}

#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Unsigned;

impl Validate for Unsigned {
    fn validate(v: f64) -> Result<f64, ValueErrorKind> {
        if v >= 0.0 {
            Ok(v)
        } else {
            Err(ValueErrorKind::Value(
                "value must be non-negative".to_string(),
            ))
        }
    }
}

/// A CSS length value.
///
/// This is equivalent to [CSS lengths].
///
/// [CSS lengths]: https://www.w3.org/TR/CSS22/syndata.html#length-units
///
/// ```
/// # use fegraph::length::{Length, ULength, LengthUnit, Horizontal, Both};
/// # use fegraph::parsers::Parse;
/// let dx: Length<Horizontal> = Length::new(42.0, LengthUnit::Cm);
///
/// let radius = ULength::<Both>::parse_str("5px").unwrap();
/// ```
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct CssLength<N: Normalize, V: Validate> {
    /// Numeric part of the length
    pub length: f64,

    /// Unit part of the length
    pub unit: LengthUnit,

    /// Dummy; used internally for the type parameter `N`
    orientation: PhantomData<N>,

    /// Dummy; used internally for the type parameter `V`
    validation: PhantomData<V>,
}

impl<N: Normalize, V: Validate> Default for CssLength<N, V> {
    fn default() -> Self {
        CssLength::new(0.0, LengthUnit::Px)
    }
}

/// CSS pixels per inch.
pub const PX_PER_INCH: f64 = 96.0;
pub const POINTS_PER_INCH: f64 = 72.0;
const CM_PER_INCH: f64 = 2.54;
const MM_PER_INCH: f64 = 25.4;
const PICA_PER_INCH: f64 = 6.0;

impl<N: Normalize, V: Validate> Parse for CssLength<N, V> {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<CssLength<N, V>, ParseError<'i>> {
        let l_value;
        let l_unit;

        let token = parser.next()?.clone();

        match token {
            Token::Number { value, .. } => {
                l_value = value;
                l_unit = LengthUnit::Px;
            }

            Token::Percentage { unit_value, .. } => {
                l_value = unit_value;
                l_unit = LengthUnit::Percent;
            }

            Token::Dimension {
                value, ref unit, ..
            } => {
                l_value = value;

                l_unit = match_ignore_ascii_case! {unit.as_ref(),
                    "px" => LengthUnit::Px,
                    "em" => LengthUnit::Em,
                    "ex" => LengthUnit::Ex,
                    "in" => LengthUnit::In,
                    "cm" => LengthUnit::Cm,
                    "mm" => LengthUnit::Mm,
                    "pt" => LengthUnit::Pt,
                    "pc" => LengthUnit::Pc,

                    _ => return Err(parser.new_unexpected_token_error(token)),
                };
            }

            _ => return Err(parser.new_unexpected_token_error(token)),
        }

        let l_value = f64::from(finite_f32(l_value).map_err(|e| parser.new_custom_error(e))?);

        <V as Validate>::validate(l_value)
            .map_err(|e| parser.new_custom_error(e))
            .map(|l_value| CssLength::new(l_value, l_unit))
    }
}

/// Metrics of the filtered element, used to resolve relative lengths.
///
/// The host supplies these from the element's style and the current viewport.
pub trait UserSpaceMetrics {
    /// Size of the element's font, in user-space units.
    fn em_length(&self) -> f64;

    /// x-height of the element's font, in user-space units.
    fn ex_length(&self) -> f64;

    /// Width and height of the nearest viewport, in user-space units.
    fn viewport_size(&self) -> (f64, f64);
}

/// [`UserSpaceMetrics`] with fixed values.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SimpleUserSpaceMetrics {
    pub em: f64,
    pub ex: f64,
    pub viewport: (f64, f64),
}

impl Default for SimpleUserSpaceMetrics {
    fn default() -> Self {
        SimpleUserSpaceMetrics {
            em: 16.0,
            ex: 8.0,
            viewport: (300.0, 150.0),
        }
    }
}

impl UserSpaceMetrics for SimpleUserSpaceMetrics {
    fn em_length(&self) -> f64 {
        self.em
    }

    fn ex_length(&self) -> f64 {
        self.ex
    }

    fn viewport_size(&self) -> (f64, f64) {
        self.viewport
    }
}

/// Parameters to normalize [`Length`] values to user-space distances.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NormalizeParams {
    viewport: (f64, f64),
    font_size: f64,
    x_height: f64,
}

impl NormalizeParams {
    pub fn new(metrics: &dyn UserSpaceMetrics) -> NormalizeParams {
        NormalizeParams {
            viewport: metrics.viewport_size(),
            font_size: metrics.em_length(),
            x_height: metrics.ex_length(),
        }
    }

    /// Parameters for lengths in objectBoundingBox units, where percentages are fractions
    /// of the unit square.
    pub fn for_object_bounding_box(&self) -> NormalizeParams {
        NormalizeParams {
            viewport: (1.0, 1.0),
            ..*self
        }
    }
}

impl<N: Normalize, V: Validate> CssLength<N, V> {
    /// Creates a CssLength.
    ///
    /// The compiler needs to know the type parameters `N` and `V` which represents the
    /// length's orientation and validation.
    pub fn new(l: f64, unit: LengthUnit) -> CssLength<N, V> {
        CssLength {
            length: l,
            unit,
            orientation: PhantomData,
            validation: PhantomData,
        }
    }

    /// Convert a Length with units into user-space coordinates.
    ///
    /// Percentages are resolved against the viewport, and font-relative units against the
    /// element's font metrics.
    pub fn to_user(&self, params: &NormalizeParams) -> f64 {
        let (vw, vh) = params.viewport;

        match self.unit {
            LengthUnit::Px => self.length,

            LengthUnit::Percent => self.length * <N as Normalize>::normalize(vw, vh),

            LengthUnit::Em => self.length * params.font_size,

            LengthUnit::Ex => self.length * params.x_height,

            LengthUnit::In => self.length * PX_PER_INCH,

            LengthUnit::Cm => self.length * PX_PER_INCH / CM_PER_INCH,

            LengthUnit::Mm => self.length * PX_PER_INCH / MM_PER_INCH,

            LengthUnit::Pt => self.length * PX_PER_INCH / POINTS_PER_INCH,

            LengthUnit::Pc => self.length * PX_PER_INCH / PICA_PER_INCH,
        }
    }
}

fn viewport_percentage(x: f64, y: f64) -> f64 {
    // https://www.w3.org/TR/SVG/coords.html#Units
    // "For any other length value expressed as a percentage of the viewport, the
    // percentage is calculated as the specified percentage of
    // sqrt((actual-width)**2 + (actual-height)**2))/sqrt(2)."
    (x * x + y * y).sqrt() / SQRT_2
}

/// Alias for `CssLength` types that can have negative values
pub type Length<N> = CssLength<N, Signed>;

/// Alias for `CssLength` types that are non negative
pub type ULength<N> = CssLength<N, Unsigned>;

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = match &self {
            LengthUnit::Percent => "%",
            LengthUnit::Px => "px",
            LengthUnit::Em => "em",
            LengthUnit::Ex => "ex",
            LengthUnit::In => "in",
            LengthUnit::Cm => "cm",
            LengthUnit::Mm => "mm",
            LengthUnit::Pt => "pt",
            LengthUnit::Pc => "pc",
        };

        write!(f, "{unit}")
    }
}
