//! CSS filter functions, and their translation into filter primitives.

use cssparser::Parser;

use crate::angle::Angle;
use crate::color::{resolve_color, Color, ColorF, RGBA};
use crate::error::*;
use crate::filters::color_matrix::ColorMatrix;
use crate::filters::component_transfer::{ComponentTransfer, TransferFunction};
use crate::filters::drop_shadow::DropShadow as DropShadowParams;
use crate::filters::gaussian_blur::{GaussianBlur, MAXIMUM_STD_DEVIATION};
use crate::filters::opacity::Opacity as OpacityParams;
use crate::filters::{
    ColorSpace, FilterPrimitiveDescription, InputRef, PrimitiveAttributes,
};
use crate::length::*;
use crate::parsers::{NumberOrPercentage, Parse};
use crate::rect::IRect;
use crate::region::IRegion;
use crate::regions;

/// CSS Filter functions from the Filter Effects Module Level 1
///
/// https://www.w3.org/TR/filter-effects/#filter-functions
#[derive(Debug, Clone, PartialEq)]
pub enum FilterFunction {
    Blur(Blur),
    Brightness(Brightness),
    Contrast(Contrast),
    DropShadow(DropShadow),
    Grayscale(Grayscale),
    HueRotate(HueRotate),
    Invert(Invert),
    Opacity(Opacity),
    Saturate(Saturate),
    Sepia(Sepia),
}

/// Parameters for the `blur()` filter function
///
/// https://www.w3.org/TR/filter-effects/#funcdef-filter-blur
#[derive(Debug, Clone, PartialEq)]
pub struct Blur {
    pub std_deviation: Option<ULength<Both>>,
}

/// Parameters for the `brightness()` filter function
///
/// https://www.w3.org/TR/filter-effects/#funcdef-filter-brightness
#[derive(Debug, Clone, PartialEq)]
pub struct Brightness {
    pub proportion: Option<f64>,
}

/// Parameters for the `contrast()` filter function
///
/// https://www.w3.org/TR/filter-effects/#funcdef-filter-contrast
#[derive(Debug, Clone, PartialEq)]
pub struct Contrast {
    pub proportion: Option<f64>,
}

/// Parameters for the `drop-shadow()` filter function
///
/// https://www.w3.org/TR/filter-effects/#funcdef-filter-drop-shadow
#[derive(Debug, Clone, PartialEq)]
pub struct DropShadow {
    pub color: Option<Color>,
    pub dx: Length<Horizontal>,
    pub dy: Length<Vertical>,
    pub std_deviation: Option<ULength<Both>>,
}

/// Parameters for the `grayscale()` filter function
///
/// https://www.w3.org/TR/filter-effects/#funcdef-filter-grayscale
#[derive(Debug, Clone, PartialEq)]
pub struct Grayscale {
    pub proportion: Option<f64>,
}

/// Parameters for the `hue-rotate()` filter function
///
/// https://www.w3.org/TR/filter-effects/#funcdef-filter-hue-rotate
#[derive(Debug, Clone, PartialEq)]
pub struct HueRotate {
    pub angle: Option<Angle>,
}

/// Parameters for the `invert()` filter function
///
/// https://www.w3.org/TR/filter-effects/#funcdef-filter-invert
#[derive(Debug, Clone, PartialEq)]
pub struct Invert {
    pub proportion: Option<f64>,
}

/// Parameters for the `opacity()` filter function
///
/// https://www.w3.org/TR/filter-effects/#funcdef-filter-opacity
#[derive(Debug, Clone, PartialEq)]
pub struct Opacity {
    pub proportion: Option<f64>,
}

/// Parameters for the `saturate()` filter function
///
/// https://www.w3.org/TR/filter-effects/#funcdef-filter-saturate
#[derive(Debug, Clone, PartialEq)]
pub struct Saturate {
    pub proportion: Option<f64>,
}

/// Parameters for the `sepia()` filter function
///
/// https://www.w3.org/TR/filter-effects/#funcdef-filter-sepia
#[derive(Debug, Clone, PartialEq)]
pub struct Sepia {
    pub proportion: Option<f64>,
}

/// Reads an optional number or percentage from the parser.
/// Negative numbers are not allowed.
fn parse_num_or_percentage(parser: &mut Parser<'_, '_>) -> Option<f64> {
    match parser.try_parse(|p| NumberOrPercentage::parse(p)) {
        Ok(NumberOrPercentage { value }) if value < 0.0 => None,
        Ok(NumberOrPercentage { value }) => Some(value),
        Err(_) => None,
    }
}

/// Reads an optional number or percentage from the parser, returning a value clamped to [0, 1].
/// Negative numbers are not allowed.
fn parse_num_or_percentage_clamped(parser: &mut Parser<'_, '_>) -> Option<f64> {
    parse_num_or_percentage(parser).map(|value| value.clamp(0.0, 1.0))
}

fn parse_function<'i, F>(
    parser: &mut Parser<'i, '_>,
    name: &str,
    f: F,
) -> Result<FilterFunction, ParseError<'i>>
where
    F: for<'tt> FnOnce(&mut Parser<'i, 'tt>) -> Result<FilterFunction, ParseError<'i>>,
{
    parser.expect_function_matching(name)?;
    parser.parse_nested_block(f)
}

// This function doesn't fail, but returns a Result like the other parsers, so tell Clippy
// about that.
#[allow(clippy::unnecessary_wraps)]
fn parse_blur<'i>(parser: &mut Parser<'i, '_>) -> Result<FilterFunction, ParseError<'i>> {
    let length = parser.try_parse(|p| ULength::parse(p)).ok();

    Ok(FilterFunction::Blur(Blur {
        std_deviation: length,
    }))
}

#[allow(clippy::unnecessary_wraps)]
fn parse_brightness<'i>(parser: &mut Parser<'i, '_>) -> Result<FilterFunction, ParseError<'i>> {
    let proportion = parse_num_or_percentage(parser);

    Ok(FilterFunction::Brightness(Brightness { proportion }))
}

#[allow(clippy::unnecessary_wraps)]
fn parse_contrast<'i>(parser: &mut Parser<'i, '_>) -> Result<FilterFunction, ParseError<'i>> {
    let proportion = parse_num_or_percentage(parser);

    Ok(FilterFunction::Contrast(Contrast { proportion }))
}

fn parse_color(parser: &mut Parser<'_, '_>) -> Option<Color> {
    parser.try_parse(|p| Color::parse(p)).ok()
}

/// `drop-shadow( <color>? && <length>{2,3} )`
fn parse_dropshadow<'i>(parser: &mut Parser<'i, '_>) -> Result<FilterFunction, ParseError<'i>> {
    let mut color = parse_color(parser);

    let dx = Length::<Horizontal>::parse(parser)?;
    let dy = Length::<Vertical>::parse(parser)?;
    let std_deviation = parser.try_parse(|p| ULength::parse(p)).ok();

    if color.is_none() {
        color = parse_color(parser);
    }

    Ok(FilterFunction::DropShadow(DropShadow {
        color,
        dx,
        dy,
        std_deviation,
    }))
}

#[allow(clippy::unnecessary_wraps)]
fn parse_grayscale<'i>(parser: &mut Parser<'i, '_>) -> Result<FilterFunction, ParseError<'i>> {
    let proportion = parse_num_or_percentage_clamped(parser);

    Ok(FilterFunction::Grayscale(Grayscale { proportion }))
}

#[allow(clippy::unnecessary_wraps)]
fn parse_huerotate<'i>(parser: &mut Parser<'i, '_>) -> Result<FilterFunction, ParseError<'i>> {
    let angle = parser.try_parse(|p| Angle::parse(p)).ok();

    Ok(FilterFunction::HueRotate(HueRotate { angle }))
}

#[allow(clippy::unnecessary_wraps)]
fn parse_invert<'i>(parser: &mut Parser<'i, '_>) -> Result<FilterFunction, ParseError<'i>> {
    let proportion = parse_num_or_percentage_clamped(parser);

    Ok(FilterFunction::Invert(Invert { proportion }))
}

#[allow(clippy::unnecessary_wraps)]
fn parse_opacity<'i>(parser: &mut Parser<'i, '_>) -> Result<FilterFunction, ParseError<'i>> {
    let proportion = parse_num_or_percentage_clamped(parser);

    Ok(FilterFunction::Opacity(Opacity { proportion }))
}

#[allow(clippy::unnecessary_wraps)]
fn parse_saturate<'i>(parser: &mut Parser<'i, '_>) -> Result<FilterFunction, ParseError<'i>> {
    let proportion = parse_num_or_percentage(parser);

    Ok(FilterFunction::Saturate(Saturate { proportion }))
}

#[allow(clippy::unnecessary_wraps)]
fn parse_sepia<'i>(parser: &mut Parser<'i, '_>) -> Result<FilterFunction, ParseError<'i>> {
    let proportion = parse_num_or_percentage_clamped(parser);

    Ok(FilterFunction::Sepia(Sepia { proportion }))
}

/// What the CSS filter functions need to resolve their parameters into filter space.
struct ResolveParams {
    params: NormalizeParams,
    scale: (f64, f64),
    current_color: RGBA,
}

impl ResolveParams {
    /// Converts a standard deviation into filter space, clamped to what blurs support.
    fn std_deviation(&self, length: Option<ULength<Both>>) -> (f64, f64) {
        let s = length.map_or(0.0, |l| l.to_user(&self.params));
        let (sx, sy) = self.scale;

        (
            (s * sx).min(MAXIMUM_STD_DEVIATION),
            (s * sy).min(MAXIMUM_STD_DEVIATION),
        )
    }
}

impl Blur {
    fn to_attributes(&self, rp: &ResolveParams) -> PrimitiveAttributes {
        PrimitiveAttributes::GaussianBlur(GaussianBlur {
            std_deviation: rp.std_deviation(self.std_deviation),
        })
    }
}

impl Brightness {
    fn to_attributes(&self) -> PrimitiveAttributes {
        let slope = self.proportion.unwrap_or(1.0);

        PrimitiveAttributes::ComponentTransfer(ComponentTransfer::rgb(TransferFunction::linear(
            slope, 0.0,
        )))
    }
}

impl Contrast {
    fn to_attributes(&self) -> PrimitiveAttributes {
        let slope = self.proportion.unwrap_or(1.0);
        let intercept = -(0.5 * slope) + 0.5;

        PrimitiveAttributes::ComponentTransfer(ComponentTransfer::rgb(TransferFunction::linear(
            slope, intercept,
        )))
    }
}

impl DropShadow {
    fn to_attributes(&self, rp: &ResolveParams) -> PrimitiveAttributes {
        let (sx, sy) = rp.scale;

        let color = self
            .color
            .as_ref()
            .map_or(rp.current_color, |c| resolve_color(c, rp.current_color));

        PrimitiveAttributes::DropShadow(DropShadowParams {
            std_deviation: rp.std_deviation(self.std_deviation),
            offset: (
                self.dx.to_user(&rp.params) * sx,
                self.dy.to_user(&rp.params) * sy,
            ),
            color: ColorF::from(color),
        })
    }
}

impl Grayscale {
    fn to_attributes(&self) -> PrimitiveAttributes {
        // grayscale is implemented as the inverse of a saturate operation,
        // with the input clamped to the range [0, 1] by the parser.
        let p = 1.0 - self.proportion.unwrap_or(1.0);

        PrimitiveAttributes::ColorMatrix(ColorMatrix {
            matrix: ColorMatrix::saturate_matrix(p),
        })
    }
}

impl HueRotate {
    fn to_attributes(&self) -> PrimitiveAttributes {
        let radians = self.angle.map_or(0.0, Angle::radians);

        PrimitiveAttributes::ColorMatrix(ColorMatrix {
            matrix: ColorMatrix::hue_rotate_matrix(radians),
        })
    }
}

impl Invert {
    fn to_attributes(&self) -> PrimitiveAttributes {
        let p = self.proportion.unwrap_or(1.0);

        PrimitiveAttributes::ComponentTransfer(ComponentTransfer::rgb(TransferFunction::table(
            vec![p, 1.0 - p],
        )))
    }
}

impl Opacity {
    fn to_attributes(&self) -> PrimitiveAttributes {
        let p = self.proportion.unwrap_or(1.0);

        PrimitiveAttributes::Opacity(OpacityParams { opacity: p as f32 })
    }
}

impl Saturate {
    fn to_attributes(&self) -> PrimitiveAttributes {
        let p = self.proportion.unwrap_or(1.0);

        PrimitiveAttributes::ColorMatrix(ColorMatrix {
            matrix: ColorMatrix::saturate_matrix(p),
        })
    }
}

impl Sepia {
    fn to_attributes(&self) -> PrimitiveAttributes {
        let p = self.proportion.unwrap_or(1.0);

        PrimitiveAttributes::ColorMatrix(ColorMatrix {
            matrix: ColorMatrix::sepia_matrix(p),
        })
    }
}

impl Parse for FilterFunction {
    #[allow(clippy::type_complexity)]
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Self, ParseError<'i>> {
        let loc = parser.current_source_location();
        let fns: Vec<(&str, &dyn Fn(&mut Parser<'i, '_>) -> _)> = vec![
            ("blur", &parse_blur),
            ("brightness", &parse_brightness),
            ("contrast", &parse_contrast),
            ("drop-shadow", &parse_dropshadow),
            ("grayscale", &parse_grayscale),
            ("hue-rotate", &parse_huerotate),
            ("invert", &parse_invert),
            ("opacity", &parse_opacity),
            ("saturate", &parse_saturate),
            ("sepia", &parse_sepia),
        ];

        for (filter_name, parse_fn) in fns {
            if let Ok(func) = parser.try_parse(|p| parse_function(p, filter_name, parse_fn)) {
                return Ok(func);
            }
        }

        Err(loc.new_custom_error(ValueErrorKind::parse_error("expected filter function")))
    }
}

impl FilterFunction {
    fn to_attributes(&self, rp: &ResolveParams) -> PrimitiveAttributes {
        match self {
            FilterFunction::Blur(v) => v.to_attributes(rp),
            FilterFunction::Brightness(v) => v.to_attributes(),
            FilterFunction::Contrast(v) => v.to_attributes(),
            FilterFunction::DropShadow(v) => v.to_attributes(rp),
            FilterFunction::Grayscale(v) => v.to_attributes(),
            FilterFunction::HueRotate(v) => v.to_attributes(),
            FilterFunction::Invert(v) => v.to_attributes(),
            FilterFunction::Opacity(v) => v.to_attributes(),
            FilterFunction::Saturate(v) => v.to_attributes(),
            FilterFunction::Sepia(v) => v.to_attributes(),
        }
    }
}

/// Builds the primitive description for one CSS filter function of a filter chain.
///
/// Every function turns into a single node in sRGB that reads the result of the
/// previous entry in the chain.
pub struct CSSFilterInstance<'a> {
    function: &'a FilterFunction,

    /// Bounds of the element being filtered, in filter space.
    target_bounds: IRect,

    rp: ResolveParams,
}

impl<'a> CSSFilterInstance<'a> {
    pub fn new(
        function: &'a FilterFunction,
        target_bounds: IRect,
        scale: (f64, f64),
        metrics: &dyn UserSpaceMetrics,
        current_color: RGBA,
    ) -> CSSFilterInstance<'a> {
        CSSFilterInstance {
            function,
            target_bounds,
            rp: ResolveParams {
                params: NormalizeParams::new(metrics),
                scale,
                current_color,
            },
        }
    }

    /// Appends the function's primitive to `descriptions`.
    // If this function starts actually returning an Err, remove this Clippy exception:
    #[allow(clippy::unnecessary_wraps)]
    pub fn build_primitives(
        &self,
        descriptions: &mut Vec<FilterPrimitiveDescription>,
        input_is_tainted: bool,
    ) -> Result<(), crate::error::FilterResolveError> {
        let mut descr = FilterPrimitiveDescription::new(self.function.to_attributes(&self.rp));

        let (input, input_bounds) = match descriptions.len().checked_sub(1) {
            Some(i) => (InputRef::Primitive(i), descriptions[i].subregion),
            None => (InputRef::SourceGraphic, self.target_bounds),
        };

        descr.add_input(input, ColorSpace::SRgb);
        descr.output_color_space = ColorSpace::SRgb;
        descr.is_tainted = input_is_tainted;

        // The output covers whatever the function can produce from its input.
        descr.subregion = input_bounds;
        let extents = regions::post_filter_extents_for_primitive(
            &descr,
            &[IRegion::from_rect(input_bounds)],
        )
        .bounds();

        descr.subregion = extents;
        descr.filter_space_bounds = extents;

        descriptions.push(descr);

        Ok(())
    }
}
