use cssparser::Parser;
use nalgebra::{Matrix3, Matrix4x5, Matrix5};

use crate::attributes::Attributes;
use crate::error::*;
use crate::parse_identifiers;
use crate::parsers::{parse_attribute, set_attribute, CommaSeparatedList, Parse};
use crate::rect::IRect;
use crate::region::IRegion;
use crate::session::Session;

use super::context::PrimitiveContext;
use super::{FilterEffect, Input, Primitive, PrimitiveAttributes};

/// Color matrix operation types.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
enum OperationType {
    #[default]
    Matrix,
    Saturate,
    HueRotate,
    LuminanceToAlpha,
}

/// The `feColorMatrix` filter primitive.
#[derive(Debug, Default, Clone)]
pub struct FeColorMatrix {
    base: Primitive,
    in1: Input,
    params: ColorMatrix,
}

/// Resolved `feColorMatrix` primitive.
///
/// The matrix works on non-premultiplied components in `[0, 1]`; the last column holds
/// the offsets and the last row is always `[0, 0, 0, 0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorMatrix {
    pub matrix: Matrix5<f64>,
}

impl Default for ColorMatrix {
    fn default() -> ColorMatrix {
        ColorMatrix {
            matrix: Matrix5::identity(),
        }
    }
}

#[rustfmt::skip]
impl FilterEffect for FeColorMatrix {
    fn set_attributes(&mut self, attrs: &Attributes, session: &Session) {
        self.in1 = self.base.parse_one_input(attrs, session);

        // First, determine the operation type.
        let mut operation_type = Default::default();
        for (attr, value) in attrs.iter().filter(|(attr, _)| *attr == "type") {
            set_attribute(&mut operation_type, parse_attribute(attr, value), session);
        }

        // Now read the matrix correspondingly.
        //
        // Here we cannot assume that ColorMatrix::default() has provided the correct
        // initial value for the matrix itself, since the initial value for the matrix
        // (i.e. the value to which it should fall back if the `values` attribute is in
        // error) depends on the operation_type.
        self.params.matrix = match operation_type {
            OperationType::LuminanceToAlpha => ColorMatrix::luminance_to_alpha_matrix(),
            _ => Matrix5::identity(),
        };

        if operation_type == OperationType::LuminanceToAlpha {
            return;
        }

        for (attr, value) in attrs.iter().filter(|(attr, _)| *attr == "values") {
            let new_matrix = match operation_type {
                OperationType::LuminanceToAlpha => continue,

                OperationType::Matrix => parse_attribute::<CommaSeparatedList<f64, 20, 20>>(attr, value)
                    .map(|CommaSeparatedList(v)| ColorMatrix::from_row_slice(&v).matrix),

                OperationType::Saturate => parse_attribute::<f64>(attr, value)
                    .map(ColorMatrix::saturate_matrix),

                OperationType::HueRotate => parse_attribute::<f64>(attr, value)
                    .map(|degrees| ColorMatrix::hue_rotate_matrix(degrees.to_radians())),
            };

            set_attribute(&mut self.params.matrix, new_matrix, session);
        }
    }

    fn primitive(&self) -> &Primitive {
        &self.base
    }

    fn inputs(&self) -> Vec<Input> {
        vec![self.in1.clone()]
    }

    fn build(&self, _ctx: &PrimitiveContext<'_>) -> PrimitiveAttributes {
        PrimitiveAttributes::ColorMatrix(self.params.clone())
    }
}

impl ColorMatrix {
    /// Creates a matrix from the 20 values of a `values` attribute, in row-major order.
    pub fn from_row_slice(values: &[f64]) -> ColorMatrix {
        let matrix = Matrix4x5::from_row_slice(values);
        let mut matrix = matrix.fixed_resize(0.0);
        matrix[(4, 4)] = 1.0;
        ColorMatrix { matrix }
    }

    #[rustfmt::skip]
    pub fn luminance_to_alpha_matrix() -> Matrix5<f64> {
        Matrix5::new(
            0.0,    0.0,    0.0,    0.0, 0.0,
            0.0,    0.0,    0.0,    0.0, 0.0,
            0.0,    0.0,    0.0,    0.0, 0.0,
            0.2125, 0.7154, 0.0721, 0.0, 0.0,
            0.0,    0.0,    0.0,    0.0, 1.0,
        )
    }

    #[rustfmt::skip]
    pub fn saturate_matrix(s: f64) -> Matrix5<f64> {
        Matrix5::new(
            0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s, 0.0, 0.0,
            0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s, 0.0, 0.0,
            0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s, 0.0, 0.0,
            0.0,               0.0,               0.0,               1.0, 0.0,
            0.0,               0.0,               0.0,               0.0, 1.0,
        )
    }

    /// The matrix for `sepia(amount)`, with `amount` in `[0, 1]`.
    #[rustfmt::skip]
    pub fn sepia_matrix(amount: f64) -> Matrix5<f64> {
        let s = 1.0 - amount;

        Matrix5::new(
            0.393 + 0.607 * s, 0.769 - 0.769 * s, 0.189 - 0.189 * s, 0.0, 0.0,
            0.349 - 0.349 * s, 0.686 + 0.314 * s, 0.168 - 0.168 * s, 0.0, 0.0,
            0.272 - 0.272 * s, 0.534 - 0.534 * s, 0.131 + 0.869 * s, 0.0, 0.0,
            0.0,               0.0,               0.0,               1.0, 0.0,
            0.0,               0.0,               0.0,               0.0, 1.0,
        )
    }

    pub fn hue_rotate_matrix(radians: f64) -> Matrix5<f64> {
        let (sin, cos) = radians.sin_cos();

        let a = Matrix3::new(
            0.213, 0.715, 0.072, 0.213, 0.715, 0.072, 0.213, 0.715, 0.072,
        );

        let b = Matrix3::new(
            0.787, -0.715, -0.072, -0.213, 0.285, -0.072, -0.213, -0.715, 0.928,
        );

        let c = Matrix3::new(
            -0.213, -0.715, 0.928, 0.143, 0.140, -0.283, -0.787, 0.715, 0.072,
        );

        let top_left = a + b * cos + c * sin;

        let mut matrix = top_left.fixed_resize(0.0);
        matrix[(3, 3)] = 1.0;
        matrix[(4, 4)] = 1.0;
        matrix
    }

    pub fn is_identity(&self) -> bool {
        self.matrix == Matrix5::identity()
    }

    /// The first four rows in row-major order, as used by WebRender.
    pub fn to_row_major(&self) -> [f32; 20] {
        let mut values = [0.0; 20];

        for row in 0..4 {
            for col in 0..5 {
                values[row * 5 + col] = self.matrix[(row, col)] as f32;
            }
        }

        values
    }

    /// Whether transparent black becomes visible, which happens when alpha gets an offset.
    pub fn produces_alpha_from_transparent(&self) -> bool {
        self.matrix[(3, 4)] > 0.0
    }

    pub fn post_filter_extents(&self, extents: &IRegion, subregion: &IRect) -> IRegion {
        if self.produces_alpha_from_transparent() {
            IRegion::from_rect(*subregion)
        } else {
            extents.clone()
        }
    }
}

impl Parse for OperationType {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Self, ParseError<'i>> {
        Ok(parse_identifiers!(
            parser,
            "matrix" => OperationType::Matrix,
            "saturate" => OperationType::Saturate,
            "hueRotate" => OperationType::HueRotate,
            "luminanceToAlpha" => OperationType::LuminanceToAlpha,
        )?)
    }
}
