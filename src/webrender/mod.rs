//! Translation of filter descriptions into WebRender filter programs.
//!
//! WebRender can run filters in two ways:
//!
//! * A CHAIN of simple ops, applied one after the other to the element's rendering.  This
//!   only works for linear chains of the primitives that CSS filter functions produce;
//!   see [`chain`].
//!
//! * An SVGFE graph, where each op reads up to two earlier ops by buffer id.  This can
//!   express most SVG filters; see [`svgfe`].
//!
//! When neither works, the caller has to render the filter in software and hand the result
//! to WebRender as a blob image.

use crate::color::ColorF;
use crate::filters::blend::Mode;
use crate::filters::component_transfer::{ComponentTransfer, FunctionType, TransferFunction};
use crate::rect::Rect;

pub mod chain;
pub mod svgfe;

/// Outcome of building WebRender filters for a filter chain.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WrFiltersStatus {
    /// The holder contains an SVGFE graph.
    Svgfe,

    /// The holder contains a CHAIN of simple ops.
    Chain,

    /// Some primitive cannot be expressed; render the filter in software instead.
    BlobFallback,

    /// The description is malformed, for example an input refers to a later node.
    /// Rendering falls back to software, like [`WrFiltersStatus::BlobFallback`].
    Unsupported,

    /// The filter is too complex and is not rendered at all.
    DisabledForPerformance,
}

impl WrFiltersStatus {
    /// Whether the caller has to render the filter in software.
    pub fn needs_fallback(&self) -> bool {
        matches!(
            *self,
            WrFiltersStatus::BlobFallback | WrFiltersStatus::Unsupported
        )
    }
}

/// Shadow parameters for [`FilterOp::DropShadow`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Shadow {
    pub offset: (f32, f32),
    pub color: ColorF,

    /// Standard deviation of the blur.
    pub blur_radius: f32,
}

/// Kind of a component transfer function in [`FilterData`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ComponentTransferFuncType {
    Identity = 0,
    Table = 1,
    Discrete = 2,
    Linear = 3,
    Gamma = 4,
}

/// Parameters of a component transfer op, one function per channel.
///
/// Values are the table values for `Table` and `Discrete`, `[slope, intercept]` for
/// `Linear` and `[amplitude, exponent, offset]` for `Gamma`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterData {
    pub func_r_type: ComponentTransferFuncType,
    pub r_values: Vec<f32>,
    pub func_g_type: ComponentTransferFuncType,
    pub g_values: Vec<f32>,
    pub func_b_type: ComponentTransferFuncType,
    pub b_values: Vec<f32>,
    pub func_a_type: ComponentTransferFuncType,
    pub a_values: Vec<f32>,
}

fn func_data(func: &TransferFunction) -> (ComponentTransferFuncType, Vec<f32>) {
    let values = |v: &[f64]| v.iter().map(|&x| x as f32).collect();

    match func.effective_type() {
        FunctionType::Identity => (ComponentTransferFuncType::Identity, Vec::new()),
        FunctionType::Table => (ComponentTransferFuncType::Table, values(&func.table_values)),
        FunctionType::Discrete => (
            ComponentTransferFuncType::Discrete,
            values(&func.table_values),
        ),
        FunctionType::Linear => (
            ComponentTransferFuncType::Linear,
            values(&[func.slope, func.intercept]),
        ),
        FunctionType::Gamma => (
            ComponentTransferFuncType::Gamma,
            values(&[func.amplitude, func.exponent, func.offset]),
        ),
    }
}

impl From<&ComponentTransfer> for FilterData {
    fn from(c: &ComponentTransfer) -> FilterData {
        let [r, g, b, a] = &c.functions;

        let (func_r_type, r_values) = func_data(r);
        let (func_g_type, g_values) = func_data(g);
        let (func_b_type, b_values) = func_data(b);
        let (func_a_type, a_values) = func_data(a);

        FilterData {
            func_r_type,
            r_values,
            func_g_type,
            g_values,
            func_b_type,
            b_values,
            func_a_type,
            a_values,
        }
    }
}

impl FilterData {
    /// Length of the longest per-channel value list.
    pub fn max_values_len(&self) -> usize {
        [
            &self.r_values,
            &self.g_values,
            &self.b_values,
            &self.a_values,
        ]
        .iter()
        .map(|v| v.len())
        .max()
        .unwrap_or(0)
    }
}

/// Index of an op in an SVGFE graph, whose result is used as an input.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BufferId(pub usize);

/// Common part of every SVGFE graph op.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOpGraphNode {
    /// Whether the op computes in linearRGB.
    pub linear: bool,

    /// First input; for the composite ops this is the one painted on top.
    pub input: Option<BufferId>,
    pub input2: Option<BufferId>,

    /// Where the op produces pixels, in filter space like the op's parameters.
    pub subregion: Rect,
}

/// A light source for the lighting ops, in filter space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum GraphLight {
    Distant {
        azimuth: f32,
        elevation: f32,
    },
    Point {
        x: f32,
        y: f32,
        z: f32,
    },
    Spot {
        x: f32,
        y: f32,
        z: f32,
        points_at_x: f32,
        points_at_y: f32,
        points_at_z: f32,
        cone_exponent: f32,
        /// In degrees; `None` means the light is not limited to a cone.
        limiting_cone_angle: Option<f32>,
    },
}

/// The operation performed by one node of an SVGFE graph.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterGraphOp {
    SVGFEIdentity,
    SVGFESourceGraphic,
    SVGFESourceAlpha,
    SVGFESrgbToLinear,
    SVGFELinearToSrgb,
    SVGFEBlendColor,
    SVGFEBlendColorBurn,
    SVGFEBlendColorDodge,
    SVGFEBlendDarken,
    SVGFEBlendDifference,
    SVGFEBlendExclusion,
    SVGFEBlendHardLight,
    SVGFEBlendHue,
    SVGFEBlendLighten,
    SVGFEBlendLuminosity,
    SVGFEBlendMultiply,
    SVGFEBlendNormal,
    SVGFEBlendOverlay,
    SVGFEBlendSaturation,
    SVGFEBlendScreen,
    SVGFEBlendSoftLight,
    SVGFEColorMatrix {
        values: [f32; 20],
    },
    /// Parameters are the next entry of [`WrFiltersHolder::filter_datas`].
    SVGFEComponentTransfer,
    SVGFECompositeArithmetic {
        k1: f32,
        k2: f32,
        k3: f32,
        k4: f32,
    },
    SVGFECompositeATop,
    SVGFECompositeIn,
    SVGFECompositeLighter,
    SVGFECompositeOut,
    SVGFECompositeOver,
    SVGFECompositeXOR,
    SVGFEConvolveMatrixEdgeModeDuplicate(GraphConvolveMatrix),
    SVGFEConvolveMatrixEdgeModeNone(GraphConvolveMatrix),
    SVGFEConvolveMatrixEdgeModeWrap(GraphConvolveMatrix),
    SVGFEDiffuseLighting {
        surface_scale: f32,
        diffuse_constant: f32,
        kernel_unit_length: (f32, f32),
        color: ColorF,
        light: GraphLight,
    },
    SVGFEDisplacementMap {
        scale: f32,
        x_channel_selector: u32,
        y_channel_selector: u32,
    },
    SVGFEDropShadow {
        color: ColorF,
        dx: f32,
        dy: f32,
        std_deviation_x: f32,
        std_deviation_y: f32,
    },
    SVGFEFlood {
        color: ColorF,
    },
    SVGFEGaussianBlur {
        std_deviation_x: f32,
        std_deviation_y: f32,
    },
    SVGFEImage {
        href: String,
        /// Image space to filter space, as `[xx, yx, xy, yy, x0, y0]`.
        matrix: [f32; 6],
    },
    SVGFEMorphologyDilate {
        radius_x: f32,
        radius_y: f32,
    },
    SVGFEMorphologyErode {
        radius_x: f32,
        radius_y: f32,
    },
    SVGFEOffset {
        offset_x: f32,
        offset_y: f32,
    },
    SVGFEOpacity {
        value: f32,
    },
    SVGFESpecularLighting {
        surface_scale: f32,
        specular_constant: f32,
        specular_exponent: f32,
        kernel_unit_length: (f32, f32),
        color: ColorF,
        light: GraphLight,
    },
    SVGFETile,
    SVGFEToAlpha,
    SVGFETurbulenceWithFractalNoiseWithNoStitching(GraphTurbulence),
    SVGFETurbulenceWithFractalNoiseWithStitching(GraphTurbulence),
    SVGFETurbulenceWithTurbulenceNoiseWithNoStitching(GraphTurbulence),
    SVGFETurbulenceWithTurbulenceNoiseWithStitching(GraphTurbulence),
}

/// Largest kernel that the convolve ops support, per side.
pub const CONVOLVE_MATRIX_MAX_ORDER: u32 = 5;

/// Largest `tableValues` list that a component transfer op can carry, per channel.
pub const COMPONENT_TRANSFER_MAX_TABLE_LENGTH: usize = 256;

/// Parameters of the convolve matrix ops.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GraphConvolveMatrix {
    pub order_x: u32,
    pub order_y: u32,

    /// Row-major, padded with zeros.
    pub kernel: [f32; 25],
    pub divisor: f32,
    pub bias: f32,
    pub target_x: u32,
    pub target_y: u32,
    pub kernel_unit_length: (f32, f32),
    pub preserve_alpha: bool,
}

/// Parameters of the turbulence ops.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GraphTurbulence {
    pub base_frequency_x: f32,
    pub base_frequency_y: f32,
    pub num_octaves: u32,
    pub seed: i32,
}

impl FilterGraphOp {
    #[rustfmt::skip]
    pub fn blend(mode: Mode) -> FilterGraphOp {
        use FilterGraphOp::*;

        match mode {
            Mode::Normal     => SVGFEBlendNormal,
            Mode::Multiply   => SVGFEBlendMultiply,
            Mode::Screen     => SVGFEBlendScreen,
            Mode::Darken     => SVGFEBlendDarken,
            Mode::Lighten    => SVGFEBlendLighten,
            Mode::Overlay    => SVGFEBlendOverlay,
            Mode::ColorDodge => SVGFEBlendColorDodge,
            Mode::ColorBurn  => SVGFEBlendColorBurn,
            Mode::HardLight  => SVGFEBlendHardLight,
            Mode::SoftLight  => SVGFEBlendSoftLight,
            Mode::Difference => SVGFEBlendDifference,
            Mode::Exclusion  => SVGFEBlendExclusion,
            Mode::Hue        => SVGFEBlendHue,
            Mode::Saturation => SVGFEBlendSaturation,
            Mode::Color      => SVGFEBlendColor,
            Mode::Luminosity => SVGFEBlendLuminosity,
        }
    }
}

/// One WebRender filter op.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    /// Blur with a standard deviation per axis.
    Blur(f32, f32),
    Opacity(f32),
    ColorMatrix([f32; 20]),
    SrgbToLinear,
    LinearToSrgb,
    /// Parameters are the next entry of [`WrFiltersHolder::filter_datas`].
    ComponentTransfer,
    DropShadow(Shadow),
    SvgGraphNode(FilterOpGraphNode, FilterGraphOp),
}

/// Receives the WebRender filters for one element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WrFiltersHolder {
    pub filters: Vec<FilterOp>,
    pub filter_datas: Vec<FilterData>,

    /// Clip for the filtered result, in frame space.
    pub post_filters_clip: Option<Rect>,
}

impl WrFiltersHolder {
    pub fn new() -> WrFiltersHolder {
        WrFiltersHolder::default()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn clear(&mut self) {
        self.filters.clear();
        self.filter_datas.clear();
        self.post_filters_clip = None;
    }

    /// Number of SVGFE graph ops.
    pub fn num_graph_nodes(&self) -> usize {
        self.filters
            .iter()
            .filter(|op| matches!(op, FilterOp::SvgGraphNode(..)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_data_from_component_transfer() {
        let mut c = ComponentTransfer::rgb(TransferFunction::linear(2.0, 0.5));
        c.functions[3] = TransferFunction::table(vec![]);

        let data = FilterData::from(&c);

        assert_eq!(data.func_r_type, ComponentTransferFuncType::Linear);
        assert_eq!(data.r_values, vec![2.0, 0.5]);
        assert_eq!(data.b_values, vec![2.0, 0.5]);

        // an empty table does nothing
        assert_eq!(data.func_a_type, ComponentTransferFuncType::Identity);
        assert!(data.a_values.is_empty());
    }

    #[test]
    fn fallback_statuses() {
        assert!(WrFiltersStatus::BlobFallback.needs_fallback());
        assert!(WrFiltersStatus::Unsupported.needs_fallback());
        assert!(!WrFiltersStatus::DisabledForPerformance.needs_fallback());
        assert!(!WrFiltersStatus::Chain.needs_fallback());
    }
}
