//! Builds a WebRender SVGFE graph from a filter description.
//!
//! Nodes of the description are translated in order.  The remap table maps each node to
//! the buffer that holds its result; most nodes produce a single op, but a node can also
//! produce none (a no-op primitive just forwards its input buffer) or several (`feMerge`
//! becomes a sequence of composite ops).
//!
//! Color spaces are tracked per buffer.  When a node wants an input in a different space,
//! a conversion op is inserted before it; conversions are shared between consumers of the
//! same buffer.

use std::collections::HashMap;
use std::fmt;

use crate::color::ColorF;
use crate::config::{SvgfeKinds, WebRenderConfig, SVGFE_GRAPH_MAX};
use crate::filters::component_transfer::ComponentTransfer;
use crate::filters::composite::Operator as CompositeOperator;
use crate::filters::convolve_matrix::{ConvolveMatrix, EdgeMode};
use crate::filters::displacement_map::ColorChannel;
use crate::filters::lighting::{Lighting, LightSource};
use crate::filters::morphology::Operator as MorphologyOperator;
use crate::filters::turbulence::{NoiseType, StitchTiles, Turbulence};
use crate::filters::{
    ColorSpace, FilterDescription, FilterPrimitiveDescription, InputRef, PrimitiveAttributes,
};
use crate::rect::Rect;
use crate::session::Session;
use crate::transform::Transform;

use super::{
    BufferId, FilterData, FilterGraphOp, FilterOp, FilterOpGraphNode, GraphConvolveMatrix,
    GraphLight, GraphTurbulence, WrFiltersHolder, WrFiltersStatus,
    COMPONENT_TRANSFER_MAX_TABLE_LENGTH, CONVOLVE_MATRIX_MAX_ORDER,
};

/// Why a description could not be turned into a graph.
#[derive(Debug, Clone, PartialEq)]
enum GraphError {
    /// A primitive cannot be expressed as graph ops.
    Fallback(String),

    /// The description itself is malformed.
    Unsupported(String),

    /// The graph has more ops than [`SVGFE_GRAPH_MAX`].
    TooComplex,
}

impl GraphError {
    fn status(&self) -> WrFiltersStatus {
        match *self {
            GraphError::Fallback(_) => WrFiltersStatus::BlobFallback,
            GraphError::Unsupported(_) => WrFiltersStatus::Unsupported,
            GraphError::TooComplex => WrFiltersStatus::DisabledForPerformance,
        }
    }
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            GraphError::Fallback(ref s) => write!(f, "falling back to blob rendering: {s}"),
            GraphError::Unsupported(ref s) => write!(f, "unsupported filter graph: {s}"),
            GraphError::TooComplex => {
                write!(f, "filter graph has more than {SVGFE_GRAPH_MAX} ops")
            }
        }
    }
}

/// Translates `description` into SVGFE graph ops and appends them to `holder`.
///
/// On any status other than [`WrFiltersStatus::Svgfe`] the holder is left untouched.
/// Buffer ids count from the first op that this call appends.
pub fn build_svgfe_graph(
    description: &FilterDescription,
    filter_to_frame: &Transform,
    config: &WebRenderConfig,
    holder: &mut WrFiltersHolder,
    session: &Session,
) -> WrFiltersStatus {
    let mut builder = GraphBuilder::new(description, config.kinds);

    match builder.build() {
        Ok(()) => {
            let last = description.last().map(|d| d.subregion).unwrap_or_default();
            let clip = Rect::from(last).intersect(&description.filter_region);

            holder.filters.extend(
                builder
                    .ops
                    .into_iter()
                    .map(|(node, op)| FilterOp::SvgGraphNode(node, op)),
            );
            holder.filter_datas.extend(builder.filter_datas);
            holder.post_filters_clip = Some(filter_to_frame.transform_rect(&clip));

            WrFiltersStatus::Svgfe
        }

        Err(e) => {
            fegraph_log!(session, "{}", e);
            e.status()
        }
    }
}

struct GraphBuilder<'a> {
    description: &'a FilterDescription,
    kinds: SvgfeKinds,

    ops: Vec<(FilterOpGraphNode, FilterGraphOp)>,

    /// Color space of each op's result, parallel to `ops`.
    spaces: Vec<ColorSpace>,

    filter_datas: Vec<FilterData>,

    /// Buffer that holds the result of each node of the description.
    remap: Vec<Option<BufferId>>,

    source_graphic: Option<BufferId>,
    source_alpha: Option<BufferId>,
    conversions: HashMap<(BufferId, ColorSpace), BufferId>,
}

impl<'a> GraphBuilder<'a> {
    fn new(description: &'a FilterDescription, kinds: SvgfeKinds) -> GraphBuilder<'a> {
        GraphBuilder {
            description,
            kinds,
            ops: Vec::new(),
            spaces: Vec::new(),
            filter_datas: Vec::new(),
            remap: vec![None; description.primitives.len()],
            source_graphic: None,
            source_alpha: None,
            conversions: HashMap::new(),
        }
    }

    fn build(&mut self) -> Result<(), GraphError> {
        let description = self.description;
        let primitives = &description.primitives;

        if primitives.len() > SVGFE_GRAPH_MAX {
            return Err(GraphError::TooComplex);
        }

        for (i, descr) in primitives.iter().enumerate() {
            self.check_kind(&descr.attributes)?;

            let subregion = Rect::from(descr.subregion);

            let mut raw_inputs = Vec::with_capacity(descr.num_inputs());
            let mut inputs = Vec::with_capacity(descr.num_inputs());
            let mut num_conversions = 0;

            for (j, &input) in descr.inputs.iter().enumerate() {
                let raw = self.source(input, i)?;
                let (converted, emitted) =
                    self.convert(raw, descr.input_color_space(j), subregion)?;

                if emitted {
                    num_conversions += 1;
                }

                raw_inputs.push(raw);
                inputs.push(converted);
            }

            if is_noop(descr) {
                if let Some(&raw) = raw_inputs.first() {
                    for _ in 0..num_conversions {
                        self.pop_conversion();
                    }

                    self.remap[i] = Some(raw);
                    continue;
                }
            }

            let result = self.translate(descr, &inputs, subregion)?;
            self.remap[i] = Some(result);
        }

        let last = primitives.len().checked_sub(1).and_then(|i| self.remap[i]);

        if let Some(last) = last {
            let subregion = description
                .last()
                .map(|d| Rect::from(d.subregion))
                .unwrap_or_default();

            let (output, _) = self.convert(last, ColorSpace::SRgb, subregion)?;

            if output.0 + 1 != self.ops.len() {
                self.push(
                    node(false, Some(output), None, subregion),
                    FilterGraphOp::SVGFEIdentity,
                    ColorSpace::SRgb,
                )?;
            }
        }

        Ok(())
    }

    fn push(
        &mut self,
        node: FilterOpGraphNode,
        op: FilterGraphOp,
        space: ColorSpace,
    ) -> Result<BufferId, GraphError> {
        if self.ops.len() >= SVGFE_GRAPH_MAX {
            return Err(GraphError::TooComplex);
        }

        self.ops.push((node, op));
        self.spaces.push(space);

        Ok(BufferId(self.ops.len() - 1))
    }

    fn source_bounds(&self) -> Rect {
        self.description
            .primitives
            .first()
            .map(|d| Rect::from(d.filter_space_bounds))
            .unwrap_or_default()
    }

    /// The buffer for input `input` of node `index`.
    fn source(&mut self, input: InputRef, index: usize) -> Result<BufferId, GraphError> {
        match input {
            InputRef::Primitive(k) if k < index => self.remap[k].ok_or_else(|| {
                GraphError::Unsupported(format!("node {index} reads node {k} before it is built"))
            }),

            InputRef::Primitive(k) => Err(GraphError::Unsupported(format!(
                "node {index} reads node {k}, which does not come before it"
            ))),

            InputRef::SourceGraphic => {
                if let Some(id) = self.source_graphic {
                    return Ok(id);
                }

                let id = self.push(
                    node(false, None, None, self.source_bounds()),
                    FilterGraphOp::SVGFESourceGraphic,
                    ColorSpace::SRgb,
                )?;
                self.source_graphic = Some(id);
                Ok(id)
            }

            InputRef::SourceAlpha => {
                if let Some(id) = self.source_alpha {
                    return Ok(id);
                }

                let id = self.push(
                    node(false, None, None, self.source_bounds()),
                    FilterGraphOp::SVGFESourceAlpha,
                    ColorSpace::SRgb,
                )?;
                self.source_alpha = Some(id);
                Ok(id)
            }

            InputRef::FillPaint | InputRef::StrokePaint => Err(GraphError::Fallback(format!(
                "{input:?} is not available to the graph"
            ))),
        }
    }

    /// Returns a buffer with the contents of `buffer` in color space `to`, and whether an
    /// op was emitted for it.
    fn convert(
        &mut self,
        buffer: BufferId,
        to: ColorSpace,
        subregion: Rect,
    ) -> Result<(BufferId, bool), GraphError> {
        if self.spaces[buffer.0] == to {
            return Ok((buffer, false));
        }

        if let Some(&id) = self.conversions.get(&(buffer, to)) {
            return Ok((id, false));
        }

        let op = match to {
            ColorSpace::LinearRgb => FilterGraphOp::SVGFESrgbToLinear,
            ColorSpace::SRgb => FilterGraphOp::SVGFELinearToSrgb,
        };

        let id = self.push(node(false, Some(buffer), None, subregion), op, to)?;
        self.conversions.insert((buffer, to), id);

        Ok((id, true))
    }

    /// Removes the last op, which must be a conversion that nothing uses yet.
    fn pop_conversion(&mut self) {
        if self.ops.pop().is_some() {
            self.spaces.pop();
            let removed = BufferId(self.ops.len());
            self.conversions.retain(|_, id| *id != removed);
        }
    }

    fn check_kind(&self, attributes: &PrimitiveAttributes) -> Result<(), GraphError> {
        use PrimitiveAttributes::*;

        let k = &self.kinds;

        let enabled = match *attributes {
            Empty => true,
            Blend(_) => k.blend,
            ColorMatrix(_) => k.color_matrix,
            ComponentTransfer(_) => k.component_transfer,
            Composite(_) => k.composite,
            ConvolveMatrix(_) => k.convolve_matrix,
            DiffuseLighting(_) => k.diffuse_lighting,
            DisplacementMap(_) => k.displacement_map,
            DropShadow(_) => k.drop_shadow,
            Flood(_) => k.flood,
            GaussianBlur(_) => k.gaussian_blur,
            Image(_) => k.image,
            Merge => k.merge,
            Morphology(_) => k.morphology,
            Offset(_) => k.offset,
            Opacity(_) => k.opacity,
            SpecularLighting(_) => k.specular_lighting,
            Tile(_) => k.tile,
            ToAlpha => k.to_alpha,
            Turbulence(_) => k.turbulence,
        };

        if enabled {
            Ok(())
        } else {
            Err(GraphError::Fallback(format!(
                "{} is disabled for SVGFE graphs",
                attributes.name()
            )))
        }
    }

    /// Emits the ops for one node and returns the buffer with its result.
    fn translate(
        &mut self,
        descr: &FilterPrimitiveDescription,
        inputs: &[BufferId],
        subregion: Rect,
    ) -> Result<BufferId, GraphError> {
        use PrimitiveAttributes as A;

        let space = descr.output_color_space;
        let linear = space == ColorSpace::LinearRgb;
        let in1 = inputs.first().copied();
        let in2 = inputs.get(1).copied();
        let one = node(linear, in1, None, subregion);
        let two = node(linear, in1, in2, subregion);

        let (graph_node, op) = match descr.attributes {
            A::Empty => (
                node(false, None, None, subregion),
                FilterGraphOp::SVGFEFlood {
                    color: ColorF::TRANSPARENT,
                },
            ),

            A::Blend(ref b) => (two, FilterGraphOp::blend(b.mode)),

            A::ColorMatrix(ref m) => (
                one,
                FilterGraphOp::SVGFEColorMatrix {
                    values: m.to_row_major(),
                },
            ),

            A::ComponentTransfer(ref c) => {
                self.filter_datas.push(component_transfer_data(c)?);
                (one, FilterGraphOp::SVGFEComponentTransfer)
            }

            A::Composite(ref c) => {
                let op = match c.operator {
                    CompositeOperator::Over => FilterGraphOp::SVGFECompositeOver,
                    CompositeOperator::In => FilterGraphOp::SVGFECompositeIn,
                    CompositeOperator::Out => FilterGraphOp::SVGFECompositeOut,
                    CompositeOperator::Atop => FilterGraphOp::SVGFECompositeATop,
                    CompositeOperator::Xor => FilterGraphOp::SVGFECompositeXOR,
                    CompositeOperator::Lighter => FilterGraphOp::SVGFECompositeLighter,
                    CompositeOperator::Arithmetic => FilterGraphOp::SVGFECompositeArithmetic {
                        k1: c.k1 as f32,
                        k2: c.k2 as f32,
                        k3: c.k3 as f32,
                        k4: c.k4 as f32,
                    },
                };
                (two, op)
            }

            A::ConvolveMatrix(ref c) => (one, convolve_matrix_op(c)?),

            A::DiffuseLighting(ref l) => (
                one,
                FilterGraphOp::SVGFEDiffuseLighting {
                    surface_scale: l.lighting.surface_scale as f32,
                    diffuse_constant: l.diffuse_constant as f32,
                    kernel_unit_length: kernel_unit_length(&l.lighting),
                    color: l.lighting.lighting_color,
                    light: graph_light(&l.lighting.light),
                },
            ),

            A::SpecularLighting(ref l) => (
                one,
                FilterGraphOp::SVGFESpecularLighting {
                    surface_scale: l.lighting.surface_scale as f32,
                    specular_constant: l.specular_constant as f32,
                    specular_exponent: l.specular_exponent as f32,
                    kernel_unit_length: kernel_unit_length(&l.lighting),
                    color: l.lighting.lighting_color,
                    light: graph_light(&l.lighting.light),
                },
            ),

            A::DisplacementMap(ref d) => (
                two,
                FilterGraphOp::SVGFEDisplacementMap {
                    scale: d.scale as f32,
                    x_channel_selector: channel_index(d.x_channel_selector),
                    y_channel_selector: channel_index(d.y_channel_selector),
                },
            ),

            A::DropShadow(ref d) => (
                one,
                FilterGraphOp::SVGFEDropShadow {
                    color: d.color,
                    dx: d.offset.0 as f32,
                    dy: d.offset.1 as f32,
                    std_deviation_x: d.std_deviation.0 as f32,
                    std_deviation_y: d.std_deviation.1 as f32,
                },
            ),

            A::Flood(ref f) => (
                node(false, None, None, subregion),
                FilterGraphOp::SVGFEFlood { color: f.color },
            ),

            A::GaussianBlur(ref b) => (
                one,
                FilterGraphOp::SVGFEGaussianBlur {
                    std_deviation_x: b.std_deviation.0 as f32,
                    std_deviation_y: b.std_deviation.1 as f32,
                },
            ),

            A::Image(ref image) => {
                let t = &image.transform;
                (
                    node(false, None, None, subregion),
                    FilterGraphOp::SVGFEImage {
                        href: image.image.href.clone(),
                        matrix: [t.xx, t.yx, t.xy, t.yy, t.x0, t.y0].map(|v| v as f32),
                    },
                )
            }

            A::Merge => return self.merge(inputs, linear, subregion, space),

            A::Morphology(ref m) => {
                let (radius_x, radius_y) = (m.radius.0 as f32, m.radius.1 as f32);
                let op = match m.operator {
                    MorphologyOperator::Dilate => {
                        FilterGraphOp::SVGFEMorphologyDilate { radius_x, radius_y }
                    }
                    MorphologyOperator::Erode => {
                        FilterGraphOp::SVGFEMorphologyErode { radius_x, radius_y }
                    }
                };
                (one, op)
            }

            A::Offset(ref o) => (
                one,
                FilterGraphOp::SVGFEOffset {
                    offset_x: o.dx as f32,
                    offset_y: o.dy as f32,
                },
            ),

            A::Opacity(ref o) => (one, FilterGraphOp::SVGFEOpacity { value: o.opacity }),

            A::Tile(_) => (one, FilterGraphOp::SVGFETile),

            A::ToAlpha => (one, FilterGraphOp::SVGFEToAlpha),

            A::Turbulence(ref t) => (node(linear, None, None, subregion), turbulence_op(t)),
        };

        self.push(graph_node, op, space)
    }

    /// Paints each input over the previous ones, in order.
    fn merge(
        &mut self,
        inputs: &[BufferId],
        linear: bool,
        subregion: Rect,
        space: ColorSpace,
    ) -> Result<BufferId, GraphError> {
        let Some((&first, rest)) = inputs.split_first() else {
            return self.push(
                node(false, None, None, subregion),
                FilterGraphOp::SVGFEFlood {
                    color: ColorF::TRANSPARENT,
                },
                space,
            );
        };

        let mut result = first;

        for &input in rest {
            result = self.push(
                node(linear, Some(input), Some(result), subregion),
                FilterGraphOp::SVGFECompositeOver,
                space,
            )?;
        }

        Ok(result)
    }
}

fn node(
    linear: bool,
    input: Option<BufferId>,
    input2: Option<BufferId>,
    subregion: Rect,
) -> FilterOpGraphNode {
    FilterOpGraphNode {
        linear,
        input,
        input2,
        subregion,
    }
}

/// Whether the node passes its first input through unchanged.
fn is_noop(descr: &FilterPrimitiveDescription) -> bool {
    use PrimitiveAttributes::*;

    match descr.attributes {
        ColorMatrix(ref m) => m.is_identity(),
        ComponentTransfer(ref c) => c.is_identity(),
        Opacity(ref o) => o.is_identity(),
        Offset(ref o) => o.is_identity(),
        GaussianBlur(ref b) => b.is_identity(),
        Merge => descr.num_inputs() == 1,
        _ => false,
    }
}

fn component_transfer_data(c: &ComponentTransfer) -> Result<FilterData, GraphError> {
    let data = FilterData::from(c);
    let len = data.max_values_len();

    if len > COMPONENT_TRANSFER_MAX_TABLE_LENGTH {
        return Err(GraphError::Fallback(format!(
            "transfer table of {len} values is longer than {COMPONENT_TRANSFER_MAX_TABLE_LENGTH}"
        )));
    }

    Ok(data)
}

fn convolve_matrix_op(c: &ConvolveMatrix) -> Result<FilterGraphOp, GraphError> {
    let (order_x, order_y) = c.order;

    if order_x > CONVOLVE_MATRIX_MAX_ORDER || order_y > CONVOLVE_MATRIX_MAX_ORDER {
        return Err(GraphError::Fallback(format!(
            "convolution kernel of {order_x}x{order_y} is larger than \
             {CONVOLVE_MATRIX_MAX_ORDER}x{CONVOLVE_MATRIX_MAX_ORDER}"
        )));
    }

    let mut kernel = [0.0; 25];
    for row in 0..c.kernel_matrix.nrows() {
        for col in 0..c.kernel_matrix.ncols() {
            kernel[row * order_x as usize + col] = c.kernel_matrix[(row, col)] as f32;
        }
    }

    let params = GraphConvolveMatrix {
        order_x,
        order_y,
        kernel,
        divisor: c.divisor as f32,
        bias: c.bias as f32,
        target_x: c.target.0,
        target_y: c.target.1,
        kernel_unit_length: (
            c.kernel_unit_length.0 as f32,
            c.kernel_unit_length.1 as f32,
        ),
        preserve_alpha: c.preserve_alpha,
    };

    Ok(match c.edge_mode {
        EdgeMode::Duplicate => FilterGraphOp::SVGFEConvolveMatrixEdgeModeDuplicate(params),
        EdgeMode::Wrap => FilterGraphOp::SVGFEConvolveMatrixEdgeModeWrap(params),
        EdgeMode::None => FilterGraphOp::SVGFEConvolveMatrixEdgeModeNone(params),
    })
}

fn kernel_unit_length(lighting: &Lighting) -> (f32, f32) {
    let (x, y) = lighting.kernel_unit_length.unwrap_or((1.0, 1.0));
    (x as f32, y as f32)
}

fn graph_light(light: &LightSource) -> GraphLight {
    match *light {
        LightSource::Distant { azimuth, elevation } => GraphLight::Distant {
            azimuth: azimuth as f32,
            elevation: elevation as f32,
        },

        LightSource::Point { ref origin } => GraphLight::Point {
            x: origin.x as f32,
            y: origin.y as f32,
            z: origin.z as f32,
        },

        LightSource::Spot {
            ref origin,
            ref direction,
            specular_exponent,
            limiting_cone_angle,
        } => {
            let points_at = origin + direction;

            GraphLight::Spot {
                x: origin.x as f32,
                y: origin.y as f32,
                z: origin.z as f32,
                points_at_x: points_at.x as f32,
                points_at_y: points_at.y as f32,
                points_at_z: points_at.z as f32,
                cone_exponent: specular_exponent as f32,
                limiting_cone_angle: limiting_cone_angle.map(|a| a as f32),
            }
        }
    }
}

fn channel_index(channel: ColorChannel) -> u32 {
    match channel {
        ColorChannel::R => 0,
        ColorChannel::G => 1,
        ColorChannel::B => 2,
        ColorChannel::A => 3,
    }
}

fn turbulence_op(t: &Turbulence) -> FilterGraphOp {
    let params = GraphTurbulence {
        base_frequency_x: t.base_frequency.0 as f32,
        base_frequency_y: t.base_frequency.1 as f32,
        num_octaves: t.num_octaves.max(0) as u32,
        seed: t.seed,
    };

    match (t.type_, t.stitch_tiles) {
        (NoiseType::FractalNoise, StitchTiles::NoStitch) => {
            FilterGraphOp::SVGFETurbulenceWithFractalNoiseWithNoStitching(params)
        }
        (NoiseType::FractalNoise, StitchTiles::Stitch) => {
            FilterGraphOp::SVGFETurbulenceWithFractalNoiseWithStitching(params)
        }
        (NoiseType::Turbulence, StitchTiles::NoStitch) => {
            FilterGraphOp::SVGFETurbulenceWithTurbulenceNoiseWithNoStitching(params)
        }
        (NoiseType::Turbulence, StitchTiles::Stitch) => {
            FilterGraphOp::SVGFETurbulenceWithTurbulenceNoiseWithStitching(params)
        }
    }
}
