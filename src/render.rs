//! Rendering a filter description through a drawing backend.
//!
//! The crate does not touch pixels itself.  Instead, [`FilterInstance::render`] prepares
//! the source images through a [`DrawTarget`], composes a [`FilterNodeGraph`] out of the
//! description, and hands the graph to the draw target, which runs the actual kernels.
//!
//! [`FilterInstance::render`]: crate::instance::FilterInstance::render

use std::collections::HashMap;
use std::error;
use std::fmt;

use crate::color::ColorF;
use crate::filters::{ColorSpace, FilterDescription, InputRef, PrimitiveAttributes};
use crate::rect::{IRect, Rect};
use crate::transform::Transform;

/// Outcome of painting, propagated from the paint callback.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum DrawResult {
    #[default]
    Success,

    /// Something was drawn, but not all of it; for example an image was not loaded yet.
    Incomplete,
}

/// An offscreen surface could not be created.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SurfaceAllocationError {
    pub width: i32,
    pub height: i32,
}

impl error::Error for SurfaceAllocationError {}

impl fmt::Display for SurfaceAllocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "could not allocate a {}x{} surface",
            self.width, self.height
        )
    }
}

/// A drawing backend.
pub trait DrawTarget: Sized {
    /// A finished image, usable as a filter input.
    type Surface: Clone;

    /// Creates a transparent target of the given size, or `None` if that is not possible.
    fn create_offscreen(&self, width: i32, height: i32) -> Option<Self>;

    fn set_transform(&mut self, transform: &Transform);

    /// Fills a rectangle in the coordinates of the current transform.
    fn fill_rect(&mut self, rect: &Rect, color: ColorF);

    fn into_surface(self) -> Self::Surface;

    /// Runs `graph` and draws its output with `opacity`.
    ///
    /// `source_rect` is the filter-space area of the output to draw; the current transform
    /// maps filter space to the target.
    fn draw_filter(
        &mut self,
        graph: &FilterNodeGraph<Self::Surface>,
        source_rect: &Rect,
        opacity: f64,
    );
}

/// Paints the unfiltered content of the filtered element.
pub trait PaintCallback<D> {
    /// `transform` maps user space to `target`; `dirty_rect` is the user-space area that
    /// needs to be painted.
    fn paint(&mut self, target: &mut D, transform: &Transform, dirty_rect: &Rect) -> DrawResult;
}

impl<D, F> PaintCallback<D> for F
where
    F: FnMut(&mut D, &Transform, &Rect) -> DrawResult,
{
    fn paint(&mut self, target: &mut D, transform: &Transform, dirty_rect: &Rect) -> DrawResult {
        self(target, transform, dirty_rect)
    }
}

/// A rendered source image and the filter-space area it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSurface<S> {
    pub surface: S,
    pub rect: IRect,
}

/// The source images available to a filter; missing ones are transparent.
#[derive(Debug, Clone, PartialEq)]
pub struct Sources<S> {
    pub source_graphic: Option<SourceSurface<S>>,
    pub fill_paint: Option<SourceSurface<S>>,
    pub stroke_paint: Option<SourceSurface<S>>,
}

impl<S> Default for Sources<S> {
    fn default() -> Self {
        Sources {
            source_graphic: None,
            fill_paint: None,
            stroke_paint: None,
        }
    }
}

/// What a node of a [`FilterNodeGraph`] does.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOp {
    Primitive(PrimitiveAttributes),
    Convert { from: ColorSpace, to: ColorSpace },

    /// Makes everything outside the rectangle transparent.
    Crop(IRect),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeInput<S> {
    Source(SourceSurface<S>),

    /// The output of an earlier node.
    Node(usize),

    Transparent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterNode<S> {
    pub op: NodeOp,
    pub inputs: Vec<NodeInput<S>>,
}

/// Filter nodes in evaluation order; each node only reads nodes that come before it.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterNodeGraph<S> {
    nodes: Vec<FilterNode<S>>,
    output: Option<usize>,
}

impl<S> FilterNodeGraph<S> {
    pub fn nodes(&self) -> &[FilterNode<S>] {
        &self.nodes
    }

    /// The node with the final result, in sRGB.
    pub fn output(&self) -> Option<usize> {
        self.output
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, op: NodeOp, inputs: Vec<NodeInput<S>>) -> usize {
        self.nodes.push(FilterNode { op, inputs });
        self.nodes.len() - 1
    }
}

/// Composes the nodes for `description` on top of `sources`.
///
/// Each primitive becomes a node followed by a crop to its subregion.  Color space
/// conversions are inserted where a node reads an input in a different space than the
/// one it was produced in, and are shared between readers.
pub fn build_filter_node_graph<S: Clone>(
    description: &FilterDescription,
    sources: &Sources<S>,
) -> FilterNodeGraph<S> {
    let mut graph = FilterNodeGraph {
        nodes: Vec::new(),
        output: None,
    };

    // Output node and color space of each primitive.
    let mut results: Vec<(usize, ColorSpace)> = Vec::with_capacity(description.primitives.len());
    let mut source_alpha = None;
    let mut conversions: HashMap<(InputRef, ColorSpace), usize> = HashMap::new();

    let source_input = |source: &Option<SourceSurface<S>>| match source {
        Some(s) => NodeInput::Source(s.clone()),
        None => NodeInput::Transparent,
    };

    for descr in &description.primitives {
        let mut inputs = Vec::with_capacity(descr.num_inputs());

        for (j, &input) in descr.inputs.iter().enumerate() {
            let (node_input, space) = match input {
                InputRef::Primitive(k) => match results.get(k) {
                    Some(&(node, space)) => (NodeInput::Node(node), space),
                    None => (NodeInput::Transparent, ColorSpace::SRgb),
                },

                InputRef::SourceGraphic => {
                    (source_input(&sources.source_graphic), ColorSpace::SRgb)
                }

                InputRef::SourceAlpha => {
                    let node = *source_alpha.get_or_insert_with(|| {
                        graph.push(
                            NodeOp::Primitive(PrimitiveAttributes::ToAlpha),
                            vec![source_input(&sources.source_graphic)],
                        )
                    });
                    (NodeInput::Node(node), ColorSpace::SRgb)
                }

                InputRef::FillPaint => (source_input(&sources.fill_paint), ColorSpace::SRgb),
                InputRef::StrokePaint => (source_input(&sources.stroke_paint), ColorSpace::SRgb),
            };

            let wanted = descr.input_color_space(j);

            let node_input = if space == wanted || matches!(node_input, NodeInput::Transparent) {
                node_input
            } else {
                let node = *conversions.entry((input, wanted)).or_insert_with(|| {
                    graph.push(
                        NodeOp::Convert {
                            from: space,
                            to: wanted,
                        },
                        vec![node_input],
                    )
                });
                NodeInput::Node(node)
            };

            inputs.push(node_input);
        }

        let primitive = graph.push(NodeOp::Primitive(descr.attributes.clone()), inputs);
        let cropped = graph.push(NodeOp::Crop(descr.subregion), vec![NodeInput::Node(primitive)]);
        results.push((cropped, descr.output_color_space));
    }

    graph.output = results.last().map(|&(node, space)| {
        if space == ColorSpace::SRgb {
            node
        } else {
            graph.push(
                NodeOp::Convert {
                    from: space,
                    to: ColorSpace::SRgb,
                },
                vec![NodeInput::Node(node)],
            )
        }
    });

    graph
}

/// Paints the source graphic into a new offscreen target covering `rect` in filter space.
///
/// `user_to_filter` maps user space to filter space.
pub(crate) fn paint_source_graphic<D: DrawTarget>(
    target: &D,
    paint: &mut dyn PaintCallback<D>,
    rect: &IRect,
    user_to_filter: &Transform,
    filter_to_user: &Transform,
) -> Result<(SourceSurface<D::Surface>, DrawResult), SurfaceAllocationError> {
    let mut offscreen = allocate(target, rect)?;

    let transform = user_to_filter.post_translate(-f64::from(rect.x0), -f64::from(rect.y0));
    offscreen.set_transform(&transform);

    let dirty = filter_to_user.transform_rect(&Rect::from(*rect));
    let result = paint.paint(&mut offscreen, &transform, &dirty);

    let surface = SourceSurface {
        surface: offscreen.into_surface(),
        rect: *rect,
    };

    Ok((surface, result))
}

/// Fills a new offscreen target covering `rect` in filter space with a solid paint.
pub(crate) fn fill_source<D: DrawTarget>(
    target: &D,
    rect: &IRect,
    color: ColorF,
) -> Result<SourceSurface<D::Surface>, SurfaceAllocationError> {
    let mut offscreen = allocate(target, rect)?;

    offscreen.set_transform(&Transform::identity());
    let (width, height) = rect.size();
    offscreen.fill_rect(
        &Rect::from_size(f64::from(width), f64::from(height)),
        color,
    );

    Ok(SourceSurface {
        surface: offscreen.into_surface(),
        rect: *rect,
    })
}

fn allocate<D: DrawTarget>(target: &D, rect: &IRect) -> Result<D, SurfaceAllocationError> {
    let (width, height) = rect.size();

    target
        .create_offscreen(width, height)
        .ok_or(SurfaceAllocationError { width, height })
}
