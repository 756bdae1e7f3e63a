//! The CHAIN fast path: a linear sequence of simple WebRender filter ops.
//!
//! This only works when the description is a straight line where each node reads the
//! previous one, and when every node maps to one of the chain ops.  Unlike the SVGFE graph,
//! chain ops have no per-node subregion, so subregion clips are collected into a single
//! clip for the final result.  That is only correct as long as no op that samples
//! neighboring pixels comes after a clip.

use float_cmp::approx_eq;

use crate::config::WebRenderConfig;
use crate::filters::{ColorSpace, FilterDescription, InputRef, PrimitiveAttributes};
use crate::rect::{IRect, Rect};
use crate::region::IRegion;
use crate::regions::post_filter_extents_for_primitive;
use crate::session::Session;
use crate::transform::Transform;

use super::{
    FilterData, FilterOp, Shadow, WrFiltersHolder, WrFiltersStatus,
    COMPONENT_TRANSFER_MAX_TABLE_LENGTH,
};

/// Translates `description` into chain ops and appends them to `holder`.
///
/// `target_bounds` is the filter-space area covered by `SourceGraphic`.  On any status
/// other than [`WrFiltersStatus::Chain`] the holder is left untouched.
pub fn build_chain(
    description: &FilterDescription,
    target_bounds: &IRect,
    filter_to_frame: &Transform,
    config: &WebRenderConfig,
    holder: &mut WrFiltersHolder,
    session: &Session,
) -> WrFiltersStatus {
    if description.primitives.len() > config.max_filter_ops_per_chain {
        fegraph_log!(
            session,
            "filter chain has more than {} primitives",
            config.max_filter_ops_per_chain
        );
        return WrFiltersStatus::DisabledForPerformance;
    }

    let mut ops = Vec::new();
    let mut filter_datas = Vec::new();
    let mut space = ColorSpace::SRgb;
    let mut extents = IRegion::from_rect(*target_bounds);
    let mut final_clip: Option<IRect> = None;

    for (i, descr) in description.primitives.iter().enumerate() {
        let expected = match i {
            0 => InputRef::SourceGraphic,
            _ => InputRef::Primitive(i - 1),
        };

        if descr.num_inputs() != 1 || descr.input(0) != Some(expected) {
            fegraph_log!(session, "node {} does not read the previous node", i);
            return WrFiltersStatus::BlobFallback;
        }

        let previous_space = space;
        let wanted = descr.input_color_space(0);
        let converted = wanted != space;

        if converted {
            ops.push(conversion_op(wanted));
            space = wanted;
        }

        let op = match descr.attributes {
            PrimitiveAttributes::ColorMatrix(ref m) if !m.is_identity() => {
                Some(FilterOp::ColorMatrix(m.to_row_major()))
            }

            PrimitiveAttributes::ComponentTransfer(ref c) if !c.is_identity() => {
                let data = FilterData::from(c);
                if data.max_values_len() > COMPONENT_TRANSFER_MAX_TABLE_LENGTH {
                    fegraph_log!(session, "component transfer table is too long for a chain");
                    return WrFiltersStatus::BlobFallback;
                }

                filter_datas.push(data);
                Some(FilterOp::ComponentTransfer)
            }

            PrimitiveAttributes::Opacity(ref o) if !o.is_identity() => {
                Some(FilterOp::Opacity(o.opacity))
            }

            PrimitiveAttributes::GaussianBlur(ref b) if !b.is_identity() => {
                let (sx, sy) = frame_distance(filter_to_frame, b.std_deviation);
                Some(FilterOp::Blur(sx as f32, sy as f32))
            }

            PrimitiveAttributes::DropShadow(ref d) => {
                let (sx, sy) = frame_distance(filter_to_frame, d.std_deviation);

                if !approx_eq!(f64, sx, sy, epsilon = 0.0001) {
                    fegraph_log!(session, "drop shadow with different deviations per axis");
                    return WrFiltersStatus::BlobFallback;
                }

                let (dx, dy) = filter_to_frame.transform_distance(d.offset.0, d.offset.1);

                Some(FilterOp::DropShadow(Shadow {
                    offset: (dx as f32, dy as f32),
                    color: d.color,
                    blur_radius: sx as f32,
                }))
            }

            PrimitiveAttributes::ColorMatrix(_)
            | PrimitiveAttributes::ComponentTransfer(_)
            | PrimitiveAttributes::Opacity(_)
            | PrimitiveAttributes::GaussianBlur(_) => None,

            ref other => {
                fegraph_log!(session, "{} has no chain op", other.name());
                return WrFiltersStatus::BlobFallback;
            }
        };

        match op {
            Some(op) => {
                if samples_neighbors(&descr.attributes) && final_clip.is_some() {
                    fegraph_log!(session, "node {} samples pixels outside an earlier clip", i);
                    return WrFiltersStatus::BlobFallback;
                }

                ops.push(op);
                space = descr.output_color_space;
            }

            None => {
                if converted {
                    ops.pop();
                    space = previous_space;
                }
            }
        }

        extents = post_filter_extents_for_primitive(descr, &[extents]);

        let subregion = descr.subregion;
        if !IRegion::from_rect(subregion).contains_region(&extents) {
            final_clip = Some(match final_clip {
                Some(clip) => clip.intersect(&subregion),
                None => subregion,
            });
            extents = extents.intersect_rect(&subregion);
        }
    }

    if space == ColorSpace::LinearRgb {
        ops.push(FilterOp::LinearToSrgb);
    }

    if ops.len() > config.max_filter_ops_per_chain {
        fegraph_log!(session, "filter chain has {} ops", ops.len());
        return WrFiltersStatus::DisabledForPerformance;
    }

    if let Some(last) = description.last() {
        let mut clip = Rect::from(last.subregion).intersect(&description.filter_region);
        if let Some(c) = final_clip {
            clip = clip.intersect(&Rect::from(c));
        }

        holder.post_filters_clip = Some(filter_to_frame.transform_rect(&clip));
    }

    holder.filters.extend(ops);
    holder.filter_datas.extend(filter_datas);

    WrFiltersStatus::Chain
}

fn conversion_op(to: ColorSpace) -> FilterOp {
    match to {
        ColorSpace::LinearRgb => FilterOp::SrgbToLinear,
        ColorSpace::SRgb => FilterOp::LinearToSrgb,
    }
}

/// Whether the op reads pixels around each output pixel.
fn samples_neighbors(attributes: &PrimitiveAttributes) -> bool {
    matches!(
        attributes,
        PrimitiveAttributes::GaussianBlur(_) | PrimitiveAttributes::DropShadow(_)
    )
}

fn frame_distance(filter_to_frame: &Transform, (x, y): (f64, f64)) -> (f64, f64) {
    let (fx, fy) = filter_to_frame.transform_distance(x, y);
    (fx.abs(), fy.abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorF;
    use crate::filters::color_matrix::ColorMatrix;
    use crate::filters::component_transfer::{ComponentTransfer, TransferFunction};
    use crate::filters::drop_shadow::DropShadow;
    use crate::filters::gaussian_blur::GaussianBlur;
    use crate::filters::opacity::Opacity;
    use crate::filters::FilterPrimitiveDescription;
    use matches::assert_matches;

    const BOUNDS: IRect = IRect {
        x0: 0,
        y0: 0,
        x1: 100,
        y1: 100,
    };

    fn node(
        index: usize,
        attributes: PrimitiveAttributes,
        space: ColorSpace,
        subregion: IRect,
    ) -> FilterPrimitiveDescription {
        let input = match index {
            0 => InputRef::SourceGraphic,
            _ => InputRef::Primitive(index - 1),
        };

        let mut d = FilterPrimitiveDescription::new(attributes);
        d.subregion = subregion;
        d.filter_space_bounds = subregion;
        d.output_color_space = space;
        d.add_input(input, space);
        d
    }

    fn description(primitives: Vec<FilterPrimitiveDescription>) -> FilterDescription {
        FilterDescription {
            primitives,
            filter_region: Rect::from(IRect::max_rect()),
        }
    }

    fn build_with(
        description: &FilterDescription,
        filter_to_frame: &Transform,
        config: &WebRenderConfig,
    ) -> (WrFiltersStatus, WrFiltersHolder) {
        let mut holder = WrFiltersHolder::new();
        let status = build_chain(
            description,
            &BOUNDS,
            filter_to_frame,
            config,
            &mut holder,
            &Session::new_with_logging(false),
        );
        (status, holder)
    }

    fn build(description: &FilterDescription) -> (WrFiltersStatus, WrFiltersHolder) {
        build_with(description, &Transform::identity(), &WebRenderConfig::default())
    }

    fn blur(s: f64) -> PrimitiveAttributes {
        PrimitiveAttributes::GaussianBlur(GaussianBlur {
            std_deviation: (s, s),
        })
    }

    fn saturate(s: f64) -> PrimitiveAttributes {
        PrimitiveAttributes::ColorMatrix(ColorMatrix {
            matrix: ColorMatrix::saturate_matrix(s),
        })
    }

    fn opacity(o: f32) -> PrimitiveAttributes {
        PrimitiveAttributes::Opacity(Opacity { opacity: o })
    }

    #[test]
    fn blur_is_scaled_to_frame_space() {
        let big = BOUNDS.inflate(20, 20);
        let d = description(vec![node(0, blur(4.0), ColorSpace::SRgb, big)]);

        let (status, holder) =
            build_with(&d, &Transform::new_scale(0.5, 0.5), &WebRenderConfig::default());

        assert_eq!(status, WrFiltersStatus::Chain);
        assert_eq!(holder.filters, vec![FilterOp::Blur(2.0, 2.0)]);
        assert_eq!(
            holder.post_filters_clip,
            Some(Rect::new(-10.0, -10.0, 60.0, 60.0))
        );
    }

    #[test]
    fn linear_nodes_are_wrapped_once() {
        use ColorSpace::*;

        let d = description(vec![
            node(0, saturate(0.5), SRgb, BOUNDS),
            node(1, saturate(0.2), LinearRgb, BOUNDS),
            node(2, opacity(0.5), LinearRgb, BOUNDS),
            node(3, saturate(0.3), SRgb, BOUNDS),
        ]);

        let (status, holder) = build(&d);
        assert_eq!(status, WrFiltersStatus::Chain);

        let ops = &holder.filters;
        assert_eq!(ops.len(), 6);
        assert_matches!(ops[0], FilterOp::ColorMatrix(_));
        assert_eq!(ops[1], FilterOp::SrgbToLinear);
        assert_matches!(ops[2], FilterOp::ColorMatrix(_));
        assert_eq!(ops[3], FilterOp::Opacity(0.5));
        assert_eq!(ops[4], FilterOp::LinearToSrgb);
        assert_matches!(ops[5], FilterOp::ColorMatrix(_));
    }

    #[test]
    fn noop_cancels_its_conversion() {
        use ColorSpace::*;

        let d = description(vec![
            node(0, opacity(0.5), SRgb, BOUNDS),
            node(1, opacity(1.0), LinearRgb, BOUNDS),
        ]);

        let (status, holder) = build(&d);
        assert_eq!(status, WrFiltersStatus::Chain);
        assert_eq!(holder.filters, vec![FilterOp::Opacity(0.5)]);
    }

    #[test]
    fn component_transfer_carries_its_data() {
        let ct = ComponentTransfer::rgb(TransferFunction::linear(2.0, 0.0));
        let d = description(vec![node(
            0,
            PrimitiveAttributes::ComponentTransfer(ct),
            ColorSpace::SRgb,
            BOUNDS,
        )]);

        let (status, holder) = build(&d);
        assert_eq!(status, WrFiltersStatus::Chain);
        assert_eq!(holder.filters, vec![FilterOp::ComponentTransfer]);
        assert_eq!(holder.filter_datas.len(), 1);
    }

    #[test]
    fn long_transfer_table_falls_back() {
        let values = vec![0.5; COMPONENT_TRANSFER_MAX_TABLE_LENGTH + 1];
        let ct = ComponentTransfer::rgb(TransferFunction::table(values));
        let d = description(vec![node(
            0,
            PrimitiveAttributes::ComponentTransfer(ct),
            ColorSpace::SRgb,
            BOUNDS,
        )]);

        let (status, holder) = build(&d);
        assert_eq!(status, WrFiltersStatus::BlobFallback);
        assert!(holder.is_empty());
        assert!(holder.filter_datas.is_empty());
    }

    #[test]
    fn non_linear_input_falls_back() {
        let mut second = node(1, opacity(0.5), ColorSpace::SRgb, BOUNDS);
        second.inputs[0] = InputRef::SourceGraphic;

        let d = description(vec![node(0, opacity(0.5), ColorSpace::SRgb, BOUNDS), second]);

        let (status, holder) = build(&d);
        assert_eq!(status, WrFiltersStatus::BlobFallback);
        assert!(holder.is_empty());
    }

    #[test]
    fn unsupported_kind_falls_back() {
        let d = description(vec![node(
            0,
            PrimitiveAttributes::ToAlpha,
            ColorSpace::SRgb,
            BOUNDS,
        )]);

        let (status, holder) = build(&d);
        assert_eq!(status, WrFiltersStatus::BlobFallback);
        assert!(holder.is_empty());
    }

    #[test]
    fn anisotropic_drop_shadow_falls_back() {
        let shadow = PrimitiveAttributes::DropShadow(DropShadow {
            std_deviation: (1.0, 2.0),
            offset: (3.0, 3.0),
            color: ColorF::new(0.0, 0.0, 0.0, 1.0),
        });
        let d = description(vec![node(0, shadow, ColorSpace::SRgb, BOUNDS.inflate(20, 20))]);

        let (status, _) = build(&d);
        assert_eq!(status, WrFiltersStatus::BlobFallback);
    }

    #[test]
    fn clipped_blur_at_the_end_is_fine() {
        let d = description(vec![
            node(0, opacity(0.5), ColorSpace::SRgb, BOUNDS),
            node(1, blur(2.0), ColorSpace::SRgb, BOUNDS),
            node(2, saturate(0.5), ColorSpace::SRgb, BOUNDS),
        ]);

        let (status, holder) = build(&d);
        assert_eq!(status, WrFiltersStatus::Chain);
        assert_eq!(holder.filters.len(), 3);
        assert_eq!(holder.post_filters_clip, Some(Rect::from(BOUNDS)));
    }

    #[test]
    fn blur_after_clip_falls_back() {
        let d = description(vec![
            node(0, blur(2.0), ColorSpace::SRgb, BOUNDS),
            node(1, blur(2.0), ColorSpace::SRgb, BOUNDS),
        ]);

        let (status, holder) = build(&d);
        assert_eq!(status, WrFiltersStatus::BlobFallback);
        assert!(holder.is_empty());
    }

    #[test]
    fn too_many_ops_is_disabled() {
        let d = description(vec![
            node(0, opacity(0.5), ColorSpace::SRgb, BOUNDS),
            node(1, opacity(0.5), ColorSpace::SRgb, BOUNDS),
            node(2, opacity(0.5), ColorSpace::SRgb, BOUNDS),
        ]);

        let config = WebRenderConfig {
            max_filter_ops_per_chain: 2,
            ..WebRenderConfig::default()
        };

        let (status, holder) = build_with(&d, &Transform::identity(), &config);
        assert_eq!(status, WrFiltersStatus::DisabledForPerformance);
        assert!(holder.is_empty());
    }
}
