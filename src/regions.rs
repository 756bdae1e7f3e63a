//! Region computations over a [`FilterDescription`].
//!
//! These answer three questions about a filter graph, all in filter space:
//!
//! * Which pixels of the sources (`SourceGraphic`, `FillPaint`, `StrokePaint`) are needed
//!   to produce a given part of the result.  This walks the graph backwards from the last
//!   node.
//!
//! * Which pixels of the result change when some pixels of the sources change.  This
//!   walks the graph forwards.
//!
//! * The largest area the result can cover, given the area covered by `SourceGraphic`.
//!
//! The per-primitive rules live with each primitive in [`crate::filters`]; this module
//! dispatches on [`PrimitiveAttributes`] and clips everything to the node subregions.

use crate::filters::{FilterDescription, FilterPrimitiveDescription, InputRef, PrimitiveAttributes};
use crate::rect::IRect;
use crate::region::IRegion;

/// Needed or changed regions of the three source images.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SourceRegions {
    pub source_graphic: IRegion,
    pub fill_paint: IRegion,
    pub stroke_paint: IRegion,
}

impl SourceRegions {
    fn for_sentinel_mut(&mut self, input: InputRef) -> Option<&mut IRegion> {
        match input {
            InputRef::SourceGraphic | InputRef::SourceAlpha => Some(&mut self.source_graphic),
            InputRef::FillPaint => Some(&mut self.fill_paint),
            InputRef::StrokePaint => Some(&mut self.stroke_paint),
            InputRef::Primitive(_) => None,
        }
    }

    fn for_sentinel(&self, input: InputRef) -> IRegion {
        match input {
            InputRef::SourceGraphic | InputRef::SourceAlpha => self.source_graphic.clone(),
            InputRef::FillPaint => self.fill_paint.clone(),
            InputRef::StrokePaint => self.stroke_paint.clone(),
            InputRef::Primitive(_) => IRegion::new(),
        }
    }
}

fn union_all(regions: &[IRegion]) -> IRegion {
    regions
        .iter()
        .fold(IRegion::new(), |acc, r| acc.union(r))
}

fn first(regions: &[IRegion]) -> IRegion {
    regions.first().cloned().unwrap_or_default()
}

/// The part of input `input_index` that `descr` reads to produce `region` of its result.
pub fn needed_input_region(
    descr: &FilterPrimitiveDescription,
    input_index: usize,
    region: &IRegion,
) -> IRegion {
    use PrimitiveAttributes::*;

    if region.is_empty() {
        return IRegion::new();
    }

    match descr.attributes {
        Empty | Flood(_) | Image(_) | Turbulence(_) => IRegion::new(),

        Opacity(_) | ColorMatrix(_) | ComponentTransfer(_) | ToAlpha | Blend(_) | Composite(_)
        | Merge => region.clone(),

        ConvolveMatrix(ref c) => c.needed_input_region(region),
        DiffuseLighting(ref l) => l.lighting.needed_input_region(region),
        SpecularLighting(ref l) => l.lighting.needed_input_region(region),
        DisplacementMap(ref d) => d.needed_input_region(input_index, region),
        DropShadow(ref d) => d.needed_input_region(region),
        GaussianBlur(ref b) => b.needed_input_region(region),
        Morphology(ref m) => m.needed_input_region(region),
        Offset(ref o) => o.needed_input_region(region),
        Tile(ref t) => t.needed_input_region(region),
    }
}

/// The part of the result of `descr` that changes when its inputs change in `changes`.
pub fn result_change_region(descr: &FilterPrimitiveDescription, changes: &[IRegion]) -> IRegion {
    use PrimitiveAttributes::*;

    if changes.iter().all(IRegion::is_empty) {
        return IRegion::new();
    }

    let subregion = &descr.subregion;

    match descr.attributes {
        Empty | Flood(_) | Image(_) | Turbulence(_) => IRegion::new(),

        Opacity(_) | ColorMatrix(_) | ComponentTransfer(_) | ToAlpha | Blend(_) | Composite(_)
        | Merge => union_all(changes),

        ConvolveMatrix(ref c) => c.result_change_region(&first(changes), subregion),
        DiffuseLighting(ref l) => l.lighting.result_change_region(&first(changes)),
        SpecularLighting(ref l) => l.lighting.result_change_region(&first(changes)),
        DisplacementMap(ref d) => d.result_change_region(changes),
        DropShadow(ref d) => d.result_change_region(&first(changes)),
        GaussianBlur(ref b) => b.result_change_region(&first(changes)),
        Morphology(ref m) => m.result_change_region(&first(changes)),
        Offset(ref o) => o.result_change_region(&first(changes)),
        Tile(ref t) => t.result_change_region(&first(changes), subregion),
    }
}

/// The largest area that the result of `descr` can cover, given the extents of its inputs.
///
/// This is not clipped to the subregion of `descr`.
pub fn post_filter_extents_for_primitive(
    descr: &FilterPrimitiveDescription,
    input_extents: &[IRegion],
) -> IRegion {
    use PrimitiveAttributes::*;

    let subregion = &descr.subregion;

    match descr.attributes {
        Empty => IRegion::new(),

        Opacity(ref o) => o.post_filter_extents(&first(input_extents)),
        ColorMatrix(ref m) => m.post_filter_extents(&first(input_extents), subregion),
        ComponentTransfer(ref c) => c.post_filter_extents(&first(input_extents), subregion),
        ToAlpha => first(input_extents),
        Blend(_) | Merge => union_all(input_extents),
        Composite(ref c) => c.post_filter_extents(input_extents, subregion),

        ConvolveMatrix(ref c) => c.post_filter_extents(&first(input_extents), subregion),
        DiffuseLighting(ref l) => l.lighting.post_filter_extents(subregion),
        SpecularLighting(ref l) => l.lighting.post_filter_extents(subregion),
        DisplacementMap(ref d) => d.post_filter_extents(input_extents),
        DropShadow(ref d) => d.post_filter_extents(&first(input_extents)),
        GaussianBlur(ref b) => b.post_filter_extents(&first(input_extents)),
        Morphology(ref m) => m.post_filter_extents(&first(input_extents)),
        Offset(ref o) => o.post_filter_extents(&first(input_extents)),
        Tile(ref t) => t.post_filter_extents(&first(input_extents), subregion),

        Flood(ref f) => f.post_filter_extents(subregion),
        Image(_) | Turbulence(_) => IRegion::from_rect(*subregion),
    }
}

/// Computes which parts of the sources are needed to produce `result_needed` of the last
/// node's result.
///
/// The `SourceGraphic` region is clipped to the filter region of the first node; the caller
/// is expected to further clip it to the bounds of the element being filtered.
pub fn compute_source_needed_regions(
    description: &FilterDescription,
    result_needed: &IRegion,
) -> SourceRegions {
    let primitives = &description.primitives;
    let mut sources = SourceRegions::default();

    if primitives.is_empty() {
        return sources;
    }

    let mut needed = vec![IRegion::new(); primitives.len()];
    needed[primitives.len() - 1] = result_needed.clone();

    for (i, descr) in primitives.iter().enumerate().rev() {
        let region = needed[i].intersect_rect(&descr.subregion);

        for (j, &input) in descr.inputs.iter().enumerate() {
            let input_needed = needed_input_region(descr, j, &region);

            match input {
                InputRef::Primitive(k) if k < i => {
                    needed[k] = needed[k].union(&input_needed);
                }

                InputRef::Primitive(_) => (),

                sentinel => {
                    if let Some(r) = sources.for_sentinel_mut(sentinel) {
                        *r = r.union(&input_needed);
                    }
                }
            }
        }
    }

    let first_bounds = primitives[0].filter_space_bounds;
    sources.source_graphic = sources.source_graphic.intersect_rect(&first_bounds);

    sources
}

/// Computes the part of the last node's result that changes when the sources change.
pub fn compute_result_change_region(
    description: &FilterDescription,
    source_changes: &SourceRegions,
) -> IRegion {
    let primitives = &description.primitives;
    let mut changes: Vec<IRegion> = Vec::with_capacity(primitives.len());

    for (i, descr) in primitives.iter().enumerate() {
        let input_changes: Vec<IRegion> = descr
            .inputs
            .iter()
            .map(|&input| match input {
                InputRef::Primitive(k) if k < i => changes[k].clone(),
                InputRef::Primitive(_) => IRegion::new(),
                sentinel => source_changes.for_sentinel(sentinel),
            })
            .collect();

        let change = result_change_region(descr, &input_changes).intersect_rect(&descr.subregion);
        changes.push(change);
    }

    changes.pop().unwrap_or_default()
}

/// Computes the area that the last node's result can cover when `SourceGraphic` covers
/// `source_graphic_extents`.
pub fn compute_post_filter_extents(
    description: &FilterDescription,
    source_graphic_extents: &IRegion,
) -> IRegion {
    let primitives = &description.primitives;

    let first_bounds = match primitives.first() {
        Some(descr) => descr.filter_space_bounds,
        None => return IRegion::new(),
    };

    let source_graphic_extents = source_graphic_extents.intersect_rect(&first_bounds);
    let mut extents: Vec<IRegion> = Vec::with_capacity(primitives.len());

    for (i, descr) in primitives.iter().enumerate() {
        let input_extents: Vec<IRegion> = descr
            .inputs
            .iter()
            .map(|&input| match input {
                InputRef::Primitive(k) if k < i => extents[k].clone(),
                InputRef::Primitive(_) => IRegion::new(),
                InputRef::SourceGraphic | InputRef::SourceAlpha => source_graphic_extents.clone(),
                InputRef::FillPaint | InputRef::StrokePaint => IRegion::from_rect(first_bounds),
            })
            .collect();

        let extent =
            post_filter_extents_for_primitive(descr, &input_extents).intersect_rect(&descr.subregion);
        extents.push(extent);
    }

    extents.pop().unwrap_or_default()
}

/// Shrinks `rect` so that a surface for it does not exceed `max_size` pixels per side.
///
/// The top-left corner is kept.  Pixels beyond the limit are never rendered.
pub fn clamp_to_surface_size(rect: &IRect, max_size: i32) -> IRect {
    if rect.is_empty() {
        return IRect::default();
    }

    let w = rect.width().min(max_size);
    let h = rect.height().min(max_size);

    IRect::from_xywh(rect.x0, rect.y0, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ColorF;
    use crate::filters::composite::{Composite, Operator};
    use crate::filters::flood::Flood;
    use crate::filters::gaussian_blur::GaussianBlur;
    use crate::filters::offset::Offset;
    use crate::filters::tile::Tile;
    use crate::filters::ColorSpace;

    const BOUNDS: IRect = IRect {
        x0: -50,
        y0: -50,
        x1: 150,
        y1: 150,
    };

    fn node(attributes: PrimitiveAttributes, inputs: &[InputRef]) -> FilterPrimitiveDescription {
        let mut descr = FilterPrimitiveDescription::new(attributes);
        descr.subregion = BOUNDS;
        descr.filter_space_bounds = BOUNDS;
        for &input in inputs {
            descr.add_input(input, ColorSpace::SRgb);
        }
        descr
    }

    fn description(primitives: Vec<FilterPrimitiveDescription>) -> FilterDescription {
        FilterDescription {
            primitives,
            filter_region: BOUNDS.into(),
        }
    }

    fn blur(s: f64) -> PrimitiveAttributes {
        PrimitiveAttributes::GaussianBlur(GaussianBlur {
            std_deviation: (s, s),
        })
    }

    fn region(x0: i32, y0: i32, x1: i32, y1: i32) -> IRegion {
        IRegion::from_rect(IRect::new(x0, y0, x1, y1))
    }

    #[test]
    fn empty_description_needs_nothing() {
        let d = FilterDescription::default();
        let r = region(0, 0, 10, 10);

        assert_eq!(compute_source_needed_regions(&d, &r), SourceRegions::default());
        assert!(compute_result_change_region(&d, &SourceRegions::default()).is_empty());
        assert!(compute_post_filter_extents(&d, &r).is_empty());
    }

    #[test]
    fn blur_then_offset() {
        let d = description(vec![
            node(blur(1.0), &[InputRef::SourceGraphic]),
            node(
                PrimitiveAttributes::Offset(Offset { dx: 10.0, dy: 0.0 }),
                &[InputRef::Primitive(0)],
            ),
        ]);

        let needed = compute_source_needed_regions(&d, &region(0, 0, 10, 10));
        assert_eq!(needed.source_graphic.bounds(), IRect::new(-13, -3, 3, 13));
        assert!(needed.fill_paint.is_empty());

        let changes = SourceRegions {
            source_graphic: region(0, 0, 10, 10),
            ..Default::default()
        };
        assert_eq!(
            compute_result_change_region(&d, &changes).bounds(),
            IRect::new(7, -3, 23, 13)
        );

        assert_eq!(
            compute_post_filter_extents(&d, &region(0, 0, 10, 10)).bounds(),
            IRect::new(7, -3, 23, 13)
        );
    }

    #[test]
    fn regions_are_clipped_to_subregions() {
        let mut first = node(blur(10.0), &[InputRef::SourceGraphic]);
        first.subregion = IRect::new(0, 0, 20, 20);

        let d = description(vec![first]);

        let changes = SourceRegions {
            source_graphic: region(0, 0, 10, 10),
            ..Default::default()
        };
        assert_eq!(
            compute_result_change_region(&d, &changes).bounds(),
            IRect::new(0, 0, 20, 20)
        );

        // the needed region is still inflated, but limited to the first filter region
        let needed = compute_source_needed_regions(&d, &region(0, 0, 10, 10));
        assert_eq!(needed.source_graphic.bounds(), IRect::new(-30, -30, 40, 40));
    }

    #[test]
    fn sentinels_accumulate() {
        let d = description(vec![
            node(
                PrimitiveAttributes::Composite(Composite::default()),
                &[InputRef::SourceAlpha, InputRef::FillPaint],
            ),
            node(
                PrimitiveAttributes::Composite(Composite::default()),
                &[InputRef::Primitive(0), InputRef::StrokePaint],
            ),
        ]);

        let needed = compute_source_needed_regions(&d, &region(0, 0, 10, 10));
        assert_eq!(needed.source_graphic, region(0, 0, 10, 10));
        assert_eq!(needed.fill_paint, region(0, 0, 10, 10));
        assert_eq!(needed.stroke_paint, region(0, 0, 10, 10));

        // fill and stroke paint cover the whole filter region
        assert_eq!(
            compute_post_filter_extents(&d, &region(0, 0, 10, 10)).bounds(),
            BOUNDS
        );
    }

    #[test]
    fn generators_ignore_source_changes() {
        let flood = PrimitiveAttributes::Flood(Flood {
            color: ColorF::new(1.0, 0.0, 0.0, 1.0),
        });
        let d = description(vec![node(flood, &[])]);

        let changes = SourceRegions {
            source_graphic: region(0, 0, 10, 10),
            ..Default::default()
        };
        assert!(compute_result_change_region(&d, &changes).is_empty());
        assert_eq!(compute_post_filter_extents(&d, &IRegion::new()).bounds(), BOUNDS);
    }

    #[test]
    fn tile_needs_its_whole_input() {
        let mut tile = node(
            PrimitiveAttributes::Tile(Tile {
                source_rect: IRect::new(0, 0, 10, 10),
            }),
            &[InputRef::Primitive(0)],
        );
        tile.subregion = BOUNDS;

        let mut source = node(
            PrimitiveAttributes::Offset(Offset::default()),
            &[InputRef::SourceGraphic],
        );
        source.subregion = IRect::new(0, 0, 10, 10);

        let d = description(vec![source, tile]);

        let needed = compute_source_needed_regions(&d, &region(100, 100, 101, 101));
        assert_eq!(needed.source_graphic.bounds(), IRect::new(0, 0, 10, 10));
    }

    #[test]
    fn clamps_surface_size() {
        assert_eq!(
            clamp_to_surface_size(&IRect::new(-10, 5, 30000, 20), 16384),
            IRect::new(-10, 5, 16374, 20)
        );
        assert_eq!(
            clamp_to_surface_size(&IRect::new(0, 0, 10, 10), 16384),
            IRect::new(0, 0, 10, 10)
        );
        assert!(clamp_to_surface_size(&IRect::new(0, 0, 0, 10), 16384).is_empty());
    }

    #[test]
    fn composite_in_intersects() {
        let c = PrimitiveAttributes::Composite(Composite {
            operator: Operator::In,
            ..Default::default()
        });
        let d = description(vec![node(c, &[InputRef::SourceGraphic, InputRef::FillPaint])]);

        assert_eq!(
            compute_post_filter_extents(&d, &region(0, 0, 10, 10)),
            region(0, 0, 10, 10)
        );
    }
}
