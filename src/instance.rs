//! The filter instance: builds the description for a filter chain and answers questions
//! about it.
//!
//! A [`FilterInstance`] is created for a single paint or bounds query.  It resolves the
//! coordinate spaces for the element being filtered, builds one [`FilterDescription`]
//! out of all the entries of the filter chain, and then computes regions, renders, or
//! translates the description into WebRender filters.
//!
//! There are four coordinate spaces involved:
//!
//! * User space, where the element's bounding box and the filter parameters live.
//!
//! * Filter space, which is user space scaled by the scale factors of the paint
//!   transform.  Descriptions and region computations work in filter-space pixels.
//!
//! * Frame space, which is user space translated by the frame's offset.  Callers pass
//!   dirty regions and get results in frame space.
//!
//! * Device space, which the paint transform maps user space to.  It is only used while
//!   rendering.
//!
//! If anything goes wrong while building the instance, it stays uninitialized and every
//! query returns an empty result.

use std::time::Instant;

use crate::color::{ColorF, RGBA};
use crate::config::FilterConfig;
use crate::error::InitError;
use crate::filter::{FilterFrameResolver, FilterValue, FilterValueList, SvgFilter};
use crate::filter_func::CSSFilterInstance;
use crate::filters::context::SVGFilterInstance;
use crate::filters::FilterDescription;
use crate::length::{SimpleUserSpaceMetrics, UserSpaceMetrics};
use crate::rect::{IRect, Rect};
use crate::region::{FRegion, IRegion};
use crate::regions::{
    clamp_to_surface_size, compute_post_filter_extents, compute_result_change_region,
    compute_source_needed_regions, SourceRegions,
};
use crate::render::{
    build_filter_node_graph, fill_source, paint_source_graphic, DrawResult, DrawTarget,
    PaintCallback, Sources, SurfaceAllocationError,
};
use crate::session::Session;
use crate::transform::Transform;
use crate::webrender::chain::build_chain;
use crate::webrender::svgfe::build_svgfe_graph;
use crate::webrender::{WrFiltersHolder, WrFiltersStatus};

/// The element that a filter is applied to.
pub trait FilterTarget {
    /// Bounding box of the element, in user space.
    fn bbox(&self) -> Rect;

    /// Value of the `color` property, for `currentColor`.
    fn current_color(&self) -> RGBA;

    fn metrics(&self) -> &dyn UserSpaceMetrics;

    /// Translation from user space to frame space.
    fn user_space_to_frame_space_offset(&self) -> (f64, f64) {
        (0.0, 0.0)
    }

    /// Area covered by the unfiltered element including its overflow, in frame space.
    fn ink_overflow_rect(&self) -> Option<Rect> {
        None
    }

    /// Solid fill of the element, for the `FillPaint` input.
    fn fill_paint(&self) -> Option<ColorF> {
        None
    }

    /// Solid stroke of the element, for the `StrokePaint` input.
    fn stroke_paint(&self) -> Option<ColorF> {
        None
    }
}

/// A [`FilterTarget`] with fixed values.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleFilterTarget {
    pub bbox: Rect,
    pub current_color: RGBA,
    pub metrics: SimpleUserSpaceMetrics,
    pub offset: (f64, f64),
    pub ink_overflow: Option<Rect>,
    pub fill_paint: Option<ColorF>,
    pub stroke_paint: Option<ColorF>,
}

impl SimpleFilterTarget {
    pub fn new(bbox: Rect) -> SimpleFilterTarget {
        SimpleFilterTarget {
            bbox,
            current_color: RGBA::new(0, 0, 0, 255),
            metrics: SimpleUserSpaceMetrics::default(),
            offset: (0.0, 0.0),
            ink_overflow: None,
            fill_paint: None,
            stroke_paint: None,
        }
    }
}

impl FilterTarget for SimpleFilterTarget {
    fn bbox(&self) -> Rect {
        self.bbox
    }

    fn current_color(&self) -> RGBA {
        self.current_color
    }

    fn metrics(&self) -> &dyn UserSpaceMetrics {
        &self.metrics
    }

    fn user_space_to_frame_space_offset(&self) -> (f64, f64) {
        self.offset
    }

    fn ink_overflow_rect(&self) -> Option<Rect> {
        self.ink_overflow
    }

    fn fill_paint(&self) -> Option<ColorF> {
        self.fill_paint
    }

    fn stroke_paint(&self) -> Option<ColorF> {
        self.stroke_paint
    }
}

/// Collects the parameters for a [`FilterInstance`].
pub struct FilterInstanceBuilder<'a> {
    target: &'a dyn FilterTarget,
    filters: &'a FilterValueList,
    frames: Option<Vec<&'a SvgFilter>>,
    input_is_tainted: bool,
    paint_transform: Transform,
    override_bbox: Option<Rect>,
    pre_filter_bounds: Option<Rect>,
    post_filter_dirty_region: Option<FRegion>,
    pre_filter_dirty_region: Option<FRegion>,
    config: FilterConfig,
    session: Session,
}

impl<'a> FilterInstanceBuilder<'a> {
    /// The `<filter>` elements for the `url()` entries of the chain, in order.
    ///
    /// `None` means that some reference could not be resolved; the instance will not be
    /// initialized then.
    pub fn filter_frames(mut self, frames: Option<Vec<&'a SvgFilter>>) -> Self {
        self.frames = frames;
        self
    }

    /// Resolves the `url()` entries of the chain with `resolver`.
    pub fn resolve_frames(mut self, resolver: &'a dyn FilterFrameResolver) -> Self {
        self.frames = self.filters.resolve_frames(resolver, &self.session);
        self
    }

    /// Whether the element's own content is already tainted, for example by a
    /// cross-origin image.
    pub fn input_is_tainted(mut self, tainted: bool) -> Self {
        self.input_is_tainted = tainted;
        self
    }

    /// Transform from user space to device space.
    pub fn paint_transform(mut self, transform: Transform) -> Self {
        self.paint_transform = transform;
        self
    }

    /// Uses `bbox` instead of the target's bounding box, in user space.
    pub fn override_bbox(mut self, bbox: Option<Rect>) -> Self {
        self.override_bbox = bbox;
        self
    }

    /// Area covered by the unfiltered element, in frame space.  Defaults to the target's
    /// ink overflow rectangle.
    pub fn pre_filter_bounds(mut self, bounds: Option<Rect>) -> Self {
        self.pre_filter_bounds = bounds;
        self
    }

    /// Part of the filtered result that needs to be painted, in frame space.  Defaults to
    /// all of it.
    pub fn post_filter_dirty_region(mut self, region: Option<FRegion>) -> Self {
        self.post_filter_dirty_region = region;
        self
    }

    /// Part of the unfiltered element that changed, in frame space.  Defaults to nothing.
    pub fn pre_filter_dirty_region(mut self, region: Option<FRegion>) -> Self {
        self.pre_filter_dirty_region = region;
        self
    }

    pub fn config(mut self, config: FilterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn session(mut self, session: Session) -> Self {
        self.session = session;
        self
    }

    pub fn build(self) -> FilterInstance<'a> {
        let start = Instant::now();

        let mut instance = FilterInstance {
            target: self.target,
            filters: self.filters,
            init_error: None,
            description: FilterDescription::default(),
            target_bounds: IRect::default(),
            scale: (1.0, 1.0),
            filter_to_frame: Transform::identity(),
            frame_to_filter: Transform::identity(),
            paint_transform: self.paint_transform,
            post_filter_dirty: None,
            pre_filter_dirty: None,
            config: self.config,
            session: self.session.clone(),
        };

        match instance.init(&self) {
            Ok(()) => {
                let elapsed = start.elapsed();
                fegraph_log!(
                    instance.session,
                    "(built {} filter primitives in {} seconds)",
                    instance.description.primitives.len(),
                    elapsed.as_secs_f64()
                );
            }

            Err(e) => {
                fegraph_log!(instance.session, "filter will not be applied: {}", e);
                instance.description = FilterDescription::default();
                instance.init_error = Some(e);
            }
        }

        instance
    }
}

/// A filter chain applied to one element.
pub struct FilterInstance<'a> {
    target: &'a dyn FilterTarget,
    filters: &'a FilterValueList,
    init_error: Option<InitError>,
    description: FilterDescription,

    /// Area covered by `SourceGraphic`, in filter space.
    target_bounds: IRect,

    /// User space to filter space.
    scale: (f64, f64),

    filter_to_frame: Transform,
    frame_to_filter: Transform,
    paint_transform: Transform,

    /// In filter space; `None` means everything.
    post_filter_dirty: Option<IRegion>,

    /// In filter space; `None` means nothing.
    pre_filter_dirty: Option<IRegion>,

    config: FilterConfig,
    session: Session,
}

impl<'a> FilterInstance<'a> {
    pub fn builder(
        target: &'a dyn FilterTarget,
        filters: &'a FilterValueList,
    ) -> FilterInstanceBuilder<'a> {
        FilterInstanceBuilder {
            target,
            filters,
            frames: Some(Vec::new()),
            input_is_tainted: false,
            paint_transform: Transform::identity(),
            override_bbox: None,
            pre_filter_bounds: None,
            post_filter_dirty_region: None,
            pre_filter_dirty_region: None,
            config: FilterConfig::default(),
            session: Session::default(),
        }
    }

    fn init(&mut self, params: &FilterInstanceBuilder<'a>) -> Result<(), InitError> {
        let target = self.target;

        let bbox = params.override_bbox.unwrap_or_else(|| target.bbox());

        let (sx, sy) = params.paint_transform.scale_factors();
        if !(sx > 0.0 && sy > 0.0 && sx.is_finite() && sy.is_finite()) {
            return Err(InitError::SingularTransform);
        }

        let bbox_in_filter_space = bbox
            .scale(sx, sy)
            .to_irect_checked()
            .ok_or(InitError::BBoxOverflow)?;

        let (ox, oy) = target.user_space_to_frame_space_offset();
        let filter_to_frame = Transform::new_scale(1.0 / sx, 1.0 / sy).post_translate(ox, oy);
        let frame_to_filter = filter_to_frame
            .invert()
            .ok_or(InitError::SingularTransform)?;

        let target_bounds = match params.pre_filter_bounds.or_else(|| target.ink_overflow_rect()) {
            Some(r) => {
                let pre_filter = frame_to_filter
                    .transform_rect(&r)
                    .to_irect_checked()
                    .ok_or(InitError::BBoxOverflow)?;
                bbox_in_filter_space.union_nonempty(&pre_filter)
            }
            None => bbox_in_filter_space,
        };

        self.scale = (sx, sy);
        self.filter_to_frame = filter_to_frame;
        self.frame_to_filter = frame_to_filter;
        self.target_bounds = target_bounds;

        self.description = self.build_description(params, bbox)?;

        self.post_filter_dirty = params
            .post_filter_dirty_region
            .as_ref()
            .map(|r| self.frame_region_to_filter_space(r));
        self.pre_filter_dirty = params
            .pre_filter_dirty_region
            .as_ref()
            .map(|r| self.frame_region_to_filter_space(r));

        Ok(())
    }

    /// Builds the nodes for every entry of the chain; one failing entry fails the whole
    /// chain.
    fn build_description(
        &self,
        params: &FilterInstanceBuilder<'a>,
        bbox: Rect,
    ) -> Result<FilterDescription, InitError> {
        let frames = params
            .frames
            .as_ref()
            .ok_or(InitError::MissingFilterFrames)?;

        let num_urls = params.filters.iter().filter(|v| v.is_url()).count();
        if frames.len() != num_urls {
            return Err(InitError::MissingFilterFrames);
        }

        let metrics = self.target.metrics();
        let current_color = self.target.current_color();

        let mut frames = frames.iter();
        let mut primitives = Vec::new();
        let mut tainted = params.input_is_tainted;
        let mut filter_region = Rect::from(self.target_bounds);

        for (index, value) in params.filters.iter().enumerate() {
            match *value {
                FilterValue::Url(_) => {
                    let frame = frames.next().ok_or(InitError::MissingFilterFrames)?;

                    let mut instance = SVGFilterInstance::new(
                        frame,
                        bbox,
                        self.scale,
                        metrics,
                        current_color,
                        &self.session,
                    )
                    .map_err(|e| (index, e))?;

                    instance
                        .build_primitives(&mut primitives, tainted)
                        .map_err(|e| (index, e))?;

                    filter_region = instance.filter_region();
                }

                FilterValue::Function(ref function) => {
                    let instance = CSSFilterInstance::new(
                        function,
                        self.target_bounds,
                        self.scale,
                        metrics,
                        current_color,
                    );

                    instance
                        .build_primitives(&mut primitives, tainted)
                        .map_err(|e| (index, e))?;

                    if let Some(last) = primitives.last() {
                        filter_region = Rect::from(last.subregion);
                    }
                }
            }

            tainted = primitives.last().map_or(tainted, |d| d.is_tainted);
        }

        Ok(FilterDescription {
            primitives,
            filter_region,
        })
    }

    fn frame_region_to_filter_space(&self, region: &FRegion) -> IRegion {
        region.map(|r| {
            self.frame_to_filter
                .transform_rect(r)
                .to_irect_checked()
                .unwrap_or_else(IRect::max_rect)
        })
    }

    fn filter_space_to_frame_space(&self, rect: &IRect) -> Rect {
        if rect.is_empty() {
            return Rect::default();
        }

        self.filter_to_frame.transform_rect(&Rect::from(*rect))
    }

    pub fn is_initialized(&self) -> bool {
        self.init_error.is_none()
    }

    /// Why the instance is not initialized, if it is not.
    pub fn init_error(&self) -> Option<&InitError> {
        self.init_error.as_ref()
    }

    /// The nodes of the whole filter chain; empty if the instance is not initialized.
    pub fn filter_description(&self) -> &FilterDescription {
        &self.description
    }

    /// Area covered by `SourceGraphic`, in filter space.
    pub fn target_bounds(&self) -> IRect {
        self.target_bounds
    }

    pub fn filter_to_frame(&self) -> &Transform {
        &self.filter_to_frame
    }

    /// The area where the result can be drawn, in filter space.
    pub fn output_filter_space_bounds(&self) -> IRect {
        match self.description.last() {
            Some(last) => last
                .subregion
                .intersect(&IRect::from(self.description.filter_region)),
            None => IRect::default(),
        }
    }

    fn needed_sources(&self) -> Option<(IRect, SourceRegions)> {
        if !self.is_initialized() || self.description.is_empty() {
            return None;
        }

        let mut output = self.output_filter_space_bounds();
        if let Some(ref dirty) = self.post_filter_dirty {
            output = output.intersect(&dirty.bounds());
        }

        if output.is_empty() {
            return None;
        }

        let needed = match self.post_filter_dirty {
            Some(ref dirty) => dirty.intersect_rect(&output),
            None => IRegion::from_rect(output),
        };

        Some((
            output,
            compute_source_needed_regions(&self.description, &needed),
        ))
    }

    fn source_graphic_rect(&self, needed: &SourceRegions) -> IRect {
        let bounds = needed.source_graphic.bounds().intersect(&self.target_bounds);
        clamp_to_surface_size(&bounds, self.config.max_surface_size)
    }

    /// The part of the unfiltered element that must be painted to produce the dirty part
    /// of the result, in frame space.
    pub fn compute_source_needed_rect(&self) -> Rect {
        match self.needed_sources() {
            Some((_, needed)) => {
                self.filter_space_to_frame_space(&self.source_graphic_rect(&needed))
            }
            None => Rect::default(),
        }
    }

    /// The part of the result that changes when the pre-filter dirty region changes, in
    /// frame space.
    pub fn compute_post_filter_dirty_region(&self) -> FRegion {
        let pre_filter_dirty = match self.pre_filter_dirty {
            Some(ref r) if !r.is_empty() && self.is_initialized() => r,
            _ => return FRegion::new(),
        };

        let changes = SourceRegions {
            source_graphic: pre_filter_dirty.intersect_rect(&self.target_bounds),
            ..SourceRegions::default()
        };

        compute_result_change_region(&self.description, &changes)
            .map(|r| self.filter_to_frame.transform_rect(&Rect::from(*r)))
    }

    /// The largest area that the filtered element can cover, in frame space.
    pub fn compute_post_filter_extents(&self) -> Rect {
        if !self.is_initialized() {
            return Rect::default();
        }

        if self.description.is_empty() {
            return self.filter_space_to_frame_space(&self.target_bounds);
        }

        let extents = compute_post_filter_extents(
            &self.description,
            &IRegion::from_rect(self.target_bounds),
        )
        .bounds()
        .intersect(&self.output_filter_space_bounds());

        self.filter_space_to_frame_space(&extents)
    }

    /// Paints the filtered element into `target`.
    ///
    /// `paint` is called at most once, to paint the unfiltered element into an offscreen
    /// target.  Its result is returned.  Nothing is drawn if the instance is not
    /// initialized, if the chain produces nothing, or if a surface cannot be allocated.
    pub fn render<D: DrawTarget>(
        &self,
        target: &mut D,
        paint: &mut dyn PaintCallback<D>,
        opacity: f64,
    ) -> DrawResult {
        match self.try_render(target, paint, opacity) {
            Ok(result) => result,
            Err(e) => {
                fegraph_log!(self.session, "not rendering filter: {}", e);
                DrawResult::Success
            }
        }
    }

    fn try_render<D: DrawTarget>(
        &self,
        target: &mut D,
        paint: &mut dyn PaintCallback<D>,
        opacity: f64,
    ) -> Result<DrawResult, SurfaceAllocationError> {
        let (output, needed) = match self.needed_sources() {
            Some(n) => n,
            None => return Ok(DrawResult::Success),
        };

        let (sx, sy) = self.scale;
        let user_to_filter = Transform::new_scale(sx, sy);
        let filter_to_user = Transform::new_scale(1.0 / sx, 1.0 / sy);

        let mut sources = Sources::default();
        let mut result = DrawResult::Success;

        let source_graphic_rect = self.source_graphic_rect(&needed);
        if !source_graphic_rect.is_empty() {
            let (surface, painted) = paint_source_graphic(
                target,
                paint,
                &source_graphic_rect,
                &user_to_filter,
                &filter_to_user,
            )?;

            sources.source_graphic = Some(surface);
            result = painted;
        }

        let max_size = self.config.max_surface_size;

        if let Some(color) = self.target.fill_paint() {
            let rect = clamp_to_surface_size(&needed.fill_paint.bounds(), max_size);
            if !rect.is_empty() {
                sources.fill_paint = Some(fill_source(target, &rect, color)?);
            }
        }

        if let Some(color) = self.target.stroke_paint() {
            let rect = clamp_to_surface_size(&needed.stroke_paint.bounds(), max_size);
            if !rect.is_empty() {
                sources.stroke_paint = Some(fill_source(target, &rect, color)?);
            }
        }

        let graph = build_filter_node_graph(&self.description, &sources);

        target.set_transform(&filter_to_user.post_transform(&self.paint_transform));
        target.draw_filter(&graph, &Rect::from(output), opacity);

        Ok(result)
    }

    /// Translates the description into WebRender filters.
    ///
    /// Uses the SVGFE graph when it is enabled in the configuration, and the CHAIN fast
    /// path otherwise.
    pub fn webrender_filters(&self, holder: &mut WrFiltersHolder) -> WrFiltersStatus {
        if !self.is_initialized() {
            return WrFiltersStatus::Unsupported;
        }

        if self.description.is_empty() {
            return if self.filters.is_empty() {
                WrFiltersStatus::Chain
            } else {
                WrFiltersStatus::DisabledForPerformance
            };
        }

        let config = &self.config.webrender;

        if config.svgfe_enabled {
            build_svgfe_graph(
                &self.description,
                &self.filter_to_frame,
                config,
                holder,
                &self.session,
            )
        } else {
            build_chain(
                &self.description,
                &self.target_bounds,
                &self.filter_to_frame,
                config,
                holder,
                &self.session,
            )
        }
    }

    /// Paints `ctx.target` with its filter chain applied.
    ///
    /// `dirty_area` is the part of the result to paint, in frame space.
    pub fn paint_filtered_frame<D: DrawTarget>(
        ctx: &FilterContext<'_>,
        target: &mut D,
        paint: &mut dyn PaintCallback<D>,
        dirty_area: Option<&FRegion>,
        opacity: f64,
    ) -> DrawResult {
        ctx.builder()
            .post_filter_dirty_region(dirty_area.cloned())
            .build()
            .render(target, paint, opacity)
    }

    /// The part of the filtered result that changes when `pre_filter_dirty` changes, in
    /// frame space.
    pub fn get_post_filter_dirty_area(
        ctx: &FilterContext<'_>,
        pre_filter_dirty: &FRegion,
    ) -> FRegion {
        if pre_filter_dirty.is_empty() {
            return FRegion::new();
        }

        ctx.builder()
            .pre_filter_dirty_region(Some(pre_filter_dirty.clone()))
            .build()
            .compute_post_filter_dirty_region()
    }

    /// The part of the unfiltered element needed to paint `post_filter_dirty` of the
    /// result, in frame space.
    pub fn get_pre_filter_needed_area(
        ctx: &FilterContext<'_>,
        post_filter_dirty: &FRegion,
    ) -> Rect {
        ctx.builder()
            .post_filter_dirty_region(Some(post_filter_dirty.clone()))
            .build()
            .compute_source_needed_rect()
    }

    /// The largest area that the filtered element can cover, in frame space.
    ///
    /// `override_bbox` is in user space; `pre_filter_bounds` is in frame space.
    pub fn get_post_filter_bounds(
        ctx: &FilterContext<'_>,
        override_bbox: Option<Rect>,
        pre_filter_bounds: Option<Rect>,
    ) -> Rect {
        ctx.builder()
            .override_bbox(override_bbox)
            .pre_filter_bounds(pre_filter_bounds)
            .build()
            .compute_post_filter_extents()
    }

    /// Appends the WebRender filters for `ctx.target` to `holder`.
    pub fn build_webrender_filters(
        ctx: &FilterContext<'_>,
        holder: &mut WrFiltersHolder,
    ) -> WrFiltersStatus {
        ctx.builder().build().webrender_filters(holder)
    }
}

/// Everything needed to build one-shot [`FilterInstance`]s for an element.
pub struct FilterContext<'a> {
    pub target: &'a dyn FilterTarget,
    pub filters: &'a FilterValueList,

    /// Resolves the `url()` entries of the chain; without it, only chains of filter
    /// functions can be built.
    pub resolver: Option<&'a dyn FilterFrameResolver>,

    pub paint_transform: Transform,
    pub input_is_tainted: bool,
    pub config: FilterConfig,
    pub session: Session,
}

impl<'a> FilterContext<'a> {
    pub fn new(target: &'a dyn FilterTarget, filters: &'a FilterValueList) -> FilterContext<'a> {
        FilterContext {
            target,
            filters,
            resolver: None,
            paint_transform: Transform::identity(),
            input_is_tainted: false,
            config: FilterConfig::default(),
            session: Session::default(),
        }
    }

    fn builder(&self) -> FilterInstanceBuilder<'a> {
        let builder = FilterInstance::builder(self.target, self.filters)
            .paint_transform(self.paint_transform)
            .input_is_tainted(self.input_is_tainted)
            .config(self.config)
            .session(self.session.clone());

        match self.resolver {
            Some(resolver) => builder.resolve_frames(resolver),
            None => builder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterDefs;
    use crate::parsers::Parse;
    use crate::render::FilterNodeGraph;
    use matches::assert_matches;

    fn chain(s: &str) -> FilterValueList {
        FilterValueList::parse_str(s).unwrap()
    }

    fn target() -> SimpleFilterTarget {
        SimpleFilterTarget::new(Rect::new(0.0, 0.0, 100.0, 100.0))
    }

    fn quiet() -> Session {
        Session::new_with_logging(false)
    }

    #[derive(Default)]
    struct Recorder {
        offscreens: Vec<(i32, i32)>,
        fills: usize,
        drawn: Option<(usize, Rect, f64)>,
        fail_allocation: bool,
    }

    impl DrawTarget for Recorder {
        type Surface = (i32, i32);

        fn create_offscreen(&self, width: i32, height: i32) -> Option<Self> {
            if self.fail_allocation {
                None
            } else {
                Some(Recorder {
                    offscreens: vec![(width, height)],
                    ..Recorder::default()
                })
            }
        }

        fn set_transform(&mut self, _transform: &Transform) {}

        fn fill_rect(&mut self, _rect: &Rect, _color: ColorF) {
            self.fills += 1;
        }

        fn into_surface(self) -> (i32, i32) {
            self.offscreens[0]
        }

        fn draw_filter(
            &mut self,
            graph: &FilterNodeGraph<(i32, i32)>,
            source_rect: &Rect,
            opacity: f64,
        ) {
            self.drawn = Some((graph.nodes().len(), *source_rect, opacity));
        }
    }

    #[test]
    fn empty_chain_has_no_primitives() {
        let target = target();
        let filters = chain("none");
        let instance = FilterInstance::builder(&target, &filters)
            .session(quiet())
            .build();

        assert!(instance.is_initialized());
        assert!(instance.filter_description().is_empty());
        assert_eq!(
            instance.compute_post_filter_extents(),
            Rect::new(0.0, 0.0, 100.0, 100.0)
        );
    }

    #[test]
    fn singular_transform_does_not_initialize() {
        let target = target();
        let filters = chain("blur(5px)");
        let instance = FilterInstance::builder(&target, &filters)
            .paint_transform(Transform::new_scale(0.0, 1.0))
            .session(quiet())
            .build();

        assert!(!instance.is_initialized());
        assert_eq!(instance.init_error(), Some(&InitError::SingularTransform));
        assert!(instance.filter_description().is_empty());
        assert_eq!(instance.compute_source_needed_rect(), Rect::default());
        assert_eq!(instance.compute_post_filter_extents(), Rect::default());
    }

    #[test]
    fn missing_frames_do_not_initialize() {
        let target = target();
        let filters = chain("url(#nope) blur(2px)");
        let defs = FilterDefs::new();
        let instance = FilterInstance::builder(&target, &filters)
            .session(quiet())
            .resolve_frames(&defs)
            .build();

        assert_eq!(instance.init_error(), Some(&InitError::MissingFilterFrames));
    }

    #[test]
    fn frame_count_must_match() {
        let target = target();
        let filters = chain("url(#a)");
        let instance = FilterInstance::builder(&target, &filters)
            .session(quiet())
            .build();

        assert_eq!(instance.init_error(), Some(&InitError::MissingFilterFrames));
    }

    #[test]
    fn css_chain_builds_one_node_per_function() {
        let target = target();
        let filters = chain("opacity(0.5) blur(2px) grayscale(1)");
        let instance = FilterInstance::builder(&target, &filters)
            .session(quiet())
            .build();

        let description = instance.filter_description();
        assert_eq!(description.primitives.len(), 3);
        assert_eq!(
            description.primitives[2].subregion,
            IRect::new(-6, -6, 106, 106)
        );
    }

    #[test]
    fn scale_and_offset_map_to_frame_space() {
        let mut target = target();
        target.offset = (10.0, 20.0);

        let filters = chain("blur(1px)");
        let instance = FilterInstance::builder(&target, &filters)
            .paint_transform(Transform::new_scale(2.0, 2.0))
            .session(quiet())
            .build();

        // blur(1px) at scale 2 is a deviation of 2 filter-space pixels.
        assert_eq!(instance.target_bounds(), IRect::new(0, 0, 200, 200));
        assert_eq!(
            instance.compute_post_filter_extents(),
            Rect::new(7.0, 17.0, 113.0, 123.0)
        );
    }

    #[test]
    fn dirty_region_propagates_through_offset_free_chain() {
        let target = target();
        let filters = chain("blur(2px)");
        let instance = FilterInstance::builder(&target, &filters)
            .pre_filter_dirty_region(Some(FRegion::from_rect(Rect::new(
                10.0, 10.0, 20.0, 20.0,
            ))))
            .session(quiet())
            .build();

        let dirty = instance.compute_post_filter_dirty_region();
        assert_eq!(dirty.bounds(), Rect::new(4.0, 4.0, 26.0, 26.0));
    }

    #[test]
    fn empty_pre_filter_dirty_region_is_empty() {
        let target = target();
        let filters = chain("blur(2px)");
        let instance = FilterInstance::builder(&target, &filters)
            .pre_filter_dirty_region(Some(FRegion::new()))
            .session(quiet())
            .build();

        assert!(instance.compute_post_filter_dirty_region().is_empty());
    }

    #[test]
    fn render_paints_source_once() {
        let target = target();
        let filters = chain("blur(2px)");
        let instance = FilterInstance::builder(&target, &filters)
            .session(quiet())
            .build();

        let mut draw_target = Recorder::default();
        let mut calls = 0;
        let mut paint = |_: &mut Recorder, _: &Transform, dirty: &Rect| {
            calls += 1;
            assert_eq!(*dirty, Rect::new(0.0, 0.0, 100.0, 100.0));
            DrawResult::Incomplete
        };

        let result = instance.render(&mut draw_target, &mut paint, 0.5);

        assert_eq!(result, DrawResult::Incomplete);
        assert_eq!(calls, 1);
        assert_matches!(draw_target.drawn, Some((2, _, o)) if o == 0.5);
    }

    #[test]
    fn render_of_empty_chain_does_nothing() {
        let target = target();
        let filters = chain("none");
        let instance = FilterInstance::builder(&target, &filters)
            .session(quiet())
            .build();

        let mut draw_target = Recorder::default();
        let mut paint = |_: &mut Recorder, _: &Transform, _: &Rect| -> DrawResult {
            panic!("should not paint");
        };

        assert_eq!(
            instance.render(&mut draw_target, &mut paint, 1.0),
            DrawResult::Success
        );
        assert!(draw_target.drawn.is_none());
    }

    #[test]
    fn allocation_failure_renders_nothing() {
        let target = target();
        let filters = chain("blur(2px)");
        let instance = FilterInstance::builder(&target, &filters)
            .session(quiet())
            .build();

        let mut draw_target = Recorder {
            fail_allocation: true,
            ..Recorder::default()
        };
        let mut paint = |_: &mut Recorder, _: &Transform, _: &Rect| DrawResult::Success;

        assert_eq!(
            instance.render(&mut draw_target, &mut paint, 1.0),
            DrawResult::Success
        );
        assert!(draw_target.drawn.is_none());
    }

    #[test]
    fn webrender_dispatch() {
        let target = target();
        let filters = chain("blur(2px) opacity(0.5)");

        let mut ctx = FilterContext::new(&target, &filters);
        ctx.session = quiet();

        let mut holder = WrFiltersHolder::new();
        let status = FilterInstance::build_webrender_filters(&ctx, &mut holder);
        assert_eq!(status, WrFiltersStatus::Svgfe);
        assert_eq!(holder.num_graph_nodes(), 3);

        ctx.config = ctx.config.with_svgfe_enabled(false);
        let mut holder = WrFiltersHolder::new();
        let status = FilterInstance::build_webrender_filters(&ctx, &mut holder);
        assert_eq!(status, WrFiltersStatus::Chain);
        assert_eq!(
            holder.filters,
            vec![
                crate::webrender::FilterOp::Blur(2.0, 2.0),
                crate::webrender::FilterOp::Opacity(0.5)
            ]
        );
    }

    #[test]
    fn convenience_functions_agree_with_instance() {
        let target = target();
        let filters = chain("blur(5px)");
        let mut ctx = FilterContext::new(&target, &filters);
        ctx.session = quiet();

        let needed = FilterInstance::get_pre_filter_needed_area(
            &ctx,
            &FRegion::from_rect(Rect::new(0.0, 0.0, 100.0, 100.0)),
        );
        assert_eq!(needed, Rect::new(0.0, 0.0, 100.0, 100.0));

        let bounds = FilterInstance::get_post_filter_bounds(&ctx, None, None);
        assert_eq!(bounds, Rect::new(-15.0, -15.0, 115.0, 115.0));

        assert!(FilterInstance::get_post_filter_dirty_area(&ctx, &FRegion::new()).is_empty());
    }
}
