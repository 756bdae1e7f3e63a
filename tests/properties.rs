use proptest::prelude::*;

use fegraph::attributes::Attributes;
use fegraph::config::{FilterConfig, SvgfeKinds};
use fegraph::filter::{FilterDefs, FilterValueList, SvgFilter};
use fegraph::filters::image::ImageInfo;
use fegraph::filters::{FilterDescription, InputRef, PrimitiveAttributes};
use fegraph::instance::{FilterInstance, SimpleFilterTarget};
use fegraph::parsers::Parse;
use fegraph::rect::Rect;
use fegraph::region::FRegion;
use fegraph::session::Session;
use fegraph::webrender::{FilterOp, WrFiltersHolder, WrFiltersStatus};

fn css_function() -> impl Strategy<Value = String> {
    prop_oneof![
        (0..20u32).prop_map(|r| format!("blur({r}px)")),
        (1..=100u32).prop_map(|p| format!("opacity({p}%)")),
        (0..=100u32).prop_map(|p| format!("grayscale({p}%)")),
        (0..=100u32).prop_map(|p| format!("sepia({p}%)")),
        (0..=100u32).prop_map(|p| format!("invert({p}%)")),
        (0..300u32).prop_map(|p| format!("saturate({p}%)")),
        (0..300u32).prop_map(|p| format!("brightness({p}%)")),
        (0..300u32).prop_map(|p| format!("contrast({p}%)")),
        (0..360u32).prop_map(|d| format!("hue-rotate({d}deg)")),
        (-20..20i32, -20..20i32, 0..10u32)
            .prop_map(|(dx, dy, s)| format!("drop-shadow({dx}px {dy}px {s}px)")),
    ]
}

fn css_chain() -> impl Strategy<Value = String> {
    prop::collection::vec(css_function(), 1..8).prop_map(|v| v.join(" "))
}

prop_compose! {
    fn element_bbox()(x in -50..50i32, y in -50..50i32, w in 1..200i32, h in 1..200i32) -> Rect {
        Rect::from_xywh(f64::from(x), f64::from(y), f64::from(w), f64::from(h))
    }
}

prop_compose! {
    fn dirty_rect(bbox: Rect)(
        x in 0.0..1.0f64,
        y in 0.0..1.0f64,
        w in 0..60i32,
        h in 0..60i32
    ) -> Rect {
        let x0 = (bbox.x0 + x * bbox.width()).floor();
        let y0 = (bbox.y0 + y * bbox.height()).floor();
        Rect::new(x0, y0, x0 + f64::from(w), y0 + f64::from(h))
    }
}

/// Where a primitive reads from.  `Result(k)` names the result of the k-th primitive of
/// the same filter, which may not exist yet.
#[derive(Debug, Clone)]
enum In {
    Unspecified,
    SourceGraphic,
    SourceAlpha,
    Result(usize),
}

#[derive(Debug, Clone)]
enum Prim {
    Flood,
    Blur(In, u32),
    Offset(In, i32, i32),
    Blend(In, In),
    Composite(In, In),
    Merge(Vec<In>),
    ColorMatrix(In),
    Image { cross_origin: bool },
}

const IMAGE_HREF: &str = "image.png";

fn input() -> impl Strategy<Value = In> {
    prop_oneof![
        Just(In::Unspecified),
        Just(In::SourceGraphic),
        Just(In::SourceAlpha),
        (0..8usize).prop_map(In::Result),
    ]
}

fn primitive() -> impl Strategy<Value = Prim> {
    prop_oneof![
        Just(Prim::Flood),
        (input(), 0..5u32).prop_map(|(i, s)| Prim::Blur(i, s)),
        (input(), -10..10i32, -10..10i32).prop_map(|(i, dx, dy)| Prim::Offset(i, dx, dy)),
        (input(), input()).prop_map(|(a, b)| Prim::Blend(a, b)),
        (input(), input()).prop_map(|(a, b)| Prim::Composite(a, b)),
        prop::collection::vec(input(), 0..4).prop_map(Prim::Merge),
        input().prop_map(Prim::ColorMatrix),
        any::<bool>().prop_map(|cross_origin| Prim::Image { cross_origin }),
    ]
}

/// Two filters, applied one after the other, so that the second one reads the output of
/// the first one through its standard inputs.
fn svg_filters() -> impl Strategy<Value = (Vec<Prim>, Vec<Prim>)> {
    (
        prop::collection::vec(primitive(), 1..6),
        prop::collection::vec(primitive(), 1..6),
    )
}

fn with_input(mut attrs: Vec<(String, String)>, name: &str, input: &In) -> Vec<(String, String)> {
    let value = match *input {
        In::Unspecified => return attrs,
        In::SourceGraphic => "SourceGraphic".to_string(),
        In::SourceAlpha => "SourceAlpha".to_string(),
        In::Result(k) => format!("r{k}"),
    };

    attrs.push((name.to_string(), value));
    attrs
}

fn pairs(list: &[(&str, &str)]) -> Vec<(String, String)> {
    list.iter()
        .map(|&(n, v)| (n.to_string(), v.to_string()))
        .collect()
}

fn svg_filter(id: &str, prims: &[Prim], session: &Session) -> SvgFilter {
    let attrs: Attributes = [("id", id)].into_iter().collect();
    let mut filter = SvgFilter::new(&attrs, session);

    for (i, prim) in prims.iter().enumerate() {
        let mut attrs = vec![("result".to_string(), format!("r{i}"))];

        let name = match *prim {
            Prim::Flood => {
                attrs.extend(pairs(&[("flood-color", "red"), ("flood-opacity", "0.5")]));
                "feFlood"
            }

            Prim::Blur(ref i, s) => {
                attrs = with_input(attrs, "in", i);
                attrs.push(("stdDeviation".to_string(), s.to_string()));
                "feGaussianBlur"
            }

            Prim::Offset(ref i, dx, dy) => {
                attrs = with_input(attrs, "in", i);
                attrs.push(("dx".to_string(), dx.to_string()));
                attrs.push(("dy".to_string(), dy.to_string()));
                "feOffset"
            }

            Prim::Blend(ref a, ref b) => {
                attrs = with_input(attrs, "in", a);
                attrs = with_input(attrs, "in2", b);
                attrs.extend(pairs(&[("mode", "multiply")]));
                "feBlend"
            }

            Prim::Composite(ref a, ref b) => {
                attrs = with_input(attrs, "in", a);
                attrs = with_input(attrs, "in2", b);
                attrs.extend(pairs(&[("operator", "in")]));
                "feComposite"
            }

            Prim::Merge(_) => "feMerge",

            Prim::ColorMatrix(ref i) => {
                attrs = with_input(attrs, "in", i);
                attrs.extend(pairs(&[("type", "saturate"), ("values", "0.5")]));
                "feColorMatrix"
            }

            Prim::Image { .. } => {
                attrs.extend(pairs(&[("href", IMAGE_HREF)]));
                "feImage"
            }
        };

        let attrs: Attributes = attrs.into_iter().collect();
        let element = filter.add_primitive(name, &attrs, session);

        if let (Prim::Merge(nodes), Some(merge)) = (prim, element) {
            for node in nodes {
                let attrs: Attributes = with_input(Vec::new(), "in", node).into_iter().collect();
                merge.add_child("feMergeNode", &attrs, session);
            }
        }
    }

    let cross_origin = prims
        .iter()
        .any(|p| matches!(*p, Prim::Image { cross_origin: true }));

    filter.set_image_info(
        IMAGE_HREF,
        ImageInfo {
            width: 10,
            height: 10,
            cross_origin,
        },
    );

    filter
}

fn svg_defs(first: &[Prim], second: &[Prim]) -> FilterDefs {
    let session = quiet();

    let mut defs = FilterDefs::new();
    defs.insert(svg_filter("a", first, &session));
    defs.insert(svg_filter("b", second, &session));
    defs
}

fn assert_inputs_precede(description: &FilterDescription) -> Result<(), TestCaseError> {
    for (i, p) in description.primitives.iter().enumerate() {
        for input in p.inputs.iter() {
            if let InputRef::Primitive(k) = *input {
                prop_assert!(k < i, "node {} reads node {}", i, k);
            }
        }
    }

    Ok(())
}

fn quiet() -> Session {
    Session::new_with_logging(false)
}

fn parse(chain: &str) -> FilterValueList {
    FilterValueList::parse_str(chain).unwrap()
}

proptest! {
    #[test]
    fn inputs_refer_to_earlier_nodes(chain in css_chain()) {
        let target = SimpleFilterTarget::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        let filters = parse(&chain);
        let instance = FilterInstance::builder(&target, &filters).session(quiet()).build();

        let primitives = &instance.filter_description().primitives;
        prop_assert_eq!(primitives.len(), filters.len());

        for (i, p) in primitives.iter().enumerate() {
            for input in p.inputs.iter() {
                match *input {
                    InputRef::Primitive(k) => prop_assert!(k < i, "node {} reads node {}", i, k),
                    InputRef::SourceGraphic => prop_assert_eq!(i, 0),
                    other => prop_assert!(false, "unexpected input {:?}", other),
                }
            }
        }
    }

    #[test]
    fn extents_contain_the_element(chain in css_chain(), bbox in element_bbox()) {
        let target = SimpleFilterTarget::new(bbox);
        let filters = parse(&chain);
        let instance = FilterInstance::builder(&target, &filters).session(quiet()).build();

        let extents = instance.compute_post_filter_extents();
        prop_assert!(extents.contains_rect(&bbox), "{:?} does not contain {:?}", extents, bbox);
    }

    #[test]
    fn needed_area_grows_with_dirty_area(
        chain in css_chain(),
        (bbox, dirty) in element_bbox().prop_flat_map(|b| (Just(b), dirty_rect(b))),
        grow in 0..30i32,
    ) {
        let target = SimpleFilterTarget::new(bbox);
        let filters = parse(&chain);
        let grow = f64::from(grow);

        let needed = |dirty: Rect| {
            FilterInstance::builder(&target, &filters)
                .post_filter_dirty_region(Some(FRegion::from_rect(dirty)))
                .session(quiet())
                .build()
                .compute_source_needed_rect()
        };

        let small = needed(dirty);
        let large = needed(dirty.inflate(grow, grow));

        prop_assert!(large.contains_rect(&small), "{:?} does not contain {:?}", large, small);
        prop_assert!(bbox.contains_rect(&large));
    }

    #[test]
    fn dirty_region_stays_inside_extents(
        chain in css_chain(),
        (bbox, dirty) in element_bbox().prop_flat_map(|b| (Just(b), dirty_rect(b))),
    ) {
        let target = SimpleFilterTarget::new(bbox);
        let filters = parse(&chain);
        let dirty = dirty.intersect(&bbox);

        let instance = FilterInstance::builder(&target, &filters)
            .pre_filter_dirty_region(Some(FRegion::from_rect(dirty)))
            .session(quiet())
            .build();

        let changed = instance.compute_post_filter_dirty_region().bounds();
        let extents = instance.compute_post_filter_extents();

        prop_assert!(extents.contains_rect(&changed), "{:?} does not contain {:?}", extents, changed);
    }

    #[test]
    fn changes_of_needed_area_reach_the_dirty_area(
        chain in css_chain(),
        (bbox, dirty) in element_bbox().prop_flat_map(|b| (Just(b), dirty_rect(b))),
    ) {
        let target = SimpleFilterTarget::new(bbox);
        let filters = parse(&chain);

        let instance = FilterInstance::builder(&target, &filters)
            .post_filter_dirty_region(Some(FRegion::from_rect(dirty)))
            .session(quiet())
            .build();

        let needed = instance.compute_source_needed_rect();
        let repaint = dirty.intersect(&instance.compute_post_filter_extents());

        let changed = FilterInstance::builder(&target, &filters)
            .pre_filter_dirty_region(Some(FRegion::from_rect(needed)))
            .session(quiet())
            .build()
            .compute_post_filter_dirty_region()
            .bounds();

        prop_assert!(changed.contains_rect(&repaint), "{:?} does not contain {:?}", changed, repaint);
    }

    #[test]
    fn taint_reaches_every_node(chain in css_chain(), tainted: bool) {
        let target = SimpleFilterTarget::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        let filters = parse(&chain);
        let instance = FilterInstance::builder(&target, &filters)
            .input_is_tainted(tainted)
            .session(quiet())
            .build();

        for p in &instance.filter_description().primitives {
            prop_assert_eq!(p.is_tainted, tainted);
        }
    }

    #[test]
    fn graph_ops_only_read_earlier_ops(chain in css_chain()) {
        let target = SimpleFilterTarget::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        let filters = parse(&chain);
        let instance = FilterInstance::builder(&target, &filters).session(quiet()).build();

        let mut holder = WrFiltersHolder::new();
        prop_assert_eq!(instance.webrender_filters(&mut holder), WrFiltersStatus::Svgfe);
        prop_assert!(holder.post_filters_clip.is_some());

        for (i, op) in holder.filters.iter().enumerate() {
            let node = match *op {
                FilterOp::SvgGraphNode(ref node, _) => node,
                ref other => return Err(TestCaseError::fail(format!("not a graph op: {other:?}"))),
            };

            for id in node.input.iter().chain(node.input2.iter()) {
                prop_assert!(id.0 < i, "op {} reads op {}", i, id.0);
            }
        }
    }

    #[test]
    fn svg_inputs_refer_to_earlier_nodes((first, second) in svg_filters()) {
        let target = SimpleFilterTarget::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        let filters = parse("url(#a) url(#b)");
        let defs = svg_defs(&first, &second);

        let instance = FilterInstance::builder(&target, &filters)
            .resolve_frames(&defs)
            .session(quiet())
            .build();

        prop_assert!(instance.is_initialized());
        prop_assert!(instance.filter_description().primitives.len() >= first.len() + second.len());
        assert_inputs_precede(instance.filter_description())?;
    }

    #[test]
    fn svg_taint_follows_inputs((first, second) in svg_filters(), tainted: bool) {
        let target = SimpleFilterTarget::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        let filters = parse("url(#a) url(#b)");
        let defs = svg_defs(&first, &second);

        let instance = FilterInstance::builder(&target, &filters)
            .resolve_frames(&defs)
            .input_is_tainted(tainted)
            .session(quiet())
            .build();

        let primitives = &instance.filter_description().primitives;

        for (i, p) in primitives.iter().enumerate() {
            let own = matches!(
                p.attributes,
                PrimitiveAttributes::Image(ref image) if image.image.cross_origin
            );

            let from_inputs = p.inputs.iter().any(|input| match *input {
                InputRef::Primitive(k) => primitives[k].is_tainted,
                _ => tainted,
            });

            prop_assert_eq!(p.is_tainted, own || from_inputs, "node {}", i);
        }
    }

    #[test]
    fn svg_graph_ops_only_read_earlier_ops((first, second) in svg_filters()) {
        let target = SimpleFilterTarget::new(Rect::new(0.0, 0.0, 100.0, 100.0));
        let filters = parse("url(#a) url(#b)");
        let defs = svg_defs(&first, &second);

        let instance = FilterInstance::builder(&target, &filters)
            .resolve_frames(&defs)
            .config(FilterConfig::default().with_svgfe_kinds(SvgfeKinds::all()))
            .session(quiet())
            .build();

        let mut holder = WrFiltersHolder::new();
        prop_assert_eq!(instance.webrender_filters(&mut holder), WrFiltersStatus::Svgfe);
        prop_assert!(!holder.is_empty());

        for (i, op) in holder.filters.iter().enumerate() {
            let node = match *op {
                FilterOp::SvgGraphNode(ref node, _) => node,
                ref other => return Err(TestCaseError::fail(format!("not a graph op: {other:?}"))),
            };

            for id in node.input.iter().chain(node.input2.iter()) {
                prop_assert!(id.0 < i, "op {} reads op {}", i, id.0);
            }
        }
    }
}
