#![warn(unused)]

use anyhow::Result;
use clap::Parser;
use itertools::Itertools;
use std::process;
use thiserror::Error;

use fegraph::config::FilterConfig;
use fegraph::filter::FilterValueList;
use fegraph::filters::{FilterDescription, FilterPrimitiveDescription, InputRef};
use fegraph::instance::{FilterInstance, SimpleFilterTarget};
use fegraph::parsers::Parse;
use fegraph::rect::{IRect, Rect};
use fegraph::region::FRegion;
use fegraph::session::Session;
use fegraph::transform::Transform;
use fegraph::webrender::{FilterOp, WrFiltersHolder, WrFiltersStatus};

#[derive(Parser, Debug)]
#[command(
    name = "fegraph-dump",
    version,
    about = "Prints the filter graph, regions and WebRender filters for a CSS filter chain."
)]
struct Opt {
    /// Filter chain, like "blur(5px) opacity(50%)"
    filter: String,

    /// Bounding box of the filtered element as x,y,width,height
    #[arg(long, value_parser = parse_rect, default_value = "0,0,100,100")]
    bbox: Rect,

    /// Scale from user space to device space as sx,sy
    #[arg(long, value_parser = parse_pair, default_value = "1,1")]
    scale: (f64, f64),

    /// Offset from user space to frame space as x,y
    #[arg(long, value_parser = parse_pair, default_value = "0,0")]
    offset: (f64, f64),

    /// Changed area of the unfiltered element as x,y,width,height; everything if omitted
    #[arg(long, value_parser = parse_rect)]
    dirty: Option<Rect>,

    /// Build a CHAIN of ops instead of an SVGFE graph
    #[arg(long)]
    no_svgfe: bool,

    /// Maximum number of WebRender ops for one filter chain
    #[arg(long)]
    max_ops: Option<usize>,

    /// Log diagnostics to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum ArgError {
    #[error("expected {expected} comma-separated numbers, got \"{value}\"")]
    WrongCount { expected: usize, value: String },

    #[error("invalid number \"{0}\"")]
    Number(String),

    #[error("width and height must not be negative")]
    NegativeSize,
}

fn parse_numbers(value: &str, expected: usize) -> Result<Vec<f64>, ArgError> {
    let numbers = value
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<f64>()
                .map_err(|_| ArgError::Number(s.trim().to_string()))
        })
        .collect::<Result<Vec<f64>, _>>()?;

    if numbers.len() != expected {
        return Err(ArgError::WrongCount {
            expected,
            value: value.to_string(),
        });
    }

    Ok(numbers)
}

fn parse_rect(value: &str) -> Result<Rect, ArgError> {
    let n = parse_numbers(value, 4)?;

    if n[2] < 0.0 || n[3] < 0.0 {
        return Err(ArgError::NegativeSize);
    }

    Ok(Rect::from_xywh(n[0], n[1], n[2], n[3]))
}

fn parse_pair(value: &str) -> Result<(f64, f64), ArgError> {
    let n = parse_numbers(value, 2)?;
    Ok((n[0], n[1]))
}

#[derive(Debug, Error)]
enum DumpError {
    #[error("could not parse filter \"{filter}\": {message}")]
    Parse { filter: String, message: String },

    #[error("filter did not initialize: {0}")]
    Init(String),
}

fn format_rect(r: &Rect) -> String {
    format!("({}, {}, {}, {})", r.x0, r.y0, r.x1, r.y1)
}

fn format_irect(r: &IRect) -> String {
    format!("({}, {}, {}, {})", r.x0, r.y0, r.x1, r.y1)
}

fn format_input(input: &InputRef) -> String {
    match *input {
        InputRef::SourceGraphic => "SourceGraphic".to_string(),
        InputRef::SourceAlpha => "SourceAlpha".to_string(),
        InputRef::FillPaint => "FillPaint".to_string(),
        InputRef::StrokePaint => "StrokePaint".to_string(),
        InputRef::Primitive(i) => format!("#{i}"),
    }
}

fn format_node(index: usize, node: &FilterPrimitiveDescription) -> String {
    let inputs = node
        .inputs
        .iter()
        .zip(node.input_color_spaces.iter())
        .map(|(input, space)| format!("{} ({:?})", format_input(input), space))
        .join(", ");

    format!(
        "  #{index} {}: in [{inputs}] out {:?} subregion {}{}",
        node.attributes.name(),
        node.output_color_space,
        format_irect(&node.subregion),
        if node.is_tainted { " tainted" } else { "" }
    )
}

fn print_description(description: &FilterDescription) {
    println!("nodes: {}", description.primitives.len());

    for (i, node) in description.primitives.iter().enumerate() {
        println!("{}", format_node(i, node));
    }

    println!("filter region: {}", format_rect(&description.filter_region));
}

fn format_op(op: &FilterOp) -> String {
    match *op {
        FilterOp::SvgGraphNode(ref node, ref graph_op) => {
            let inputs = node
                .input
                .iter()
                .chain(node.input2.iter())
                .map(|id| format!("${}", id.0))
                .join(", ");

            format!(
                "{graph_op:?} in [{inputs}] linear {} subregion {}",
                node.linear,
                format_rect(&node.subregion)
            )
        }

        ref other => format!("{other:?}"),
    }
}

fn print_webrender(status: WrFiltersStatus, holder: &WrFiltersHolder) {
    println!("webrender: {status:?}");

    for (i, op) in holder.filters.iter().enumerate() {
        println!("  {i}: {}", format_op(op));
    }

    if !holder.filter_datas.is_empty() {
        println!("  filter datas: {}", holder.filter_datas.len());
    }

    if let Some(ref clip) = holder.post_filters_clip {
        println!("  clip: {}", format_rect(clip));
    }
}

fn run(opt: &Opt) -> Result<()> {
    let session = Session::new_with_logging(opt.verbose);

    let filters = FilterValueList::parse_str(&opt.filter).map_err(|e| DumpError::Parse {
        filter: opt.filter.clone(),
        message: format!("{:?}", e.kind),
    })?;

    let mut config = FilterConfig::default().with_svgfe_enabled(!opt.no_svgfe);
    if let Some(max) = opt.max_ops {
        config = config.with_max_filter_ops_per_chain(max);
    }

    let mut target = SimpleFilterTarget::new(opt.bbox);
    target.offset = opt.offset;

    let (sx, sy) = opt.scale;

    let instance = FilterInstance::builder(&target, &filters)
        .paint_transform(Transform::new_scale(sx, sy))
        .post_filter_dirty_region(opt.dirty.map(FRegion::from_rect))
        .config(config)
        .session(session)
        .build();

    if let Some(err) = instance.init_error() {
        return Err(DumpError::Init(err.to_string()).into());
    }

    print_description(instance.filter_description());

    println!(
        "target bounds: {}",
        format_irect(&instance.target_bounds())
    );
    println!(
        "source needed: {}",
        format_rect(&instance.compute_source_needed_rect())
    );
    println!(
        "post-filter extents: {}",
        format_rect(&instance.compute_post_filter_extents())
    );

    let dirty = instance.compute_post_filter_dirty_region();
    println!(
        "post-filter dirty: [{}]",
        dirty.rects().iter().map(format_rect).join(", ")
    );

    let mut holder = WrFiltersHolder::new();
    let status = instance.webrender_filters(&mut holder);
    print_webrender(status, &holder);

    Ok(())
}

fn main() {
    let opt = Opt::parse();

    if let Err(e) = run(&opt) {
        eprintln!("{e}");
        process::exit(1);
    }
}
