//! Builds filter-effect graphs for CSS and SVG filter chains.
//!
//! The `filter` property of an element is a chain of CSS filter functions like
//! `blur(5px)` and references to SVG `<filter>` elements.  This crate turns such a chain
//! into a single [`filters::FilterDescription`]: a list of primitives where each one reads
//! its inputs from earlier primitives or from the element's own rendering.
//!
//! With the description built, a [`instance::FilterInstance`] can:
//!
//! * Compute which part of the element has to be painted to produce a given part of the
//!   filtered result, which part of the result changes when part of the element changes,
//!   and how far the result can extend.
//!
//! * Render the result through a [`render::DrawTarget`] supplied by the caller.
//!
//! * Translate the description into WebRender filters, either as an SVGFE graph or as a
//!   simple chain of ops; see [`webrender`].
//!
//! # Example
//!
//! ```
//! use fegraph::filter::FilterValueList;
//! use fegraph::instance::{FilterInstance, SimpleFilterTarget};
//! use fegraph::parsers::Parse;
//! use fegraph::rect::Rect;
//!
//! let filters = FilterValueList::parse_str("blur(5px)").unwrap();
//! let target = SimpleFilterTarget::new(Rect::new(0.0, 0.0, 100.0, 100.0));
//! let instance = FilterInstance::builder(&target, &filters).build();
//!
//! assert!(instance.is_initialized());
//!
//! // A blur spreads pixels by three times its standard deviation.
//! assert_eq!(
//!     instance.compute_post_filter_extents(),
//!     Rect::new(-15.0, -15.0, 115.0, 115.0)
//! );
//! ```

#![allow(rustdoc::private_intra_doc_links)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::derive_partial_eq_without_eq)]
#![warn(nonstandard_style, rust_2018_idioms, unused)]
// Some lints no longer exist
#![warn(renamed_and_removed_lints)]
// Standalone lints
#![warn(trivial_casts, trivial_numeric_casts)]

#[macro_use]
mod log;

pub mod angle;
pub mod aspect_ratio;
pub mod attributes;
pub mod color;
pub mod config;
pub mod coord_units;
pub mod error;
pub mod filter;
pub mod filter_func;
pub mod filters;
pub mod instance;
pub mod length;
pub mod parsers;
pub mod rect;
pub mod region;
pub mod regions;
pub mod render;
pub mod session;
pub mod transform;
pub mod webrender;
