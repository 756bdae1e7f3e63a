//! Error types.

use std::error;
use std::fmt;

use cssparser::{BasicParseError, BasicParseErrorKind, ParseErrorKind, ToCss};

/// A short-lived error.
///
/// The lifetime of the error is the same as the `cssparser::ParserInput` that
/// was used to create a `cssparser::Parser`.  That is, it is the lifetime of
/// the string data that is being parsed.
///
/// Use [`AttributeResultExt::attribute`] to turn it into a long-lived [`AttributeError`].
pub type ParseError<'i> = cssparser::ParseError<'i, ValueErrorKind>;

/// A simple error which refers to an attribute's value
#[derive(Debug, Clone, PartialEq)]
pub enum ValueErrorKind {
    /// An attribute with the specified name is not known for the element
    UnknownAttribute,

    /// The value could not be parsed
    Parse(String),

    // The value could be parsed, but is invalid
    Value(String),
}

impl ValueErrorKind {
    pub fn parse_error(s: &str) -> ValueErrorKind {
        ValueErrorKind::Parse(s.to_string())
    }

    pub fn value_error(s: &str) -> ValueErrorKind {
        ValueErrorKind::Value(s.to_string())
    }
}

impl fmt::Display for ValueErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ValueErrorKind::UnknownAttribute => write!(f, "unknown attribute name"),

            ValueErrorKind::Parse(ref s) => write!(f, "parse error: {s}"),

            ValueErrorKind::Value(ref s) => write!(f, "invalid value: {s}"),
        }
    }
}

impl<'a> From<BasicParseError<'a>> for ValueErrorKind {
    fn from(e: BasicParseError<'_>) -> ValueErrorKind {
        let BasicParseError { kind, .. } = e;

        let msg = match kind {
            BasicParseErrorKind::UnexpectedToken(_) => "unexpected token",
            BasicParseErrorKind::EndOfInput => "unexpected end of input",
            BasicParseErrorKind::AtRuleInvalid(_) => "invalid @-rule",
            BasicParseErrorKind::AtRuleBodyInvalid => "invalid @-rule body",
            BasicParseErrorKind::QualifiedRuleInvalid => "invalid qualified rule",
        };

        ValueErrorKind::parse_error(msg)
    }
}

/// A complete error for an attribute and its erroneous value
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeError {
    pub attr: String,
    pub err: ValueErrorKind,
}

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.attr, self.err)
    }
}

impl error::Error for AttributeError {}

/// Helper for converting `Result<O, E>` into `Result<O, AttributeError>`
///
/// Parsing functions for attribute values return their own kind of error; if that type
/// has an `impl From<FooError> for ValueErrorKind`, then `.attribute(name)` attaches the
/// attribute's name to the error.
pub trait AttributeResultExt<O> {
    fn attribute(self, attr: &str) -> Result<O, AttributeError>;
}

impl<O, E: Into<ValueErrorKind>> AttributeResultExt<O> for Result<O, E> {
    fn attribute(self, attr: &str) -> Result<O, AttributeError> {
        self.map_err(|e| e.into()).map_err(|err| AttributeError {
            attr: attr.to_string(),
            err,
        })
    }
}

/// Convert a short-lived ParseError into a long-lived AttributeError
fn parse_error_to_attribute_error(e: ParseError<'_>, attr: &str) -> AttributeError {
    let ParseError {
        kind,
        location: _location,
    } = e;

    let err = match kind {
        ParseErrorKind::Basic(BasicParseErrorKind::UnexpectedToken(tok)) => {
            let mut s = String::from("unexpected token '");
            // Writing to a String does not fail
            let _ = tok.to_css(&mut s);
            s.push('\'');

            ValueErrorKind::Parse(s)
        }

        ParseErrorKind::Basic(BasicParseErrorKind::EndOfInput) => {
            ValueErrorKind::parse_error("unexpected end of input")
        }

        ParseErrorKind::Basic(_) => ValueErrorKind::parse_error("invalid syntax"),

        ParseErrorKind::Custom(err) => err,
    };

    AttributeError {
        attr: attr.to_string(),
        err,
    }
}

/// Turns a short-lived `ParseError` into a long-lived `AttributeError`
impl<'i, O> AttributeResultExt<O> for Result<O, ParseError<'i>> {
    fn attribute(self, attr: &str) -> Result<O, AttributeError> {
        self.map_err(|e| parse_error_to_attribute_error(e, attr))
    }
}

/// Errors that make a single filter-chain entry fail to build.
///
/// Any of these aborts the whole chain; see [`InitError::ChainEntry`].
#[derive(Debug, Clone, PartialEq)]
pub enum FilterResolveError {
    /// A `url()` entry has no resolved `<filter>` element.
    MissingFilterFrame,

    /// A `url()` entry does not point to a fragment in the document.
    InvalidReference(String),

    /// The filter region has zero or negative width or height.
    InvalidFilterRegion,

    /// The filter uses objectBoundingBox units on an element with an empty bounding box.
    EmptyBoundingBox,

    /// A primitive uses an input that is not supported, like `BackgroundImage`.
    UnsupportedInput(String),

    /// A rectangle does not fit in integer filter-space coordinates.
    Overflow,
}

impl fmt::Display for FilterResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            FilterResolveError::MissingFilterFrame => write!(f, "filter reference is not resolved"),
            FilterResolveError::InvalidReference(ref s) => {
                write!(f, "invalid filter reference: {s:?}")
            }
            FilterResolveError::InvalidFilterRegion => write!(f, "invalid filter region"),
            FilterResolveError::EmptyBoundingBox => {
                write!(f, "objectBoundingBox units on an empty bounding box")
            }
            FilterResolveError::UnsupportedInput(ref s) => write!(f, "unsupported input: {s}"),
            FilterResolveError::Overflow => write!(f, "filter region does not fit in an integer"),
        }
    }
}

impl error::Error for FilterResolveError {}

/// Reason why a [`crate::instance::FilterInstance`] did not get initialized.
///
/// This is only kept for diagnostics.  An uninitialized instance answers every query
/// with an empty result.
#[derive(Debug, Clone, PartialEq)]
pub enum InitError {
    /// The paint transform has a zero, negative or non-finite scale factor.
    SingularTransform,

    /// The target's bounding box does not fit in integer filter-space coordinates.
    BBoxOverflow,

    /// The number of resolved filter frames does not match the `url()` entries.
    MissingFilterFrames,

    /// Building one of the entries of the filter chain failed.
    ChainEntry {
        index: usize,
        err: FilterResolveError,
    },
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            InitError::SingularTransform => write!(f, "singular paint transform"),
            InitError::BBoxOverflow => write!(f, "bounding box overflows filter space"),
            InitError::MissingFilterFrames => write!(f, "some filter references are invalid"),
            InitError::ChainEntry { index, ref err } => {
                write!(f, "filter chain entry {index} failed: {err}")
            }
        }
    }
}

impl error::Error for InitError {}

impl From<(usize, FilterResolveError)> for InitError {
    fn from((index, err): (usize, FilterResolveError)) -> InitError {
        InitError::ChainEntry { index, err }
    }
}
