use std::cmp::min;

use cssparser::Parser;

use crate::attributes::Attributes;
use crate::error::*;
use crate::parse_identifiers;
use crate::parsers::{parse_attribute, set_attribute, CommaSeparatedList, Parse};
use crate::rect::IRect;
use crate::region::IRegion;
use crate::session::Session;

use super::context::PrimitiveContext;
use super::{FilterEffect, Input, Primitive, PrimitiveAttributes};

/// The `feComponentTransfer` filter primitive.
#[derive(Debug, Default, Clone)]
pub struct FeComponentTransfer {
    base: Primitive,
    in1: Input,
    params: ComponentTransfer,
}

/// Resolved `feComponentTransfer` primitive.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ComponentTransfer {
    /// One function per channel, in R, G, B, A order.
    pub functions: [TransferFunction; 4],
}

/// Pixel components that can be influenced by `feComponentTransfer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    R,
    G,
    B,
    A,
}

impl Channel {
    fn from_element_name(name: &str) -> Option<Channel> {
        match name {
            "feFuncR" => Some(Channel::R),
            "feFuncG" => Some(Channel::G),
            "feFuncB" => Some(Channel::B),
            "feFuncA" => Some(Channel::A),
            _ => None,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Component transfer function types.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FunctionType {
    #[default]
    Identity,
    Table,
    Discrete,
    Linear,
    Gamma,
}

impl Parse for FunctionType {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Self, ParseError<'i>> {
        Ok(parse_identifiers!(
            parser,
            "identity" => FunctionType::Identity,
            "table" => FunctionType::Table,
            "discrete" => FunctionType::Discrete,
            "linear" => FunctionType::Linear,
            "gamma" => FunctionType::Gamma,
        )?)
    }
}

/// One `feFuncX` element.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferFunction {
    pub function_type: FunctionType,
    pub table_values: Vec<f64>,
    pub slope: f64,
    pub intercept: f64,
    pub amplitude: f64,
    pub exponent: f64,
    pub offset: f64,
}

impl Default for TransferFunction {
    fn default() -> TransferFunction {
        TransferFunction {
            function_type: FunctionType::Identity,
            table_values: Vec::new(),
            slope: 1.0,
            intercept: 0.0,
            amplitude: 1.0,
            exponent: 1.0,
            offset: 0.0,
        }
    }
}

/// The compute function type.
type Function = fn(&TransferFunction, f64) -> f64;

/// The identity component transfer function.
fn identity(_: &TransferFunction, value: f64) -> f64 {
    value
}

/// The table component transfer function.
fn table(func: &TransferFunction, value: f64) -> f64 {
    let n = func.table_values.len() - 1;
    let k = (value * (n as f64)).floor() as usize;

    let k = min(k, n); // Just in case.

    if k == n {
        return func.table_values[k];
    }

    let vk = func.table_values[k];
    let vk1 = func.table_values[k + 1];
    let k = k as f64;
    let n = n as f64;

    vk + (value - k / n) * n * (vk1 - vk)
}

/// The discrete component transfer function.
fn discrete(func: &TransferFunction, value: f64) -> f64 {
    let n = func.table_values.len();
    let k = (value * (n as f64)).floor() as usize;

    func.table_values[min(k, n - 1)]
}

/// The linear component transfer function.
fn linear(func: &TransferFunction, value: f64) -> f64 {
    func.slope * value + func.intercept
}

/// The gamma component transfer function.
fn gamma(func: &TransferFunction, value: f64) -> f64 {
    func.amplitude * value.powf(func.exponent) + func.offset
}

impl TransferFunction {
    pub fn linear(slope: f64, intercept: f64) -> TransferFunction {
        TransferFunction {
            function_type: FunctionType::Linear,
            slope,
            intercept,
            ..Default::default()
        }
    }

    pub fn table(table_values: Vec<f64>) -> TransferFunction {
        TransferFunction {
            function_type: FunctionType::Table,
            table_values,
            ..Default::default()
        }
    }

    fn set_attributes(&mut self, attrs: &Attributes, session: &Session) {
        for (attr, value) in attrs.iter() {
            match attr {
                "type" => set_attribute(&mut self.function_type, parse_attribute(attr, value), session),
                "tableValues" => {
                    let mut values = CommaSeparatedList::<f64, 0, { usize::MAX }>(
                        self.table_values.clone(),
                    );
                    set_attribute(&mut values, parse_attribute(attr, value), session);
                    self.table_values = values.0;
                }
                "slope" => set_attribute(&mut self.slope, parse_attribute(attr, value), session),
                "intercept" => {
                    set_attribute(&mut self.intercept, parse_attribute(attr, value), session)
                }
                "amplitude" => {
                    set_attribute(&mut self.amplitude, parse_attribute(attr, value), session)
                }
                "exponent" => set_attribute(&mut self.exponent, parse_attribute(attr, value), session),
                "offset" => set_attribute(&mut self.offset, parse_attribute(attr, value), session),
                _ => (),
            }
        }
    }

    /// The function that is actually evaluated; tables without values act as the identity.
    pub fn effective_type(&self) -> FunctionType {
        match self.function_type {
            FunctionType::Table | FunctionType::Discrete if self.table_values.is_empty() => {
                FunctionType::Identity
            }
            t => t,
        }
    }

    fn function(&self) -> Function {
        match self.effective_type() {
            FunctionType::Identity => identity,
            FunctionType::Table => table,
            FunctionType::Discrete => discrete,
            FunctionType::Linear => linear,
            FunctionType::Gamma => gamma,
        }
    }

    /// Evaluates the function for a component value in `[0, 1]`, clamping the result.
    pub fn apply(&self, value: f64) -> f64 {
        (self.function())(self, value).clamp(0.0, 1.0)
    }

    pub fn is_identity(&self) -> bool {
        match self.effective_type() {
            FunctionType::Identity => true,
            FunctionType::Linear => self.slope == 1.0 && self.intercept == 0.0,
            FunctionType::Gamma => {
                self.amplitude == 1.0 && self.exponent == 1.0 && self.offset == 0.0
            }
            FunctionType::Table => self.table_values == [0.0, 1.0],
            FunctionType::Discrete => false,
        }
    }
}

impl ComponentTransfer {
    /// The same function for R, G and B, with alpha left alone.
    pub fn rgb(function: TransferFunction) -> ComponentTransfer {
        ComponentTransfer {
            functions: [
                function.clone(),
                function.clone(),
                function,
                TransferFunction::default(),
            ],
        }
    }

    pub fn function(&self, channel: Channel) -> &TransferFunction {
        &self.functions[channel.index()]
    }

    pub fn is_identity(&self) -> bool {
        self.functions.iter().all(TransferFunction::is_identity)
    }

    /// Whether transparent black pixels get a nonzero alpha.
    pub fn produces_alpha_from_transparent(&self) -> bool {
        self.function(Channel::A).apply(0.0) > 0.0
    }

    pub fn post_filter_extents(&self, extents: &IRegion, subregion: &IRect) -> IRegion {
        if self.produces_alpha_from_transparent() {
            IRegion::from_rect(*subregion)
        } else {
            extents.clone()
        }
    }
}

impl FeComponentTransfer {
    /// Handles an `feFuncX` child; returns false if `name` is not one of them.
    ///
    /// If there are several functions for the same channel, the last one wins.
    pub fn add_function(&mut self, name: &str, attrs: &Attributes, session: &Session) -> bool {
        match Channel::from_element_name(name) {
            Some(channel) => {
                let mut func = TransferFunction::default();
                func.set_attributes(attrs, session);
                self.params.functions[channel.index()] = func;
                true
            }

            None => false,
        }
    }
}

impl FilterEffect for FeComponentTransfer {
    fn set_attributes(&mut self, attrs: &Attributes, session: &Session) {
        self.in1 = self.base.parse_one_input(attrs, session);
    }

    fn primitive(&self) -> &Primitive {
        &self.base
    }

    fn inputs(&self) -> Vec<Input> {
        vec![self.in1.clone()]
    }

    fn build(&self, _ctx: &PrimitiveContext<'_>) -> PrimitiveAttributes {
        PrimitiveAttributes::ComponentTransfer(self.params.clone())
    }
}
