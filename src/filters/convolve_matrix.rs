use cssparser::Parser;
use nalgebra::DMatrix;

use crate::attributes::Attributes;
use crate::error::*;
use crate::parse_identifiers;
use crate::parsers::{
    parse_attribute, set_attribute, CommaSeparatedList, NonNegative, NumberOptionalNumber, Parse,
};
use crate::rect::{coord_from_f64, IRect};
use crate::region::IRegion;
use crate::session::Session;

use super::context::PrimitiveContext;
use super::{FilterEffect, Input, Primitive, PrimitiveAttributes};

/// How pixels outside of the input are sampled.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum EdgeMode {
    #[default]
    Duplicate,
    Wrap,
    None,
}

impl Parse for EdgeMode {
    fn parse<'i>(parser: &mut Parser<'i, '_>) -> Result<Self, ParseError<'i>> {
        Ok(parse_identifiers!(
            parser,
            "duplicate" => EdgeMode::Duplicate,
            "wrap" => EdgeMode::Wrap,
            "none" => EdgeMode::None,
        )?)
    }
}

/// The `feConvolveMatrix` filter primitive.
#[derive(Debug, Clone)]
pub struct FeConvolveMatrix {
    base: Primitive,
    in1: Input,
    order: NumberOptionalNumber<i32>,
    kernel_matrix: Option<Vec<f64>>,
    divisor: Option<f64>,
    bias: f64,
    target_x: Option<u32>,
    target_y: Option<u32>,
    edge_mode: EdgeMode,
    kernel_unit_length: Option<(f64, f64)>,
    preserve_alpha: bool,
}

impl Default for FeConvolveMatrix {
    fn default() -> FeConvolveMatrix {
        FeConvolveMatrix {
            base: Default::default(),
            in1: Default::default(),
            order: NumberOptionalNumber(3, 3),
            kernel_matrix: None,
            divisor: None,
            bias: 0.0,
            target_x: None,
            target_y: None,
            edge_mode: Default::default(),
            kernel_unit_length: None,
            preserve_alpha: false,
        }
    }
}

/// Resolved `feConvolveMatrix` primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvolveMatrix {
    /// Number of columns and rows of the kernel.
    pub order: (u32, u32),

    /// The kernel, with `order.1` rows and `order.0` columns.
    pub kernel_matrix: DMatrix<f64>,

    pub divisor: f64,
    pub bias: f64,

    /// Position of the output pixel within the kernel.
    pub target: (u32, u32),

    pub edge_mode: EdgeMode,

    /// Distance between kernel cells, in filter-space pixels.
    pub kernel_unit_length: (f64, f64),

    pub preserve_alpha: bool,
}

impl FilterEffect for FeConvolveMatrix {
    fn set_attributes(&mut self, attrs: &Attributes, session: &Session) {
        self.in1 = self.base.parse_one_input(attrs, session);

        for (attr, value) in attrs.iter() {
            match attr {
                "order" => set_attribute(&mut self.order, parse_attribute(attr, value), session),
                "divisor" => {
                    set_attribute(&mut self.divisor, parse_attribute(attr, value), session)
                }
                "bias" => set_attribute(&mut self.bias, parse_attribute(attr, value), session),
                "targetX" => {
                    set_attribute(&mut self.target_x, parse_attribute(attr, value), session)
                }
                "targetY" => {
                    set_attribute(&mut self.target_y, parse_attribute(attr, value), session)
                }
                "edgeMode" => {
                    set_attribute(&mut self.edge_mode, parse_attribute(attr, value), session)
                }
                "kernelUnitLength" => {
                    let parsed = parse_attribute(attr, value).map(
                        |NumberOptionalNumber(NonNegative(x), NonNegative(y))| Some((x, y)),
                    );
                    set_attribute(&mut self.kernel_unit_length, parsed, session);
                }
                "preserveAlpha" => {
                    set_attribute(&mut self.preserve_alpha, parse_attribute(attr, value), session)
                }
                "kernelMatrix" => {
                    // Limit the list to 400 (20x20) values so that huge lists do not cause
                    // huge allocations.
                    let parsed = parse_attribute::<CommaSeparatedList<f64, 0, 400>>(attr, value)
                        .map(|CommaSeparatedList(v)| Some(v));
                    set_attribute(&mut self.kernel_matrix, parsed, session);
                }
                _ => (),
            }
        }
    }

    fn primitive(&self) -> &Primitive {
        &self.base
    }

    fn inputs(&self) -> Vec<Input> {
        vec![self.in1.clone()]
    }

    fn build(&self, ctx: &PrimitiveContext<'_>) -> PrimitiveAttributes {
        match self.resolve(ctx) {
            Some(params) => PrimitiveAttributes::ConvolveMatrix(params),
            None => PrimitiveAttributes::Empty,
        }
    }
}

impl FeConvolveMatrix {
    /// Validates the parameters; `None` disables the primitive.
    fn resolve(&self, ctx: &PrimitiveContext<'_>) -> Option<ConvolveMatrix> {
        let session = ctx.session();

        let NumberOptionalNumber(order_x, order_y) = self.order;
        if order_x <= 0 || order_y <= 0 {
            fegraph_log!(session, "(feConvolveMatrix order must be positive)");
            return None;
        }
        let (order_x, order_y) = (order_x as u32, order_y as u32);

        let values = match self.kernel_matrix {
            Some(ref v) if v.len() == (order_x as usize) * (order_y as usize) => v.clone(),
            _ => {
                fegraph_log!(
                    session,
                    "(feConvolveMatrix kernelMatrix must have {} elements)",
                    order_x * order_y
                );
                return None;
            }
        };

        let target_x = self.target_x.unwrap_or(order_x / 2);
        let target_y = self.target_y.unwrap_or(order_y / 2);
        if target_x >= order_x || target_y >= order_y {
            fegraph_log!(session, "(feConvolveMatrix target is outside the kernel)");
            return None;
        }

        let divisor = match self.divisor {
            Some(d) if d == 0.0 => return None,
            Some(d) => d,
            None => match values.iter().sum::<f64>() {
                s if s == 0.0 => 1.0,
                s => s,
            },
        };

        let kernel_unit_length = match self.kernel_unit_length {
            Some((x, y)) if x <= 0.0 || y <= 0.0 => return None,
            Some(kul) => ctx.number_pair(kul),
            None => (1.0, 1.0),
        };

        // kernelMatrix lists the kernel row by row.
        let kernel_matrix = DMatrix::from_row_slice(order_y as usize, order_x as usize, &values);

        Some(ConvolveMatrix {
            order: (order_x, order_y),
            kernel_matrix,
            divisor,
            bias: self.bias,
            target: (target_x, target_y),
            edge_mode: self.edge_mode,
            kernel_unit_length,
            preserve_alpha: self.preserve_alpha,
        })
    }
}

impl ConvolveMatrix {
    /// How far the kernel reaches from an output pixel towards `(top, right, bottom, left)`.
    fn kernel_reach(&self) -> (i32, i32, i32, i32) {
        let (kx, ky) = self.kernel_unit_length;
        let (tx, ty) = (f64::from(self.target.0), f64::from(self.target.1));
        let (ox, oy) = (f64::from(self.order.0), f64::from(self.order.1));

        let top = coord_from_f64((ty * ky).ceil());
        let right = coord_from_f64(((ox - 1.0 - tx) * kx).ceil());
        let bottom = coord_from_f64(((oy - 1.0 - ty) * ky).ceil());
        let left = coord_from_f64((tx * kx).ceil());

        (top, right, bottom, left)
    }

    pub fn needed_input_region(&self, region: &IRegion) -> IRegion {
        if self.edge_mode != EdgeMode::None {
            // Edge pixels get replicated or wrapped around.
            return IRegion::from_rect(IRect::max_rect());
        }

        let (top, right, bottom, left) = self.kernel_reach();
        region.inflate_sides(top, right, bottom, left)
    }

    pub fn result_change_region(&self, change: &IRegion, subregion: &IRect) -> IRegion {
        if self.edge_mode != EdgeMode::None {
            return IRegion::from_rect(*subregion);
        }

        let (top, right, bottom, left) = self.kernel_reach();
        change.inflate_sides(bottom, left, top, right)
    }

    pub fn post_filter_extents(&self, extents: &IRegion, subregion: &IRect) -> IRegion {
        if self.bias > 0.0 {
            return IRegion::from_rect(*subregion);
        }

        self.result_change_region(extents, subregion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convolve(edge_mode: EdgeMode, order: (u32, u32), target: (u32, u32)) -> ConvolveMatrix {
        let n = (order.0 * order.1) as usize;

        ConvolveMatrix {
            order,
            kernel_matrix: DMatrix::from_element(order.1 as usize, order.0 as usize, 1.0),
            divisor: n as f64,
            bias: 0.0,
            target,
            edge_mode,
            kernel_unit_length: (1.0, 1.0),
            preserve_alpha: false,
        }
    }

    #[test]
    fn edge_mode_none_reaches_around_target() {
        let c = convolve(EdgeMode::None, (3, 3), (0, 0));
        let r = IRegion::from_rect(IRect::new(10, 10, 20, 20));

        assert_eq!(
            c.needed_input_region(&r).bounds(),
            IRect::new(10, 10, 22, 22)
        );
        assert_eq!(
            c.result_change_region(&r, &IRect::max_rect()).bounds(),
            IRect::new(8, 8, 20, 20)
        );
    }

    #[test]
    fn other_edge_modes_need_everything() {
        let c = convolve(EdgeMode::Duplicate, (3, 3), (1, 1));
        let r = IRegion::from_rect(IRect::new(10, 10, 20, 20));
        let s = IRect::new(0, 0, 100, 100);

        assert_eq!(c.needed_input_region(&r).bounds(), IRect::max_rect());
        assert_eq!(c.result_change_region(&r, &s).bounds(), s);
    }

    #[test]
    fn parses_edge_mode() {
        assert_eq!(EdgeMode::parse_str("wrap").unwrap(), EdgeMode::Wrap);
        assert!(EdgeMode::parse_str("mirror").is_err());
    }
}
