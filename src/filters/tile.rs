use crate::attributes::Attributes;
use crate::rect::IRect;
use crate::region::IRegion;
use crate::session::Session;

use super::context::PrimitiveContext;
use super::{FilterEffect, Input, Primitive, PrimitiveAttributes};

/// The `feTile` filter primitive.
#[derive(Debug, Default, Clone)]
pub struct FeTile {
    base: Primitive,
    in1: Input,
}

/// Resolved `feTile` primitive.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Tile {
    /// The tile, which is the subregion of the input, in filter space.
    pub source_rect: IRect,
}

impl FilterEffect for FeTile {
    fn set_attributes(&mut self, attrs: &Attributes, session: &Session) {
        self.in1 = self.base.parse_one_input(attrs, session);
    }

    fn primitive(&self) -> &Primitive {
        &self.base
    }

    fn inputs(&self) -> Vec<Input> {
        vec![self.in1.clone()]
    }

    fn operates_on_srgb(&self, _input_index: usize, input_is_srgb: bool) -> bool {
        input_is_srgb
    }

    fn build(&self, ctx: &PrimitiveContext<'_>) -> PrimitiveAttributes {
        PrimitiveAttributes::Tile(Tile {
            source_rect: ctx.input_subregion(0),
        })
    }
}

impl Tile {
    /// Any input pixel may be replicated anywhere, so the whole tile is needed.
    pub fn needed_input_region(&self, _region: &IRegion) -> IRegion {
        IRegion::from_rect(IRect::max_rect())
    }

    pub fn result_change_region(&self, change: &IRegion, subregion: &IRect) -> IRegion {
        if change.is_empty() {
            IRegion::new()
        } else {
            IRegion::from_rect(*subregion)
        }
    }

    pub fn post_filter_extents(&self, extents: &IRegion, subregion: &IRect) -> IRegion {
        self.result_change_region(extents, subregion)
    }
}
