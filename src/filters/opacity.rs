//! Opacity, which has no SVG element of its own; it comes from the `opacity()` filter
//! function.

use crate::region::IRegion;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Opacity {
    pub opacity: f32,
}

impl Default for Opacity {
    fn default() -> Opacity {
        Opacity { opacity: 1.0 }
    }
}

impl Opacity {
    pub fn is_identity(&self) -> bool {
        self.opacity == 1.0
    }

    pub fn post_filter_extents(&self, extents: &IRegion) -> IRegion {
        if self.opacity == 0.0 {
            IRegion::new()
        } else {
            extents.clone()
        }
    }
}
