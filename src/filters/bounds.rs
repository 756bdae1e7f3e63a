//! Filter primitive subregion computation.

use crate::rect::{IRect, Rect};

/// A helper type for filter primitive subregion computation.
///
/// All values are in filter space.
#[derive(Debug, Clone, Copy)]
pub struct BoundsBuilder {
    /// The filter region, rounded out to pixels.
    filter_region: IRect,

    /// The current bounding rectangle.
    rect: Option<IRect>,

    /// Whether one of the input nodes is standard input.
    standard_input_was_referenced: bool,

    /// Filter primitive properties.
    x: Option<f64>,
    y: Option<f64>,
    width: Option<f64>,
    height: Option<f64>,
}

impl BoundsBuilder {
    /// Constructs a new `BoundsBuilder`.
    #[inline]
    pub fn new(
        filter_region: IRect,
        x: Option<f64>,
        y: Option<f64>,
        width: Option<f64>,
        height: Option<f64>,
    ) -> Self {
        Self {
            filter_region,
            rect: None,
            standard_input_was_referenced: false,
            x,
            y,
            width,
            height,
        }
    }

    /// Adds a standard input like `SourceGraphic` to the bounding box.
    #[inline]
    pub fn add_standard_input(mut self) -> Self {
        self.standard_input_was_referenced = true;
        self
    }

    /// Adds the subregion of a primitive that is used as input.
    #[inline]
    pub fn add_input(mut self, subregion: &IRect) -> Self {
        // If a standard input was referenced, the default value is the filter effects region
        // regardless of other referenced inputs. This means we can skip computing the bounds.
        if self.standard_input_was_referenced {
            return self;
        }

        self.rect = Some(self.rect.map_or(*subregion, |r| r.union(subregion)));
        self
    }

    /// Returns the final pixel bounds, clipped to the filter region.
    pub fn into_irect(self) -> IRect {
        let filter_region = self.filter_region;

        self.into_rect_without_clipping()
            .to_irect_checked()
            .map(|r| r.intersect(&filter_region))
            .unwrap_or_default()
    }

    /// Returns the final exact bounds without clipping to the filter region.
    pub fn into_rect_without_clipping(self) -> Rect {
        // The default value is the filter region, unless only other primitives were
        // referenced as inputs.
        let mut rect = match self.rect {
            Some(r) if !self.standard_input_was_referenced => Rect::from(r),
            _ => Rect::from(self.filter_region),
        };

        if let Some(x) = self.x {
            let w = rect.width();
            rect.x0 = x;
            rect.x1 = rect.x0 + w;
        }
        if let Some(y) = self.y {
            let h = rect.height();
            rect.y0 = y;
            rect.y1 = rect.y0 + h;
        }
        if let Some(width) = self.width {
            rect.x1 = rect.x0 + width;
        }
        if let Some(height) = self.height {
            rect.y1 = rect.y0 + height;
        }

        rect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGION: IRect = IRect {
        x0: -10,
        y0: -10,
        x1: 110,
        y1: 110,
    };

    fn builder() -> BoundsBuilder {
        BoundsBuilder::new(REGION, None, None, None, None)
    }

    #[test]
    fn defaults_to_filter_region() {
        assert_eq!(builder().into_irect(), REGION);
        assert_eq!(builder().add_standard_input().into_irect(), REGION);
    }

    #[test]
    fn unions_input_subregions() {
        let r = builder()
            .add_input(&IRect::new(0, 0, 10, 10))
            .add_input(&IRect::new(20, 20, 30, 30))
            .into_irect();
        assert_eq!(r, IRect::new(0, 0, 30, 30));
    }

    #[test]
    fn standard_input_wins_over_other_inputs() {
        let r = builder()
            .add_input(&IRect::new(0, 0, 10, 10))
            .add_standard_input()
            .into_irect();
        assert_eq!(r, REGION);
    }

    #[test]
    fn explicit_values_override_edges() {
        let b = BoundsBuilder::new(REGION, Some(5.5), None, Some(10.0), None)
            .add_input(&IRect::new(0, 0, 10, 10));
        assert!(b
            .into_rect_without_clipping()
            .approx_eq(&Rect::new(5.5, 0.0, 15.5, 10.0)));
        assert_eq!(b.into_irect(), IRect::new(5, 0, 16, 10));
    }

    #[test]
    fn clips_to_filter_region() {
        let b = BoundsBuilder::new(REGION, Some(100.0), None, Some(50.0), None);
        assert_eq!(b.into_irect(), IRect::new(100, -10, 110, 110));

        let b = BoundsBuilder::new(REGION, Some(500.0), None, None, None);
        assert!(b.into_irect().is_empty());
    }
}
