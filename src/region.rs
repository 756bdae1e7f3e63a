//! Regions made of several rectangles.
//!
//! Needed and dirty areas are tracked as regions rather than single rectangles so that
//! two far-apart changes do not force everything in between to be recomputed.

use core::ops::{Add, Sub};
use num_traits::Zero;

use crate::rect::{Coord, GenericRect as GRect, IRect, Rect};

/// A union of rectangles.  The rectangles may overlap; empty ones are never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region<T> {
    rects: Vec<GRect<T>>,
}

pub type IRegion = Region<i32>;
pub type FRegion = Region<f64>;

impl<T> Default for Region<T> {
    fn default() -> Self {
        Region { rects: Vec::new() }
    }
}

impl<T> Region<T>
where
    T: Copy + PartialOrd + PartialEq + Add<T, Output = T> + Sub<T, Output = T> + Zero + Coord,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rect(r: GRect<T>) -> Self {
        let mut region = Self::new();
        region.add_rect(r);
        region
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn rects(&self) -> &[GRect<T>] {
        &self.rects
    }

    /// Adds a rectangle, dropping it if it is empty or already covered by a single
    /// rectangle of the region, and dropping existing rectangles that it covers.
    pub fn add_rect(&mut self, r: GRect<T>) {
        if r.is_degenerate() || self.rects.iter().any(|e| e.contains_rect(&r)) {
            return;
        }

        self.rects.retain(|e| !r.contains_rect(e));
        self.rects.push(r);
    }

    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut res = self.clone();
        for r in &other.rects {
            res.add_rect(*r);
        }
        res
    }

    #[must_use]
    pub fn union_rect(&self, r: &GRect<T>) -> Self {
        let mut res = self.clone();
        res.add_rect(*r);
        res
    }

    #[must_use]
    pub fn intersect_rect(&self, clip: &GRect<T>) -> Self {
        let mut res = Self::new();
        for r in self.rects.iter().filter_map(|r| r.intersection(clip)) {
            res.add_rect(r);
        }
        res
    }

    /// Intersection with another region.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Self {
        let mut res = Self::new();
        for a in &self.rects {
            for r in other.rects.iter().filter_map(|b| a.intersection(b)) {
                res.add_rect(r);
            }
        }
        res
    }

    #[must_use]
    pub fn translate(&self, by: (T, T)) -> Self {
        let mut res = Self::new();
        for r in &self.rects {
            res.add_rect(r.translate(by));
        }
        res
    }

    #[must_use]
    pub fn inflate(&self, dx: T, dy: T) -> Self {
        self.inflate_sides(dy, dx, dy, dx)
    }

    /// Grows every rectangle, in `(top, right, bottom, left)` order.
    #[must_use]
    pub fn inflate_sides(&self, top: T, right: T, bottom: T, left: T) -> Self {
        let mut res = Self::new();
        for r in &self.rects {
            res.add_rect(r.inflate_sides(top, right, bottom, left));
        }
        res
    }

    /// Smallest rectangle that contains the whole region; an empty rectangle if the region
    /// is empty.
    pub fn bounds(&self) -> GRect<T> {
        let mut iter = self.rects.iter();

        match iter.next() {
            None => GRect::from_size(Zero::zero(), Zero::zero()),
            Some(first) => iter.fold(*first, |acc, r| acc.union(r)),
        }
    }

    pub fn map<U, F>(&self, f: F) -> Region<U>
    where
        U: Copy + PartialOrd + PartialEq + Add<U, Output = U> + Sub<U, Output = U> + Zero + Coord,
        F: Fn(&GRect<T>) -> GRect<U>,
    {
        let mut res = Region::new();
        for r in &self.rects {
            res.add_rect(f(r));
        }
        res
    }
}

impl<T> From<GRect<T>> for Region<T>
where
    T: Copy + PartialOrd + PartialEq + Add<T, Output = T> + Sub<T, Output = T> + Zero + Coord,
{
    fn from(r: GRect<T>) -> Self {
        Region::from_rect(r)
    }
}

impl IRegion {
    /// Whether every pixel of `rect` is covered by the region.
    pub fn contains_rect(&self, rect: &IRect) -> bool {
        let mut uncovered = vec![*rect];

        for r in &self.rects {
            uncovered = uncovered.iter().flat_map(|u| u.subtract(r)).collect();
            if uncovered.is_empty() {
                return true;
            }
        }

        uncovered.iter().all(IRect::is_empty)
    }

    /// Whether every pixel of `other` is covered by this region.
    pub fn contains_region(&self, other: &IRegion) -> bool {
        other.rects.iter().all(|r| self.contains_rect(r))
    }
}

impl From<&IRegion> for FRegion {
    fn from(r: &IRegion) -> Self {
        r.map(|r| Rect::from(*r))
    }
}
