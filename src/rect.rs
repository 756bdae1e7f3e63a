//! Types for rectangles.

#[allow(clippy::module_inception)]
mod rect {
    use core::ops::{Add, Sub};
    use float_cmp::approx_eq;
    use num_traits::Zero;

    // Use our own min() and max() that are acceptable for floating point

    fn min<T: PartialOrd>(x: T, y: T) -> T {
        if x <= y {
            x
        } else {
            y
        }
    }

    fn max<T: PartialOrd>(x: T, y: T) -> T {
        if x >= y {
            x
        } else {
            y
        }
    }

    /// Smallest integer coordinate a rectangle edge can have.
    pub const COORD_MIN: i32 = i32::MIN / 2;

    /// Largest integer coordinate a rectangle edge can have.  With both bounds the width
    /// and height of any rectangle still fit in an `i32`.
    pub const COORD_MAX: i32 = i32::MAX / 2;

    /// Addition and subtraction of coordinates when moving or growing a rectangle.
    ///
    /// Integer coordinates saturate to `COORD_MIN..=COORD_MAX`.
    pub trait Coord: Copy {
        fn add_coord(self, d: Self) -> Self;
        fn sub_coord(self, d: Self) -> Self;
    }

    impl Coord for i32 {
        #[inline]
        fn add_coord(self, d: i32) -> i32 {
            self.saturating_add(d).clamp(COORD_MIN, COORD_MAX)
        }

        #[inline]
        fn sub_coord(self, d: i32) -> i32 {
            self.saturating_sub(d).clamp(COORD_MIN, COORD_MAX)
        }
    }

    impl Coord for f64 {
        #[inline]
        fn add_coord(self, d: f64) -> f64 {
            self + d
        }

        #[inline]
        fn sub_coord(self, d: f64) -> f64 {
            self - d
        }
    }

    /// Converts a float coordinate to an integer one, saturating to
    /// `COORD_MIN..=COORD_MAX`.  NaN becomes 0.
    #[inline]
    pub fn coord_from_f64(v: f64) -> i32 {
        v.clamp(f64::from(COORD_MIN), f64::from(COORD_MAX)) as i32
    }

    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Rect<T> {
        pub x0: T,
        pub y0: T,
        pub x1: T,
        pub y1: T,
    }

    impl<T> Rect<T> {
        #[inline]
        pub fn new(x0: T, y0: T, x1: T, y1: T) -> Self {
            Self { x0, y0, x1, y1 }
        }
    }

    impl<T> Rect<T>
    where
        T: Copy + PartialOrd + PartialEq + Add<T, Output = T> + Sub<T, Output = T> + Zero + Coord,
    {
        #[inline]
        pub fn from_size(w: T, h: T) -> Self {
            Self {
                x0: Zero::zero(),
                y0: Zero::zero(),
                x1: w,
                y1: h,
            }
        }

        /// Creates a rectangle from its origin and size, like `x, y, width, height`.
        #[inline]
        pub fn from_xywh(x: T, y: T, w: T, h: T) -> Self {
            Self {
                x0: x,
                y0: y,
                x1: x.add_coord(w),
                y1: y.add_coord(h),
            }
        }

        #[inline]
        pub fn width(&self) -> T {
            self.x1 - self.x0
        }

        #[inline]
        pub fn height(&self) -> T {
            self.y1 - self.y0
        }

        #[inline]
        pub fn size(&self) -> (T, T) {
            (self.width(), self.height())
        }

        /// Whether the rectangle covers no area at all.
        ///
        /// Rectangles with inverted edges are considered empty.
        #[inline]
        pub fn is_degenerate(&self) -> bool {
            !(self.x1 > self.x0 && self.y1 > self.y0)
        }

        #[inline]
        pub fn contains(self, x: T, y: T) -> bool {
            x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
        }

        /// Whether `rect` lies completely inside `self`.  Empty rectangles are contained
        /// in everything.
        #[inline]
        pub fn contains_rect(&self, rect: &Self) -> bool {
            rect.is_degenerate()
                || (rect.x0 >= self.x0
                    && rect.y0 >= self.y0
                    && rect.x1 <= self.x1
                    && rect.y1 <= self.y1)
        }

        #[inline]
        pub fn translate(&self, by: (T, T)) -> Self {
            Self {
                x0: self.x0.add_coord(by.0),
                y0: self.y0.add_coord(by.1),
                x1: self.x1.add_coord(by.0),
                y1: self.y1.add_coord(by.1),
            }
        }

        /// Grows the rectangle by `dx` on the left and right sides, and by `dy` on the top
        /// and bottom.
        #[inline]
        pub fn inflate(&self, dx: T, dy: T) -> Self {
            Self {
                x0: self.x0.sub_coord(dx),
                y0: self.y0.sub_coord(dy),
                x1: self.x1.add_coord(dx),
                y1: self.y1.add_coord(dy),
            }
        }

        /// Grows each side independently, in `(top, right, bottom, left)` order.
        #[inline]
        pub fn inflate_sides(&self, top: T, right: T, bottom: T, left: T) -> Self {
            Self {
                x0: self.x0.sub_coord(left),
                y0: self.y0.sub_coord(top),
                x1: self.x1.add_coord(right),
                y1: self.y1.add_coord(bottom),
            }
        }

        #[inline]
        pub fn intersection(&self, rect: &Self) -> Option<Self> {
            let (x0, y0, x1, y1) = (
                max(self.x0, rect.x0),
                max(self.y0, rect.y0),
                min(self.x1, rect.x1),
                min(self.y1, rect.y1),
            );

            if x1 > x0 && y1 > y0 {
                Some(Self { x0, y0, x1, y1 })
            } else {
                None
            }
        }

        /// Like [`Rect::intersection`], but returns an empty rectangle when there is no
        /// overlap.
        #[inline]
        pub fn intersect(&self, rect: &Self) -> Self {
            self.intersection(rect).unwrap_or_else(Self::default_zero)
        }

        #[inline]
        pub fn union(&self, rect: &Self) -> Self {
            Self {
                x0: min(self.x0, rect.x0),
                y0: min(self.y0, rect.y0),
                x1: max(self.x1, rect.x1),
                y1: max(self.y1, rect.y1),
            }
        }

        /// Union that ignores empty operands, so that an empty rectangle at the origin
        /// does not stretch the result.
        #[inline]
        pub fn union_nonempty(&self, rect: &Self) -> Self {
            match (self.is_degenerate(), rect.is_degenerate()) {
                (true, true) => Self::default_zero(),
                (true, false) => *rect,
                (false, true) => *self,
                (false, false) => self.union(rect),
            }
        }

        #[inline]
        fn default_zero() -> Self {
            Self::from_size(Zero::zero(), Zero::zero())
        }
    }

    impl Rect<i32> {
        #[inline]
        pub fn is_empty(&self) -> bool {
            self.width() <= 0 || self.height() <= 0
        }

        #[inline]
        pub fn scale(self, x: f64, y: f64) -> Self {
            Self {
                x0: coord_from_f64((f64::from(self.x0) * x).floor()),
                y0: coord_from_f64((f64::from(self.y0) * y).floor()),
                x1: coord_from_f64((f64::from(self.x1) * x).ceil()),
                y1: coord_from_f64((f64::from(self.y1) * y).ceil()),
            }
        }

        /// Pixel area, computed without overflow.
        #[inline]
        pub fn area(&self) -> i64 {
            if self.is_empty() {
                0
            } else {
                i64::from(self.width()) * i64::from(self.height())
            }
        }
    }

    impl Rect<f64> {
        #[inline]
        pub fn is_empty(&self) -> bool {
            approx_eq!(f64, self.width(), 0.0)
                || approx_eq!(f64, self.height(), 0.0)
                || self.is_degenerate()
        }

        #[inline]
        pub fn scale(self, x: f64, y: f64) -> Self {
            Self {
                x0: self.x0 * x,
                y0: self.y0 * y,
                x1: self.x1 * x,
                y1: self.y1 * y,
            }
        }

        /// Snaps the edges outward to the integer grid.
        #[inline]
        pub fn round_out(&self) -> Self {
            Self {
                x0: self.x0.floor(),
                y0: self.y0.floor(),
                x1: self.x1.ceil(),
                y1: self.y1.ceil(),
            }
        }

        pub fn approx_eq(&self, other: &Self) -> bool {
            approx_eq!(f64, self.x0, other.x0, epsilon = 0.0001)
                && approx_eq!(f64, self.y0, other.y0, epsilon = 0.0001)
                && approx_eq!(f64, self.x1, other.x1, epsilon = 0.0001)
                && approx_eq!(f64, self.y1, other.y1, epsilon = 0.0001)
        }
    }
}

/// Rectangle over any coordinate type; prefer the [`Rect`] and [`IRect`] aliases.
pub type GenericRect<T> = rect::Rect<T>;

pub use rect::{coord_from_f64, Coord, COORD_MAX, COORD_MIN};

pub type Rect = rect::Rect<f64>;

pub type IRect = rect::Rect<i32>;

impl From<Rect> for IRect {
    #[inline]
    fn from(r: Rect) -> Self {
        Self {
            x0: rect::coord_from_f64(r.x0.floor()),
            y0: rect::coord_from_f64(r.y0.floor()),
            x1: rect::coord_from_f64(r.x1.ceil()),
            y1: rect::coord_from_f64(r.y1.ceil()),
        }
    }
}

impl From<IRect> for Rect {
    #[inline]
    fn from(r: IRect) -> Self {
        Self {
            x0: f64::from(r.x0),
            y0: f64::from(r.y0),
            x1: f64::from(r.x1),
            y1: f64::from(r.y1),
        }
    }
}

impl Rect {
    /// Rounds the rectangle out to integers, or returns `None` if any edge does not fit
    /// in `COORD_MIN..=COORD_MAX`.
    pub fn to_irect_checked(&self) -> Option<IRect> {
        let r = self.round_out();

        let coord = |v: f64| {
            cast::i32(v)
                .ok()
                .filter(|c| (COORD_MIN..=COORD_MAX).contains(c))
        };

        Some(IRect::new(coord(r.x0)?, coord(r.y0)?, coord(r.x1)?, coord(r.y1)?))
    }
}

impl IRect {
    /// A rectangle large enough to mean "everything", which still leaves room to inflate
    /// or translate it without overflowing.
    pub const fn max_rect() -> IRect {
        IRect {
            x0: COORD_MIN,
            y0: COORD_MIN,
            x1: COORD_MAX,
            y1: COORD_MAX,
        }
    }

    /// Returns the parts of `self` that are not covered by `other`, as up to four
    /// non-overlapping rectangles.
    pub fn subtract(&self, other: &IRect) -> Vec<IRect> {
        let Some(overlap) = self.intersection(other) else {
            return if self.is_empty() { vec![] } else { vec![*self] };
        };

        let mut pieces = Vec::with_capacity(4);

        if overlap.y0 > self.y0 {
            pieces.push(IRect::new(self.x0, self.y0, self.x1, overlap.y0));
        }

        if overlap.y1 < self.y1 {
            pieces.push(IRect::new(self.x0, overlap.y1, self.x1, self.y1));
        }

        if overlap.x0 > self.x0 {
            pieces.push(IRect::new(self.x0, overlap.y0, overlap.x0, overlap.y1));
        }

        if overlap.x1 < self.x1 {
            pieces.push(IRect::new(overlap.x1, overlap.y0, self.x1, overlap.y1));
        }

        pieces
    }
}
