//! Affine transformations between the filter coordinate spaces.
//!
//! A [`Transform`] maps points with `x' = xx * x + xy * y + x0` and
//! `y' = yx * x + yy * y + y0`.  [`Transform::multiply`] composes two transforms so that
//! the first argument is applied first.

use crate::rect::Rect;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub xx: f64,
    pub yx: f64,
    pub xy: f64,
    pub yy: f64,
    pub x0: f64,
    pub y0: f64,
}

impl Transform {
    #[inline]
    pub fn new_unchecked(xx: f64, yx: f64, xy: f64, yy: f64, x0: f64, y0: f64) -> Self {
        Self {
            xx,
            xy,
            x0,
            yx,
            yy,
            y0,
        }
    }

    #[inline]
    pub fn identity() -> Self {
        Self::new_unchecked(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    #[inline]
    pub fn new_translate(tx: f64, ty: f64) -> Self {
        Self::new_unchecked(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    #[inline]
    pub fn new_scale(sx: f64, sy: f64) -> Self {
        Self::new_unchecked(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Maps the unit square onto `rect`; used for objectBoundingBox units.
    #[inline]
    pub fn from_rect(rect: &Rect) -> Self {
        Self::new_unchecked(rect.width(), 0.0, 0.0, rect.height(), rect.x0, rect.y0)
    }

    #[must_use]
    pub fn multiply(t1: &Transform, t2: &Transform) -> Self {
        Transform {
            xx: t1.xx * t2.xx + t1.yx * t2.xy,
            yx: t1.xx * t2.yx + t1.yx * t2.yy,
            xy: t1.xy * t2.xx + t1.yy * t2.xy,
            yy: t1.xy * t2.yx + t1.yy * t2.yy,
            x0: t1.x0 * t2.xx + t1.y0 * t2.xy + t2.x0,
            y0: t1.x0 * t2.yx + t1.y0 * t2.yy + t2.y0,
        }
    }

    #[inline]
    pub fn pre_transform(&self, t: &Transform) -> Self {
        Self::multiply(t, self)
    }

    #[inline]
    pub fn post_transform(&self, t: &Transform) -> Self {
        Self::multiply(self, t)
    }

    #[inline]
    pub fn pre_scale(&self, sx: f64, sy: f64) -> Self {
        self.pre_transform(&Transform::new_scale(sx, sy))
    }

    #[inline]
    pub fn post_translate(&self, x: f64, y: f64) -> Self {
        self.post_transform(&Transform::new_translate(x, y))
    }

    #[inline]
    fn determinant(&self) -> f64 {
        self.xx * self.yy - self.xy * self.yx
    }

    #[inline]
    pub fn is_invertible(&self) -> bool {
        let det = self.determinant();

        det != 0.0 && det.is_finite()
    }

    #[must_use]
    pub fn invert(&self) -> Option<Self> {
        let det = self.determinant();

        if det == 0.0 || !det.is_finite() {
            return None;
        }

        let inv_det = 1.0 / det;

        Some(Transform::new_unchecked(
            inv_det * self.yy,
            inv_det * (-self.yx),
            inv_det * (-self.xy),
            inv_det * self.xx,
            inv_det * (self.xy * self.y0 - self.yy * self.x0),
            inv_det * (self.yx * self.x0 - self.xx * self.y0),
        ))
    }

    /// Scale factors of the transform along its own axes.
    ///
    /// The x factor is the length of the transformed x axis; the y factor is the area
    /// scale divided by it, so a singular transform always yields a zero y factor.
    pub fn scale_factors(&self) -> (f64, f64) {
        let sx = self.xx.hypot(self.yx);

        if sx == 0.0 || !sx.is_finite() {
            return (0.0, 0.0);
        }

        let sy = self.determinant().abs() / sx;

        (sx, sy)
    }

    #[inline]
    pub fn transform_distance(&self, dx: f64, dy: f64) -> (f64, f64) {
        (dx * self.xx + dy * self.xy, dx * self.yx + dy * self.yy)
    }

    #[inline]
    pub fn transform_point(&self, px: f64, py: f64) -> (f64, f64) {
        let (x, y) = self.transform_distance(px, py);
        (x + self.x0, y + self.y0)
    }

    /// Bounding box of `rect` after transforming its corners.
    pub fn transform_rect(&self, rect: &Rect) -> Rect {
        let corners = [
            self.transform_point(rect.x0, rect.y0),
            self.transform_point(rect.x1, rect.y0),
            self.transform_point(rect.x0, rect.y1),
            self.transform_point(rect.x1, rect.y1),
        ];

        let (x, y) = corners[0];

        corners[1..].iter().fold(Rect::new(x, y, x, y), |r, &(x, y)| {
            Rect::new(r.x0.min(x), r.y0.min(y), r.x1.max(x), r.y1.max(y))
        })
    }
}

impl Default for Transform {
    #[inline]
    fn default() -> Transform {
        Transform::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::ApproxEq;
    use std::f64;

    fn assert_transform_eq(t1: &Transform, t2: &Transform) {
        let epsilon = 8.0 * f64::EPSILON; // kind of arbitrary, but allow for some sloppiness

        assert!(t1.xx.approx_eq(t2.xx, (epsilon, 1)));
        assert!(t1.yx.approx_eq(t2.yx, (epsilon, 1)));
        assert!(t1.xy.approx_eq(t2.xy, (epsilon, 1)));
        assert!(t1.yy.approx_eq(t2.yy, (epsilon, 1)));
        assert!(t1.x0.approx_eq(t2.x0, (epsilon, 1)));
        assert!(t1.y0.approx_eq(t2.y0, (epsilon, 1)));
    }

    #[test]
    fn test_multiply() {
        let t1 = Transform::identity();
        let t2 = Transform::new_unchecked(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        assert_transform_eq(&Transform::multiply(&t1, &t2), &t2);
        assert_transform_eq(&Transform::multiply(&t2, &t1), &t2);

        let t1 = Transform::new_unchecked(0.5, 0.0, 0.0, 0.5, 10.0, 10.0);
        let t2 = Transform::new_unchecked(1.0, 0.0, 0.0, 1.0, -10.0, -10.0);
        let r1 = Transform::new_unchecked(0.5, 0.0, 0.0, 0.5, 0.0, 0.0);
        let r2 = Transform::new_unchecked(0.5, 0.0, 0.0, 0.5, 5.0, 5.0);
        assert_transform_eq(&Transform::multiply(&t1, &t2), &r1);
        assert_transform_eq(&Transform::multiply(&t2, &t1), &r2);
    }

    #[test]
    fn test_invert() {
        let t = Transform::new_unchecked(2.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        assert!(!t.is_invertible());
        assert!(t.invert().is_none());

        let t = Transform::new_unchecked(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        let i = t.invert().unwrap();
        assert_transform_eq(&t.pre_transform(&i), &Transform::identity());
        assert_transform_eq(&t.post_transform(&i), &Transform::identity());
    }

    #[test]
    fn scale_factors_of_scale_and_rotation() {
        assert_eq!(Transform::new_scale(2.0, 3.0).scale_factors(), (2.0, 3.0));
        assert_eq!(Transform::new_scale(-2.0, 3.0).scale_factors(), (2.0, 3.0));

        let (s, c) = (0.5_f64.sin(), 0.5_f64.cos());
        let rotated = Transform::new_unchecked(2.0 * c, 2.0 * s, -2.0 * s, 2.0 * c, 0.0, 0.0);
        let (sx, sy) = rotated.scale_factors();
        assert!(sx.approx_eq(2.0, (1e-12, 2)));
        assert!(sy.approx_eq(2.0, (1e-12, 2)));
    }

    #[test]
    fn singular_transforms_have_zero_scale() {
        assert_eq!(Transform::new_scale(0.0, 1.0).scale_factors(), (0.0, 0.0));
        assert_eq!(Transform::new_scale(1.0, 0.0).scale_factors().1, 0.0);
        assert!(!Transform::new_scale(1.0, 0.0).is_invertible());
    }

    #[test]
    fn transforms_rect() {
        let t = Transform::new_translate(10.0, 10.0).pre_scale(2.0, 1.0);
        let r = t.transform_rect(&Rect::new(0.0, 0.0, 5.0, 5.0));
        assert!(r.approx_eq(&Rect::new(10.0, 10.0, 20.0, 15.0)));
    }
}
