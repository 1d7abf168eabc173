//! Planar vector math and regular-polygon helpers used by the layout engine.
//!
//! Coordinates follow screen conventions: `x` grows to the right and `y`
//! grows downwards, so a positive [`Vector2::angle`] turns clockwise on
//! screen.

use std::f64::consts::PI;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

/// A 2D point or direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing in direction `angle` (radians).
    pub fn from_angle(angle: f64) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    pub fn length(self) -> f64 {
        self.length_sq().sqrt()
    }

    pub fn length_sq(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn distance(self, other: Vector2) -> f64 {
        (self - other).length()
    }

    pub fn distance_sq(self, other: Vector2) -> f64 {
        (self - other).length_sq()
    }

    /// Angle of the vector measured from the positive x axis.
    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    /// Returns the unit vector in the same direction.
    ///
    /// A zero-length vector stays zero; callers that need a direction must
    /// handle that case themselves (see [`nudge`]).
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len == 0.0 {
            self
        } else {
            self / len
        }
    }

    pub fn rotated(self, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }

    /// Rotates this point by `angle` around `center`.
    pub fn rotated_around(self, angle: f64, center: Vector2) -> Self {
        (self - center).rotated(angle) + center
    }

    /// Rotates this point by `angle` around `center` in whichever direction
    /// moves it further from `away`.
    pub fn rotated_away_from(self, away: Vector2, center: Vector2, angle: f64) -> Self {
        self.rotated_around(self.rotate_away_from_angle(away, center, angle), center)
    }

    /// The signed angle (`angle` or `-angle`) that rotates this point around
    /// `center` further away from `away`.
    pub fn rotate_away_from_angle(self, away: Vector2, center: Vector2, angle: f64) -> f64 {
        let a = self.rotated_around(angle, center).distance_sq(away);
        let b = self.rotated_around(-angle, center).distance_sq(away);
        if b < a {
            angle
        } else {
            -angle
        }
    }

    /// Signed side of this point relative to the directed line `a -> b`.
    pub fn which_side(self, a: Vector2, b: Vector2) -> f64 {
        (self.x - a.x) * (b.y - a.y) - (self.y - a.y) * (b.x - a.x)
    }

    /// Whether this point and `reference` lie on the same side of the line
    /// through `a` and `b`.
    pub fn same_side_as(self, a: Vector2, b: Vector2, reference: Vector2) -> bool {
        let d = self.which_side(a, b);
        let d_ref = reference.which_side(a, b);
        (d < 0.0 && d_ref < 0.0) || (d == 0.0 && d_ref == 0.0) || (d > 0.0 && d_ref > 0.0)
    }

    /// `-1` when `other` lies clockwise of `self` (screen coordinates),
    /// `1` when counterclockwise and `0` when collinear.
    pub fn clockwise(self, other: Vector2) -> i8 {
        let a = self.y * other.x;
        let b = self.x * other.y;
        if a > b {
            -1
        } else if a == b {
            0
        } else {
            1
        }
    }

    pub fn cross(self, other: Vector2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn midpoint(a: Vector2, b: Vector2) -> Vector2 {
        (a + b) / 2.0
    }

    /// The two (non-normalised) normals of the segment `a -> b`.
    pub fn normals(a: Vector2, b: Vector2) -> [Vector2; 2] {
        let delta = b - a;
        [Vector2::new(-delta.y, delta.x), Vector2::new(delta.y, -delta.x)]
    }

    /// The two unit normals of the segment `a -> b`.
    pub fn unit_normals(a: Vector2, b: Vector2) -> [Vector2; 2] {
        let [n0, n1] = Self::normals(a, b);
        [n0.normalized(), n1.normalized()]
    }

    /// Angle at `vertex` between the rays towards `a` and `b`.
    pub fn three_point_angle(vertex: Vector2, a: Vector2, b: Vector2) -> f64 {
        let u = a - vertex;
        let v = b - vertex;
        let denom = u.length() * v.length();
        if denom == 0.0 {
            return 0.0;
        }
        ((u.x * v.x + u.y * v.y) / denom).clamp(-1.0, 1.0).acos()
    }

    /// Mirror image of this point across the line through `a` and `b`.
    pub fn reflected_across(self, a: Vector2, b: Vector2) -> Vector2 {
        let dir = (b - a).normalized();
        if dir == Vector2::ZERO {
            return self;
        }
        let rel = self - a;
        let along = dir * (rel.x * dir.x + rel.y * dir.y);
        a + along * 2.0 - rel
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vector2 {
    type Output = Vector2;
    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, rhs: Vector2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vector2 {
    type Output = Vector2;
    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vector2 {
    fn sub_assign(&mut self, rhs: Vector2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f64> for Vector2 {
    type Output = Vector2;
    fn mul(self, rhs: f64) -> Vector2 {
        Vector2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Vector2 {
    type Output = Vector2;
    fn div(self, rhs: f64) -> Vector2 {
        Vector2::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vector2 {
    type Output = Vector2;
    fn neg(self) -> Vector2 {
        Vector2::new(-self.x, -self.y)
    }
}

/// A segment between two points, tagged with the element symbols at its
/// ends so a renderer can colour each half.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub from: Vector2,
    pub to: Vector2,
    pub element_from: String,
    pub element_to: String,
}

impl Line {
    pub fn new(from: Vector2, to: Vector2, element_from: &str, element_to: &str) -> Self {
        Self {
            from,
            to,
            element_from: element_from.to_owned(),
            element_to: element_to.to_owned(),
        }
    }

    pub fn length(&self) -> f64 {
        self.from.distance(self.to)
    }

    /// Pulls both ends towards each other so the segment loses `by` in total.
    pub fn shorten(&mut self, by: f64) {
        let len = self.length();
        if len == 0.0 {
            return;
        }
        let f = by / len / 2.0;
        let delta = self.to - self.from;
        self.from += delta * f;
        self.to -= delta * f;
    }

    pub fn translated(&self, offset: Vector2) -> Line {
        Line {
            from: self.from + offset,
            to: self.to + offset,
            element_from: self.element_from.clone(),
            element_to: self.element_to.clone(),
        }
    }
}

pub fn to_rad(deg: f64) -> f64 {
    deg * PI / 180.0
}

pub fn to_deg(rad: f64) -> f64 {
    rad * 180.0 / PI
}

/// Circumradius of a regular `n`-gon with side length `side`.
pub fn poly_circumradius(side: f64, n: usize) -> f64 {
    side / (2.0 * (PI / n as f64).sin())
}

/// Apothem of a regular `n`-gon with circumradius `r`.
pub fn apothem(r: f64, n: usize) -> f64 {
    r * (PI / n as f64).cos()
}

pub fn apothem_from_side_length(side: f64, n: usize) -> f64 {
    apothem(poly_circumradius(side, n), n)
}

/// Angle subtended at the center by one side of a regular `n`-gon.
pub fn central_angle(n: usize) -> f64 {
    2.0 * PI / n as f64
}

/// Interior angle of a regular `n`-gon.
pub fn inner_angle(n: usize) -> f64 {
    (n as f64 - 2.0) * PI / n as f64
}

/// Circular mean of a set of angles.
pub fn mean_angle(angles: &[f64]) -> f64 {
    if angles.is_empty() {
        return 0.0;
    }
    let n = angles.len() as f64;
    let sin: f64 = angles.iter().map(|a| a.sin()).sum();
    let cos: f64 = angles.iter().map(|a| a.cos()).sum();
    (sin / n).atan2(cos / n)
}

/// A small, deterministic displacement used to break up coincident points.
///
/// Layout must be reproducible for identical input, so the "random" kick is
/// derived from the index of the thing being nudged (golden-angle spiral).
pub fn nudge(seed: usize, scale: f64) -> Vector2 {
    const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;
    Vector2::from_angle(seed as f64 * GOLDEN_ANGLE + 0.5) * (scale * 0.01)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn hexagon_circumradius_equals_side() {
        assert!(close(poly_circumradius(15.0, 6), 15.0));
    }

    #[test]
    fn square_apothem_is_half_side() {
        assert!(close(apothem_from_side_length(2.0, 4), 1.0));
    }

    #[test]
    fn central_and_inner_angles() {
        assert!(close(central_angle(6), to_rad(60.0)));
        assert!(close(inner_angle(6), to_rad(120.0)));
        assert!(close(inner_angle(5), to_rad(108.0)));
    }

    #[test]
    fn rotate_around_center() {
        let p = Vector2::new(2.0, 1.0).rotated_around(PI, Vector2::new(1.0, 1.0));
        assert!(close(p.x, 0.0));
        assert!(close(p.y, 1.0));
    }

    #[test]
    fn rotate_away_moves_further() {
        let center = Vector2::ZERO;
        let p = Vector2::new(1.0, 0.0);
        let away = Vector2::new(0.0, 1.0);
        let rotated = p.rotated_away_from(away, center, to_rad(20.0));
        assert!(rotated.distance(away) > p.distance(away));
    }

    #[test]
    fn same_side() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(1.0, 0.0);
        assert!(Vector2::new(0.5, 1.0).same_side_as(a, b, Vector2::new(3.0, 2.0)));
        assert!(!Vector2::new(0.5, 1.0).same_side_as(a, b, Vector2::new(3.0, -2.0)));
    }

    #[test]
    fn reflection_across_axis() {
        let p = Vector2::new(1.0, 1.0).reflected_across(Vector2::ZERO, Vector2::new(1.0, 0.0));
        assert!(close(p.x, 1.0));
        assert!(close(p.y, -1.0));
    }

    #[test]
    fn shorten_line_symmetrically() {
        let mut line = Line::new(Vector2::ZERO, Vector2::new(10.0, 0.0), "C", "C");
        line.shorten(2.0);
        assert!(close(line.from.x, 1.0));
        assert!(close(line.to.x, 9.0));
    }

    #[test]
    fn mean_angle_wraps() {
        let m = mean_angle(&[to_rad(170.0), to_rad(-170.0)]);
        assert!(close(m.abs(), PI));
    }

    #[test]
    fn nudge_is_small_and_deterministic() {
        assert_eq!(nudge(3, 15.0), nudge(3, 15.0));
        assert!(nudge(3, 15.0).length() < 0.2);
        assert!(nudge(3, 15.0).length() > 0.0);
    }
}
