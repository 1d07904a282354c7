use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn dot(self, other: Vec2) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Removes the part of `self` that points along `normal` (`v - (v.n)n`).
    /// `normal` is expected to be unit length.
    pub fn without_component(self, normal: Vec2) -> Vec2 {
        self - normal * self.dot(normal)
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;

    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// Axis-aligned box. `pos` is the top-left corner; y grows downward, so
/// `top() < bottom()` for any box with positive height.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub pos: Vec2,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            pos: Vec2 { x, y },
            w,
            h,
        }
    }

    pub fn left(&self) -> f32 {
        self.pos.x
    }

    pub fn right(&self) -> f32 {
        self.pos.x + self.w
    }

    pub fn top(&self) -> f32 {
        self.pos.y
    }

    pub fn bottom(&self) -> f32 {
        self.pos.y + self.h
    }

    pub fn half_extents(&self) -> Vec2 {
        Vec2::new(self.w * 0.5, self.h * 0.5)
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.half_extents()
    }

    pub fn translated(&self, delta: Vec2) -> Rect {
        Rect {
            pos: self.pos + delta,
            w: self.w,
            h: self.h,
        }
    }

    /// Minkowski sum with a box of the given half extents centered on the origin.
    pub fn expanded(&self, half_extents: Vec2) -> Rect {
        Rect::new(
            self.pos.x - half_extents.x,
            self.pos.y - half_extents.y,
            self.w + half_extents.x * 2.0,
            self.h + half_extents.y * 2.0,
        )
    }

    /// Strict overlap: boxes that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    /// Bounding box of this box and the same box moved by `delta`.
    pub fn swept_bounds(&self, delta: Vec2) -> Rect {
        let end = self.translated(delta);
        let left = self.left().min(end.left());
        let top = self.top().min(end.top());
        let right = self.right().max(end.right());
        let bottom = self.bottom().max(end.bottom());
        Rect::new(left, top, right - left, bottom - top)
    }
}

/// Integer grid coordinate. Tile `(x, y)` covers `[x, x + 1) x [y, y + 1)` in world units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn from_world(point: Vec2) -> Self {
        Self {
            x: point.x.floor() as i32,
            y: point.y.floor() as i32,
        }
    }

    pub fn world_rect(self) -> Rect {
        Rect::new(self.x as f32, self.y as f32, 1.0, 1.0)
    }
}
