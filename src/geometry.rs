use glam::Vec2;

/// Axis-aligned rectangle in scene units.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub origin: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            origin: Vec2::new(x, y),
            size: Vec2::new(width, height),
        }
    }

    pub fn from_wh(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn left(&self) -> f32 {
        self.origin.x
    }

    pub fn top(&self) -> f32 {
        self.origin.y
    }

    pub fn right(&self) -> f32 {
        self.origin.x + self.size.x
    }

    pub fn bottom(&self) -> f32 {
        self.origin.y + self.size.y
    }

    pub fn width(&self) -> f32 {
        self.size.x
    }

    pub fn height(&self) -> f32 {
        self.size.y
    }

    pub fn translate(&self, offset: Vec2) -> Self {
        Self {
            origin: self.origin + offset,
            size: self.size,
        }
    }

    /// Grows the rectangle by `amount` on every side.
    pub fn outset(&self, amount: f32) -> Self {
        Self {
            origin: self.origin - Vec2::splat(amount),
            size: self.size + Vec2::splat(amount * 2.0),
        }
    }

    /// Edges are inclusive so a pointer resting on a border still hits.
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }
}
