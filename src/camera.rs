//! The player's perspective: world coordinates -> screen coordinates.
use crate::engine::{Point, Rect};

/// Vertical position the tracked skier settles at on screen
pub const TOP: f64 = 200.0;
/// Screen distance kept above the tracked skier near the start of the slope
pub const PADDING: f64 = 150.0;

/// Follows a skier vertically, the x axis is never shifted
/// - near the top of the slope the skier walks down the screen from
///   `padding` until it reaches `top`
/// - from then on the world scrolls up and the skier stays at `top`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    top: f64,
    padding: f64,
    offset: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Camera::new(TOP, PADDING)
    }
}

impl Camera {
    pub fn new(top: f64, padding: f64) -> Self {
        Camera {
            top,
            padding,
            offset: 0.0,
        }
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn track(&mut self, y: f64) {
        self.offset = -y + (y + self.padding).min(self.top);
    }

    pub fn transform(&self, point: Point) -> Point {
        Point::new(point.x, point.y + self.offset)
    }

    pub fn project(&self, rect: &Rect) -> Rect {
        Rect::new(self.transform(rect.position), rect.size)
    }
}
