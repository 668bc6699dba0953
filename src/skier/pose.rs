use crate::engine::{Point, Size};

/// Sprite drawn while a skier is down after a crash
pub const DOWN_SPRITE: &str = "skier-4";

/// Left facing half of the table, angles in degrees from straight downhill.
/// The right half mirrors it with flipped sprites.
const LEFT_POSES: [(f64, &str); 5] = [
    (0.0, "skier-0"),
    (-15.0, "skier-0"),
    (-30.0, "skier-1"),
    (-60.0, "skier-2"),
    (-90.0, "skier-3"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    /// degrees, negative points left
    pub angle: f64,
    pub sprite: &'static str,
    pub flipped: bool,
    pub size: Size,
}

impl Pose {
    /// Unit vector the skier's skis point along
    pub fn direction(&self) -> Point {
        let radians = self.angle.to_radians();
        Point::new(radians.sin(), radians.cos())
    }
}

/// Every direction a skier can face, ordered from hard left to hard right
#[derive(Debug, Clone, PartialEq)]
pub struct Poses {
    poses: Vec<Pose>,
    down: Size,
}

impl Poses {
    /// `size_of` gives the loaded size of a sprite by name
    pub fn new(size_of: impl Fn(&str) -> Size) -> Self {
        let mut poses = Vec::with_capacity(LEFT_POSES.len() * 2);
        for (angle, sprite) in LEFT_POSES {
            poses.insert(
                0,
                Pose {
                    angle,
                    sprite,
                    flipped: false,
                    size: size_of(sprite),
                },
            );
            poses.push(Pose {
                angle: -angle,
                sprite,
                flipped: true,
                size: size_of(sprite),
            });
        }

        Poses {
            poses,
            down: size_of(DOWN_SPRITE),
        }
    }

    /// Distinct sprite names, down sprite included
    pub fn sprite_names() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = LEFT_POSES.iter().map(|(_, sprite)| *sprite).collect();
        names.push(DOWN_SPRITE);
        names.dedup();
        names
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Facing straight downhill
    pub fn initial(&self) -> usize {
        self.poses.len() / 2
    }

    /// Any index is brought back into the table
    pub fn clamp(&self, index: isize) -> usize {
        index.clamp(0, self.poses.len() as isize - 1) as usize
    }

    pub fn get(&self, index: usize) -> &Pose {
        &self.poses[self.clamp(index as isize)]
    }

    pub fn down_size(&self) -> Size {
        self.down
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn table_runs_from_hard_left_to_hard_right() {
        let poses = Poses::new(|_| Size::new(10.0, 10.0));
        let angles: Vec<f64> = (0..poses.len()).map(|i| poses.get(i).angle).collect();
        assert_eq!(
            angles,
            vec![-90.0, -60.0, -30.0, -15.0, 0.0, 0.0, 15.0, 30.0, 60.0, 90.0]
        );
        assert!(!poses.get(0).flipped);
        assert!(poses.get(9).flipped);
        assert_eq!(poses.get(9).sprite, "skier-3");
        assert_eq!(poses.initial(), 5);
    }

    #[test]
    fn indexes_are_clamped() {
        let poses = Poses::new(|_| Size::new(10.0, 10.0));
        assert_eq!(poses.clamp(-3), 0);
        assert_eq!(poses.clamp(42), 9);
        assert_eq!(poses.get(42).angle, 90.0);
    }

    #[test]
    fn sizes_come_from_the_sprites() {
        let poses = Poses::new(|name| match name {
            "skier-3" => Size::new(30.0, 12.0),
            DOWN_SPRITE => Size::new(25.0, 8.0),
            _ => Size::new(14.0, 28.0),
        });
        assert_eq!(poses.get(0).size, Size::new(30.0, 12.0));
        assert_eq!(poses.get(4).size, Size::new(14.0, 28.0));
        assert_eq!(poses.down_size(), Size::new(25.0, 8.0));
    }

    #[test]
    fn direction_points_downhill_at_zero() {
        let poses = Poses::new(|_| Size::new(10.0, 10.0));
        let down = poses.get(poses.initial()).direction();
        assert_relative_eq!(down.x, 0.0);
        assert_relative_eq!(down.y, 1.0);

        let hard_left = poses.get(0).direction();
        assert_relative_eq!(hard_left.x, -1.0);
        assert_relative_eq!(hard_left.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn sprite_names_cover_every_pose() {
        assert_eq!(
            Poses::sprite_names(),
            vec!["skier-0", "skier-1", "skier-2", "skier-3", "skier-4"]
        );
    }
}
