//! Constants that define how a slope behaves.
//!
//! A [`WorldConfigBuilder`] holds the raw, user facing parameters (degrees,
//! amounts, margins). [`WorldConfigBuilder::build`] validates them and derives
//! the values the simulation actually reads, like the effective gravity along
//! the slope and the range gates can be placed in.
use anyhow::{ensure, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// The standard 20 gate slalom
pub static DEFAULT_SLALOM: Lazy<WorldConfig> = Lazy::new(|| {
    WorldConfigBuilder::slalom()
        .build()
        .expect("slalom preset is a valid world")
});

#[derive(Debug, Clone, PartialEq)]
pub struct WorldConfig {
    pub width: f64,
    pub height: f64,
    pub friction: f64,

    pub flag_pairs: usize,
    pub flags_start: f64,
    pub distance_between_flags: f64,
    pub flags_spacing_vertical: f64,
    pub flags_left_min: f64,
    pub flags_left_max: f64,

    pub trees: usize,
    pub trees_margin_to_flags: f64,

    pub is_downhill: bool,
    pub is_slalom: bool,

    /// frame milliseconds -> simulation seconds
    pub time_factor: f64,
    /// acceleration along the slope
    pub gravity: f64,
}

impl WorldConfig {
    pub fn builder() -> WorldConfigBuilder {
        WorldConfigBuilder::default()
    }
}

/// Raw world parameters
/// - every field starts at 0, the chainable setters fill them in
/// - `build()` rejects anything that can't produce a playable slope
/// - deserializing starts from the slalom preset, so a JSON file only has to
///   list what it changes
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default = "WorldConfigBuilder::slalom")]
pub struct WorldConfigBuilder {
    pub width: f64,
    /// 0 means derived from the gates
    pub height: f64,

    pub difficulty: f64,
    pub gravity: f64,
    /// degrees
    pub inclination: f64,
    pub friction: f64,

    pub flags_start: f64,
    pub distance_between_flags: f64,
    pub flags_margin_horizontal: f64,
    pub flags_margin_vertical: f64,
    pub trees_margin_to_flags: f64,

    pub flag_pairs: usize,
    pub trees: usize,
}

impl WorldConfigBuilder {
    pub fn slalom() -> Self {
        WorldConfigBuilder::default()
            .set_width(800.0)
            .set_difficulty(1.0)
            .set_gravity(100.0)
            .set_inclination(60.0)
            .set_friction(0.4)
            .set_flags_start(300.0)
            .set_distance_between_flags(200.0)
            .set_flags_margin_horizontal(100.0)
            .set_flags_margin_vertical(250.0)
            .set_trees_margin_to_flags(100.0)
            .set_flag_pairs(20)
            .set_trees(40)
    }

    pub fn set_width(mut self, width: f64) -> Self {
        self.width = width;
        self
    }

    /// If height == 0, the height will be calculated automatically
    pub fn set_height(mut self, height: f64) -> Self {
        self.height = height;
        self
    }

    pub fn set_difficulty(mut self, difficulty: f64) -> Self {
        self.difficulty = difficulty;
        self
    }

    pub fn set_gravity(mut self, gravity: f64) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn set_inclination(mut self, inclination: f64) -> Self {
        self.inclination = inclination;
        self
    }

    pub fn set_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    pub fn set_flags_start(mut self, start: f64) -> Self {
        self.flags_start = start;
        self
    }

    pub fn set_distance_between_flags(mut self, distance: f64) -> Self {
        self.distance_between_flags = distance;
        self
    }

    pub fn set_flags_margin_horizontal(mut self, margin: f64) -> Self {
        self.flags_margin_horizontal = margin;
        self
    }

    pub fn set_flags_margin_vertical(mut self, margin: f64) -> Self {
        self.flags_margin_vertical = margin;
        self
    }

    pub fn set_trees_margin_to_flags(mut self, margin: f64) -> Self {
        self.trees_margin_to_flags = margin;
        self
    }

    pub fn set_flag_pairs(mut self, amount: usize) -> Self {
        self.flag_pairs = amount;
        self
    }

    pub fn set_trees(mut self, amount: usize) -> Self {
        self.trees = amount;
        self
    }

    pub fn build(&self) -> Result<WorldConfig> {
        ensure!(self.width > 0.0, "width must be positive, got {}", self.width);
        ensure!(self.height >= 0.0, "height can't be negative, got {}", self.height);
        ensure!(self.difficulty > 0.0, "difficulty must be positive, got {}", self.difficulty);
        ensure!(self.gravity > 0.0, "gravity must be positive, got {}", self.gravity);
        ensure!(
            self.inclination > 0.0 && self.inclination < 90.0,
            "inclination must be in (0, 90) degrees, got {}",
            self.inclination
        );
        ensure!(
            self.friction >= 0.0 && self.friction < 1.0,
            "friction must be in [0, 1), got {}",
            self.friction
        );
        ensure!(
            self.flags_margin_horizontal >= 0.0,
            "horizontal flag margin can't be negative"
        );
        ensure!(
            self.trees_margin_to_flags >= 0.0,
            "tree margin to flags can't be negative"
        );

        let is_downhill = self.flag_pairs == 0;
        let flags_left_min = self.flags_margin_horizontal;
        let flags_left_max = self.width - self.distance_between_flags - flags_left_min;

        let height = if is_downhill {
            ensure!(self.height > 0.0, "a downhill slope needs an explicit height");
            self.height
        } else {
            ensure!(self.flags_start > 0.0, "flags must start below the top of the slope");
            ensure!(
                self.distance_between_flags > 0.0,
                "distance between flags must be positive"
            );
            ensure!(
                self.flags_margin_vertical > 0.0,
                "vertical spacing between gates must be positive"
            );
            ensure!(
                flags_left_max >= flags_left_min,
                "gates {} wide with a {} margin don't fit in a {} wide slope",
                self.distance_between_flags,
                flags_left_min,
                self.width
            );

            let last_gate =
                self.flags_start + (self.flag_pairs - 1) as f64 * self.flags_margin_vertical;
            if self.height > 0.0 {
                ensure!(
                    last_gate <= self.height,
                    "the last gate at y = {} is below the end of a {} high slope",
                    last_gate,
                    self.height
                );
                self.height
            } else {
                1.5 * self.flags_start
                    + (self.flag_pairs - 1) as f64 * self.flags_margin_vertical
            }
        };

        Ok(WorldConfig {
            width: self.width,
            height,
            friction: self.friction,
            flag_pairs: self.flag_pairs,
            flags_start: self.flags_start,
            distance_between_flags: self.distance_between_flags,
            flags_spacing_vertical: self.flags_margin_vertical,
            flags_left_min,
            flags_left_max,
            trees: self.trees,
            trees_margin_to_flags: self.trees_margin_to_flags,
            is_downhill,
            is_slalom: !is_downhill,
            time_factor: 0.001 * self.difficulty,
            gravity: self.gravity * self.inclination.to_radians().sin(),
        })
    }
}

fn default_players() -> usize {
    1
}

/// Everything read from `settings.json`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default = "WorldConfigBuilder::slalom")]
    pub world: WorldConfigBuilder,
    /// local skiers sharing the keyboard
    #[serde(default = "default_players")]
    pub players: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            world: WorldConfigBuilder::slalom(),
            players: default_players(),
        }
    }
}
