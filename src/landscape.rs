//! Gates and trees: what they look like to the collision checks, and how a
//! slope full of them is generated.
use crate::config::WorldConfig;
use crate::engine::{Point, Rect, Size};
use anyhow::{bail, ensure, Result};
use rand::Rng;

/// Above this many trees, trees are allowed to overlap each other
pub const TREE_OVERLAP_LIMIT: usize = 75;
/// Samples per tree before generation gives up on the slope
pub const MAX_TREE_ATTEMPTS: usize = 10_000;

/// Sprite dimensions the obstacles are laid out with
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SpriteSizes {
    pub flag: Size,
    pub tree: Size,
}

pub trait Collidable {
    fn collision_box(&self) -> &Rect;

    /// Did anything moving from `prev` to `pos` this step touch us
    fn collides_along(&self, prev: Point, pos: Point) -> bool {
        self.collision_box().clips_segment(prev, pos)
    }
}

/// One pole of a gate
/// - `rect` is the sprite, anchored by its bottom right corner
/// - only a thin strip along the pole's right edge is solid
#[derive(Debug, Clone, PartialEq)]
pub struct Flag {
    rect: Rect,
    collision_box: Rect,
}

impl Flag {
    pub const COLLISION_BOX_WIDTH: f64 = 10.0;

    pub fn new(bottom_right: Point, size: Size) -> Self {
        let rect = Rect::new(Point::default(), size).with_bottom_right(bottom_right);
        let collision_box = Rect::new(
            Point::default(),
            Size::new(Flag::COLLISION_BOX_WIDTH, rect.height()),
        )
        .with_bottom_right(rect.bottom_right());

        Flag {
            rect,
            collision_box,
        }
    }

    pub fn rect(&self) -> &Rect {
        &self.rect
    }
}

impl Collidable for Flag {
    fn collision_box(&self) -> &Rect {
        &self.collision_box
    }
}

/// A gate. Its own collision box is the scoring line between the two flags,
/// crossing it scores, touching either flag is a crash.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagPair {
    pub y: f64,
    pub left_x: f64,
    pub right_x: f64,
    pub left: Flag,
    pub right: Flag,
    collision_box: Rect,
}

impl FlagPair {
    pub const COLLISION_BOX_HEIGHT: f64 = 5.0;

    pub fn new(config: &WorldConfig, y: f64, left_x: f64, flag_size: Size) -> Self {
        let right_x = left_x + config.distance_between_flags;
        let left = Flag::new(Point::new(left_x, y), flag_size);
        let right = Flag::new(Point::new(right_x, y), flag_size);

        let collision_box = Rect::new(
            Point::default(),
            Size::new(config.distance_between_flags, FlagPair::COLLISION_BOX_HEIGHT),
        )
        .with_bottom_left(left.rect().bottom_right());

        FlagPair {
            y,
            left_x,
            right_x,
            left,
            right,
            collision_box,
        }
    }

    pub fn flags(&self) -> [&Flag; 2] {
        [&self.left, &self.right]
    }
}

impl Collidable for FlagPair {
    fn collision_box(&self) -> &Rect {
        &self.collision_box
    }
}

/// A tree, centered on its anchor. Only the foot of the trunk is solid so the
/// skier can pass behind the crown.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    rect: Rect,
    collision_box: Rect,
}

impl Tree {
    pub const COLLISION_BOX_HEIGHT: f64 = 5.0;

    pub fn new(center: Point, size: Size) -> Self {
        let rect = Rect::new(Point::default(), size).with_center(center);
        let collision_box = Rect::new(
            Point::default(),
            Size::new(rect.width(), Tree::COLLISION_BOX_HEIGHT),
        )
        .with_mid_bottom(rect.mid_bottom());

        Tree {
            rect,
            collision_box,
        }
    }

    pub fn rect(&self) -> &Rect {
        &self.rect
    }
}

impl Collidable for Tree {
    fn collision_box(&self) -> &Rect {
        &self.collision_box
    }
}

#[derive(Debug, Clone)]
pub struct Landscape {
    config: WorldConfig,
    flag_pairs: Vec<FlagPair>,
    trees: Vec<Tree>,
}

impl Landscape {
    /// Gates must be ordered top to bottom, each strictly below the last
    pub fn new(config: WorldConfig, flag_pairs: Vec<FlagPair>, trees: Vec<Tree>) -> Result<Self> {
        for (index, pair) in flag_pairs.windows(2).enumerate() {
            ensure!(
                pair[0].y < pair[1].y,
                "gate {} at y = {} is not above gate {} at y = {}",
                index,
                pair[0].y,
                index + 1,
                pair[1].y
            );
        }

        Ok(Landscape {
            config,
            flag_pairs,
            trees,
        })
    }

    /// Random slope
    /// - gates every `flags_spacing_vertical`, shifted horizontally at random
    /// - trees anywhere except between consecutive gates (plus a margin), so
    ///   there is always a way through
    pub fn generate<R: Rng + ?Sized>(
        config: &WorldConfig,
        sprites: SpriteSizes,
        rng: &mut R,
    ) -> Result<Self> {
        let mut flag_pairs = Vec::with_capacity(config.flag_pairs);
        for index in 0..config.flag_pairs {
            let y = config.flags_start + index as f64 * config.flags_spacing_vertical;
            ensure!(
                y <= config.height,
                "gate {} at y = {} is below the end of the slope ({})",
                index,
                y,
                config.height
            );
            let left_x = rng
                .gen_range(config.flags_left_min as i64..=config.flags_left_max as i64)
                as f64;
            flag_pairs.push(FlagPair::new(config, y, left_x, sprites.flag));
        }

        let mut trees = Vec::with_capacity(config.trees);
        for _ in 0..config.trees {
            let tree = place_tree(config, &flag_pairs, &trees, sprites.tree, rng)?;
            trees.push(tree);
        }

        Landscape::new(config.clone(), flag_pairs, trees)
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn width(&self) -> f64 {
        self.config.width
    }

    pub fn height(&self) -> f64 {
        self.config.height
    }

    pub fn flag_pairs(&self) -> &[FlagPair] {
        &self.flag_pairs
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }
}

/// Horizontal range kept free of trees at height `y`: the span of the gates
/// above and below, widened by `trees_margin_to_flags`.
///
/// A downhill slope has no gates, the range is empty and sits on the right
/// edge so it never shifts a sample.
pub(crate) fn corridor(config: &WorldConfig, flag_pairs: &[FlagPair], y: f64) -> (f64, f64) {
    if config.is_downhill || flag_pairs.is_empty() {
        return (config.width, config.width);
    }

    let last = flag_pairs.len() - 1;
    let index = ((y - config.flags_start) / config.flags_spacing_vertical).floor();
    let previous_index = index.clamp(0.0, last as f64) as usize;
    let next_index = (previous_index + 1).min(last);

    let previous = &flag_pairs[previous_index];
    let next = &flag_pairs[next_index];

    let min_x = previous.left_x.min(next.left_x) - config.trees_margin_to_flags;
    let max_x = previous.right_x.max(next.right_x) + config.trees_margin_to_flags;
    (min_x, max_x)
}

fn place_tree<R: Rng + ?Sized>(
    config: &WorldConfig,
    flag_pairs: &[FlagPair],
    trees: &[Tree],
    size: Size,
    rng: &mut R,
) -> Result<Tree> {
    let check_trees = config.trees <= TREE_OVERLAP_LIMIT;

    for _ in 0..MAX_TREE_ATTEMPTS {
        let y = rng.gen_range(0..=config.height as i64) as f64;

        let (min_x, max_x) = corridor(config, flag_pairs, y);
        let corridor_width = max_x - min_x;
        let free_width = config.width - corridor_width;
        if free_width < 0.0 {
            // the corridor covers the whole slope here
            continue;
        }

        // sample the free width, then jump over the corridor
        let mut x = rng.gen_range(0..=free_width as i64) as f64;
        if x > min_x {
            x += corridor_width;
        }

        let tree = Tree::new(Point::new(x, y), size);

        let collides_with_trees =
            check_trees && trees.iter().any(|other| tree.rect().intersects(other.rect()));
        let collides_with_flags = flag_pairs.iter().any(|pair| {
            pair.flags()
                .iter()
                .any(|flag| tree.rect().intersects(flag.rect()))
        });

        if !collides_with_trees && !collides_with_flags {
            return Ok(tree);
        }
    }

    bail!(
        "could not place tree {} of {} after {} attempts, the slope is too crowded",
        trees.len() + 1,
        config.trees,
        MAX_TREE_ATTEMPTS
    )
}
