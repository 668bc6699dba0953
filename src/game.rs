use crate::assets::{Assets, Sound};
use crate::browser;
use crate::camera::Camera;
use crate::config::{Settings, WorldConfig, DEFAULT_SLALOM};
use crate::engine::input::KeyState;
#[cfg(debug_assertions)]
use crate::engine::DebugDraw;
use crate::engine::{Baseline, Color, Game, Image, Point, Rect, Renderer, Size, FRAME_SIZE};
#[cfg(debug_assertions)]
use crate::landscape::Collidable;
use crate::landscape::{FlagPair, Landscape, SpriteSizes, Tree};
use crate::race::{Race, RaceEvent};
use crate::skier::keyboard::KEYBOARDS;
use crate::skier::pose::{Poses, DOWN_SPRITE};
use crate::skier::Skier;
use crate::timer::format_millis;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::join;
use std::collections::HashMap;
use std::rc::Rc;
use uuid::Uuid;

/// TABLE
/// ┌──────────────────────── Skiing, one frame ──────────────────────────────┐
/// │                                                                         │
/// │    ┌─────────────┐  update  ┌─────────────┐  tick   ┌─────────────┐     │
/// │    │  engine.rs  ├─────────►│   game.rs   ├────────►│   race.rs   │     │
/// │    │  GameLoop   │          │   Skiing    │◄────────┤   Race      │     │
/// │    └──────┬──────┘          └──────┬──────┘ events  └─────────────┘     │
/// │           │ draw                   │                                    │
/// │           └───────────────────────►│ log!, sounds                       │
/// │                                    ▼                                    │
/// │                      camera.track(main skier)                           │
/// │                      obstacles behind ─► skiers ─► obstacles in front   │
/// │                      header: gates left + clock                         │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
pub enum Skiing {
    /// Waiting for settings, sprites and fonts
    Loading,

    /// Racing, or looking at the result of the last race
    Loaded(Slope),
}

impl Skiing {
    const SETTINGS_PATH: &'static str = "settings.json";

    pub fn new() -> Self {
        Skiing::Loading
    }

    /// A missing or broken settings file is not fatal, the defaults are used
    async fn load_settings() -> Settings {
        match browser::fetch_json::<Settings>(Self::SETTINGS_PATH).await {
            Ok(settings) => settings,
            Err(err) => {
                error!(
                    "Could not read {}, using default settings : {:#}",
                    Self::SETTINGS_PATH,
                    err
                );
                Settings::default()
            }
        }
    }

    fn world_config(settings: &Settings) -> WorldConfig {
        match settings.world.build() {
            Ok(config) => config,
            Err(err) => {
                error!("Invalid world settings, using the default slalom : {:#}", err);
                DEFAULT_SLALOM.clone()
            }
        }
    }

    fn player_count(settings: &Settings) -> usize {
        let players = settings.players.clamp(1, KEYBOARDS.len());
        if players != settings.players {
            error!(
                "{} players asked for, playing with {}",
                settings.players, players
            );
        }
        players
    }
}

impl Default for Skiing {
    fn default() -> Self {
        Skiing::new()
    }
}

#[async_trait(?Send)]
impl Game for Skiing {
    async fn initialize(&self) -> Result<Box<dyn Game>> {
        match self {
            Skiing::Loading => {
                let mut assets = Assets::new();
                let mut images = vec![Slope::FLAG, Slope::TREE];
                images.extend(Poses::sprite_names());

                // settings and sprites come from different places, fetch both at once
                let (settings, loaded) = join!(Self::load_settings(), assets.load_images(&images));
                loaded?;
                if let Err(err) = assets.load_font(Slope::FONT).await {
                    error!("Falling back to the default font : {:#}", err);
                }

                let sizes = images
                    .iter()
                    .map(|name| assets.image(name).map(|image| (*name, image.size())))
                    .collect::<Result<HashMap<&str, Size>>>()?;
                let poses = Rc::new(Poses::new(|name| {
                    sizes.get(name).copied().unwrap_or_default()
                }));
                let sprites = SpriteSizes {
                    flag: assets.image(Slope::FLAG)?.size(),
                    tree: assets.image(Slope::TREE)?.size(),
                };

                let config = Self::world_config(&settings);
                let players: Vec<Uuid> = (0..Self::player_count(&settings))
                    .map(|_| Uuid::new_v4())
                    .collect();
                let Opening {
                    config,
                    race,
                    rejected,
                } = Slope::open(config, sprites, &poses, &players)?;
                if let Some(err) = rejected {
                    error!("Settings can't make a slope, using the default slalom : {:#}", err);
                }
                log!(
                    "{} gates and {} trees on a {} high slope",
                    race.landscape().flag_pairs().len(),
                    race.landscape().trees().len(),
                    config.height
                );

                let slope = Slope {
                    crash: assets.sound("crash")?,
                    gate: assets.sound("gate")?,
                    assets,
                    config,
                    sprites,
                    poses,
                    players,
                    race,
                    camera: Camera::default(),
                };
                Ok(Box::new(Skiing::Loaded(slope)))
            }
            Skiing::Loaded(_) => Err(anyhow!("Game is already initialized")),
        }
    }

    fn update(&mut self, keystate: &KeyState) {
        if let Skiing::Loaded(slope) = self {
            slope.update(keystate);
        }
    }

    fn draw(&mut self, renderer: &Renderer) {
        if let Skiing::Loaded(slope) = self {
            slope.draw(renderer);
        }
    }
}

pub struct Slope {
    assets: Assets,
    config: WorldConfig,
    sprites: SpriteSizes,
    poses: Rc<Poses>,
    // kept across restarts so every skier keeps their id and keyboard
    players: Vec<Uuid>,
    race: Race,
    camera: Camera,
    crash: Sound,
    gate: Sound,
}

impl Slope {
    const FLAG: &'static str = "flag";
    const TREE: &'static str = "tree";
    const FONT: &'static str = "Pixeboy";
    const RESTART_KEY: &'static str = "Enter";

    const SCREEN_WIDTH: f64 = 800.0;
    const SCREEN_HEIGHT: f64 = 600.0;
    const HEADER_HEIGHT: f64 = 75.0;
    const BACKGROUND: Color = Color(245, 245, 245);
    const TEXT: Color = Color(0, 0, 0);

    fn new_race(
        config: &WorldConfig,
        sprites: SpriteSizes,
        poses: &Rc<Poses>,
        players: &[Uuid],
    ) -> Result<Race> {
        let landscape = Landscape::generate(config, sprites, &mut rand::thread_rng())?;
        let mut race = Race::new(landscape, Rc::clone(poses));
        for id in players {
            race.add_skier(Some(*id))?;
        }
        Ok(race)
    }

    /// First race of the session. If `config` can't produce a slope the
    /// default slalom is used instead, and the reason is handed back.
    fn open(
        config: WorldConfig,
        sprites: SpriteSizes,
        poses: &Rc<Poses>,
        players: &[Uuid],
    ) -> Result<Opening> {
        match Slope::new_race(&config, sprites, poses, players) {
            Ok(race) => Ok(Opening {
                config,
                race,
                rejected: None,
            }),
            Err(err) if config != *DEFAULT_SLALOM => {
                let config = DEFAULT_SLALOM.clone();
                let race = Slope::new_race(&config, sprites, poses, players)
                    .context("Could not set up the default slalom either")?;
                Ok(Opening {
                    config,
                    race,
                    rejected: Some(err),
                })
            }
            Err(err) => Err(err.context("Could not set up the first race")),
        }
    }

    /// Fresh slope, same skiers
    fn restart(&mut self) -> Result<()> {
        self.race = Slope::new_race(&self.config, self.sprites, &self.poses, &self.players)?;
        self.camera = Camera::default();
        log!("New slope, get ready");
        Ok(())
    }

    fn update(&mut self, keystate: &KeyState) {
        if self.race.is_over() {
            if keystate.was_pressed(Self::RESTART_KEY) {
                if let Err(err) = self.restart() {
                    error!("Could not start a new race : {:#}", err);
                }
            }
            return;
        }

        for event in self.race.tick(keystate, FRAME_SIZE) {
            self.present(&event);
        }
    }

    fn present(&self, event: &RaceEvent) {
        match event {
            RaceEvent::Started => log!("Go!"),
            RaceEvent::Crashed { skier, obstacle } => {
                log!("{} crashed into {:?}", skier, obstacle);
                self.crash.play();
            }
            RaceEvent::Scored { skier, gate, score } => {
                log!("{} passed gate {} ({} so far)", skier, gate, score);
                self.gate.play();
            }
            RaceEvent::Finished { skier, millis } => {
                log!("{} finished in {}", skier, format_millis(*millis));
            }
        }
    }

    fn draw(&mut self, renderer: &Renderer) {
        renderer.fill_rect(
            &Rect::new_from_x_y(0.0, 0.0, Self::SCREEN_WIDTH, Self::SCREEN_HEIGHT),
            Self::BACKGROUND,
        );

        let depth = self
            .race
            .main_skier()
            .map(|skier| skier.position().y)
            .unwrap_or_default();
        self.camera.track(depth);

        let (behind, in_front) = layers(self.race.landscape(), depth);
        self.draw_layer(renderer, &behind);
        for skier in self.race.skiers() {
            self.draw_skier(renderer, skier);
        }
        self.draw_layer(renderer, &in_front);

        self.draw_header(renderer);
        if self.race.is_over() {
            self.draw_result(renderer);
        }
    }

    fn image(&self, name: &str) -> Option<&Image> {
        match self.assets.image(name) {
            Ok(image) => Some(image),
            Err(err) => {
                error!("{:#}", err);
                None
            }
        }
    }

    fn draw_layer(&self, renderer: &Renderer, layer: &Layer) {
        for pair in &layer.flag_pairs {
            self.draw_flag_pair(renderer, pair);
        }
        for tree in &layer.trees {
            self.draw_tree(renderer, tree);
        }
    }

    fn draw_flag_pair(&self, renderer: &Renderer, pair: &FlagPair) {
        if let Some(image) = self.image(Self::FLAG) {
            for flag in pair.flags() {
                image.draw(renderer, &self.camera.project(flag.rect()), false);
                #[cfg(debug_assertions)]
                self.camera
                    .project(flag.collision_box())
                    .draw_debug(renderer);
            }
        }
        #[cfg(debug_assertions)]
        self.camera
            .project(pair.collision_box())
            .draw_debug(renderer);
    }

    fn draw_tree(&self, renderer: &Renderer, tree: &Tree) {
        if let Some(image) = self.image(Self::TREE) {
            image.draw(renderer, &self.camera.project(tree.rect()), false);
        }
        #[cfg(debug_assertions)]
        self.camera
            .project(tree.collision_box())
            .draw_debug(renderer);
    }

    fn draw_skier(&self, renderer: &Renderer, skier: &Skier) {
        let (sprite, flipped) = if skier.is_down() {
            (DOWN_SPRITE, false)
        } else {
            (skier.pose().sprite, skier.pose().flipped)
        };
        let destination =
            Rect::new(Point::default(), skier.sprite_size()).with_center(skier.position());

        if let Some(image) = self.image(sprite) {
            image.draw(renderer, &self.camera.project(&destination), flipped);
        }
        #[cfg(debug_assertions)]
        self.camera
            .project(&skier.collision_box())
            .draw_debug(renderer);
    }

    fn draw_header(&self, renderer: &Renderer) {
        let header = Rect::new_from_x_y(0.0, 0.0, Self::SCREEN_WIDTH, Self::HEADER_HEIGHT);
        renderer.fill_rect(&header, Self::BACKGROUND);

        let (gates, clock) = header_text(&self.race);
        let center = header.center();
        renderer.draw_text(
            &gates,
            &self.assets.font(Self::FONT, 48).css(),
            Self::TEXT,
            center,
            Baseline::Bottom,
        );
        renderer.draw_text(
            &clock,
            &self.assets.font(Self::FONT, 32).css(),
            Self::TEXT,
            center + Point::new(0.0, 10.0),
            Baseline::Top,
        );
    }

    fn draw_result(&self, renderer: &Renderer) {
        let finished_at = self.race.main_skier().and_then(Skier::finished_at);
        renderer.draw_text(
            &result_text(finished_at),
            &self.assets.font(Self::FONT, 32).css(),
            Self::TEXT,
            Point::new(Self::SCREEN_WIDTH / 2.0, Self::SCREEN_HEIGHT / 2.0),
            Baseline::Middle,
        );
    }
}

struct Opening {
    config: WorldConfig,
    race: Race,
    /// why the configured slope was given up on
    rejected: Option<anyhow::Error>,
}

/// Obstacles on one side of the skiers in draw order
#[derive(Debug, Default)]
struct Layer<'a> {
    flag_pairs: Vec<&'a FlagPair>,
    trees: Vec<&'a Tree>,
}

/// Split the obstacles at depth `y`: anything standing lower on the slope
/// is in front of the skiers
fn layers(landscape: &Landscape, y: f64) -> (Layer<'_>, Layer<'_>) {
    let mut behind = Layer::default();
    let mut in_front = Layer::default();

    for pair in landscape.flag_pairs() {
        if pair.y > y {
            in_front.flag_pairs.push(pair);
        } else {
            behind.flag_pairs.push(pair);
        }
    }
    for tree in landscape.trees() {
        if tree.rect().bottom() > y {
            in_front.trees.push(tree);
        } else {
            behind.trees.push(tree);
        }
    }

    (behind, in_front)
}

/// Gates the main skier still has to pass, and the race clock
fn header_text(race: &Race) -> (String, String) {
    let gates = race
        .main_skier()
        .map(|skier| race.gates_left(skier))
        .unwrap_or_else(|| race.landscape().flag_pairs().len());
    (gates.to_string(), format_millis(race.timer().millis()))
}

fn result_text(finished_at: Option<f64>) -> String {
    match finished_at {
        Some(millis) => format!(
            "Finished in {}! Press {} to ski again",
            format_millis(millis),
            Slope::RESTART_KEY
        ),
        None => format!("Press {} to ski again", Slope::RESTART_KEY),
    }
}
