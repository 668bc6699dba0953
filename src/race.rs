//! One run down a slope: skiers, the landscape they ski on, and the clock.
//!
//! [`Race::tick`] is the whole per-frame simulation. It never draws or logs,
//! it reports what happened as [`RaceEvent`]s for the game to present.
use crate::engine::input::KeyState;
use crate::engine::Point;
use crate::landscape::{Collidable, Landscape};
use crate::skier::keyboard::{KeyboardPool, KEYBOARDS};
use crate::skier::pose::Poses;
use crate::skier::Skier;
use crate::timer::RaceTimer;
use anyhow::{anyhow, Result};
use std::rc::Rc;
use uuid::Uuid;

/// Horizontal gap between skiers at the start line
pub const START_SPACING: f64 = 40.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Obstacle {
    /// index into the landscape's trees
    Tree(usize),
    /// index into the landscape's gates
    Flag(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RaceEvent {
    /// countdown is over
    Started,
    Crashed { skier: Uuid, obstacle: Obstacle },
    Scored { skier: Uuid, gate: usize, score: usize },
    Finished { skier: Uuid, millis: f64 },
}

pub struct Race {
    landscape: Landscape,
    poses: Rc<Poses>,
    skiers: Vec<Skier>,
    keyboards: KeyboardPool,
    timer: RaceTimer,
}

impl Race {
    pub fn new(landscape: Landscape, poses: Rc<Poses>) -> Self {
        Race {
            landscape,
            poses,
            skiers: Vec::new(),
            keyboards: KeyboardPool::new(),
            timer: RaceTimer::new(),
        }
    }

    pub fn with_timer(mut self, timer: RaceTimer) -> Self {
        self.timer = timer;
        self
    }

    pub fn landscape(&self) -> &Landscape {
        &self.landscape
    }

    pub fn skiers(&self) -> &[Skier] {
        &self.skiers
    }

    /// The skier the camera follows
    pub fn main_skier(&self) -> Option<&Skier> {
        self.skiers.first()
    }

    pub fn timer(&self) -> &RaceTimer {
        &self.timer
    }

    /// Gates the skier hasn't scored yet
    pub fn gates_left(&self, skier: &Skier) -> usize {
        self.landscape.flag_pairs().len().saturating_sub(skier.score())
    }

    /// Every skier has crossed the end of the slope
    pub fn is_over(&self) -> bool {
        !self.skiers.is_empty() && self.skiers.iter().all(Skier::is_finished)
    }

    /// Put a new skier on the start line with the first free keyboard. Pass
    /// an id to keep one chosen elsewhere.
    pub fn add_skier(&mut self, id: Option<Uuid>) -> Result<Uuid> {
        let keyboard = self
            .keyboards
            .lock_free()
            .ok_or_else(|| anyhow!("all {} keyboards are taken", KEYBOARDS.len()))?;

        let id = id.unwrap_or_else(Uuid::new_v4);
        let start = self.start_position(self.skiers.len());
        self.skiers.push(Skier::new(
            id,
            keyboard,
            Rc::clone(&self.poses),
            start,
            Point::default(),
        ));
        Ok(id)
    }

    /// Take a skier out and free their keyboard
    pub fn remove_skier(&mut self, id: Uuid) -> Option<Skier> {
        let index = self.skiers.iter().position(|skier| skier.id() == id)?;
        let skier = self.skiers.remove(index);
        self.keyboards.unlock(skier.keyboard());
        Some(skier)
    }

    /// Alternate around the middle: 0, +1, -1, +2, ...
    fn start_position(&self, slot: usize) -> Point {
        let step = ((slot + 1) / 2) as f64 * START_SPACING;
        let x = if slot % 2 == 1 {
            self.landscape.width() / 2.0 + step
        } else {
            self.landscape.width() / 2.0 - step
        };
        Point::new(x, 0.0)
    }

    /// Advance the race by one frame of `frame_millis` real milliseconds
    pub fn tick(&mut self, keys: &KeyState, frame_millis: f64) -> Vec<RaceEvent> {
        let mut events = Vec::new();

        let was_counting_down = self.timer.is_counting_down();
        self.timer.advance(frame_millis);
        if self.timer.is_counting_down() {
            return events;
        }
        if was_counting_down {
            events.push(RaceEvent::Started);
        }
        if self.is_over() {
            return events;
        }

        let config = self.landscape.config();
        // the frame that ends the countdown only races the time past zero
        let dt = self.timer.millis().min(frame_millis) * config.time_factor;
        let race_millis = self.timer.millis();

        for skier in self.skiers.iter_mut().filter(|skier| !skier.is_finished()) {
            skier.steer(keys);

            let prev = skier.position();
            skier.update(dt, config);
            let pos = skier.position();

            if let Some(index) = self
                .landscape
                .trees()
                .iter()
                .position(|tree| tree.collides_along(prev, pos))
            {
                if skier.crash() {
                    events.push(RaceEvent::Crashed {
                        skier: skier.id(),
                        obstacle: Obstacle::Tree(index),
                    });
                }
            }

            for (index, pair) in self.landscape.flag_pairs().iter().enumerate() {
                let hits_flag = pair
                    .flags()
                    .iter()
                    .any(|flag| flag.collides_along(prev, pos));
                if hits_flag && skier.crash() {
                    events.push(RaceEvent::Crashed {
                        skier: skier.id(),
                        obstacle: Obstacle::Flag(index),
                    });
                }

                if pair.collides_along(prev, pos) && skier.score_gate(index) {
                    events.push(RaceEvent::Scored {
                        skier: skier.id(),
                        gate: index,
                        score: skier.score(),
                    });
                }
            }

            if pos.y > config.height {
                skier.finish(race_millis);
                events.push(RaceEvent::Finished {
                    skier: skier.id(),
                    millis: race_millis,
                });
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{WorldConfig, WorldConfigBuilder};
    use crate::engine::{Size, FRAME_SIZE};
    use crate::landscape::{FlagPair, Tree};
    use crate::skier::tests::poses;
    use crate::timer::COUNTDOWN_MILLIS;
    use approx::assert_relative_eq;

    fn downhill(height: f64) -> WorldConfig {
        WorldConfigBuilder::slalom()
            .set_flag_pairs(0)
            .set_trees(0)
            .set_height(height)
            .build()
            .unwrap()
    }

    fn race(landscape: Landscape) -> Race {
        let mut race = Race::new(landscape, poses()).with_timer(RaceTimer::starting_at(0.0));
        race.add_skier(None).unwrap();
        race
    }

    /// Tick until `done` says so, collecting every event on the way
    fn run_until(race: &mut Race, done: impl Fn(&RaceEvent) -> bool) -> Vec<RaceEvent> {
        let keys = KeyState::new();
        let mut seen = Vec::new();
        for _ in 0..10_000 {
            let events = race.tick(&keys, FRAME_SIZE);
            let stop = events.iter().any(&done);
            seen.extend(events);
            if stop {
                return seen;
            }
        }
        panic!("race never got there, saw {:?}", seen);
    }

    #[test]
    fn nothing_moves_during_the_countdown() {
        let landscape = Landscape::new(downhill(3000.0), vec![], vec![]).unwrap();
        let mut race = Race::new(landscape, poses());
        race.add_skier(None).unwrap();
        let start = race.main_skier().unwrap().position();

        let keys = KeyState::new();
        assert!(race.tick(&keys, COUNTDOWN_MILLIS - 1.0).is_empty());
        assert_eq!(race.main_skier().unwrap().position(), start);

        let events = race.tick(&keys, FRAME_SIZE);
        assert_eq!(events, vec![RaceEvent::Started]);
        assert!(race.main_skier().unwrap().position().y > start.y);
    }

    #[test]
    fn no_head_start_out_of_the_countdown() {
        let keys = KeyState::new();
        let landscape = || Landscape::new(downhill(3000.0), vec![], vec![]).unwrap();

        let mut late = Race::new(landscape(), poses()).with_timer(RaceTimer::starting_at(-8.0));
        late.add_skier(None).unwrap();
        late.tick(&keys, FRAME_SIZE);

        let mut on_time = race(landscape());
        on_time.tick(&keys, FRAME_SIZE - 8.0);

        let late = late.main_skier().unwrap().position();
        let on_time = on_time.main_skier().unwrap().position();
        assert!(late.y > 0.0);
        assert_relative_eq!(late.x, on_time.x);
        assert_relative_eq!(late.y, on_time.y);
    }

    #[test]
    fn passing_between_the_flags_scores_once() {
        let config = downhill(3000.0);
        let gate = FlagPair::new(&config, 200.0, 300.0, Size::new(20.0, 40.0));
        let mut race = race(Landscape::new(config, vec![gate], vec![]).unwrap());
        let id = race.main_skier().unwrap().id();

        let events = run_until(&mut race, |event| matches!(event, RaceEvent::Scored { .. }));
        assert_eq!(
            events.last(),
            Some(&RaceEvent::Scored {
                skier: id,
                gate: 0,
                score: 1
            })
        );

        let events = run_until(&mut race, |event| matches!(event, RaceEvent::Finished { .. }));
        assert!(!events
            .iter()
            .any(|event| matches!(event, RaceEvent::Scored { .. } | RaceEvent::Crashed { .. })));
        let skier = race.main_skier().unwrap();
        assert_eq!(skier.score(), 1);
        assert_eq!(race.gates_left(skier), 0);
    }

    #[test]
    fn hitting_a_tree_knocks_the_skier_down() {
        let config = downhill(3000.0);
        let tree = Tree::new(Point::new(400.0, 200.0), Size::new(40.0, 60.0));
        let mut race = race(Landscape::new(config, vec![], vec![tree]).unwrap());
        let id = race.main_skier().unwrap().id();

        let events = run_until(&mut race, |event| matches!(event, RaceEvent::Crashed { .. }));
        assert_eq!(
            events.last(),
            Some(&RaceEvent::Crashed {
                skier: id,
                obstacle: Obstacle::Tree(0)
            })
        );

        let skier = race.main_skier().unwrap();
        assert!(skier.is_down());
        assert_eq!(skier.velocity(), Point::default());
        let crash_site = skier.position();

        // one second later, still on the ground
        let keys = KeyState::new();
        for _ in 0..60 {
            assert!(race.tick(&keys, FRAME_SIZE).is_empty());
        }
        assert_eq!(race.main_skier().unwrap().position(), crash_site);

        // gets up and carries on without crashing on the same tree again
        let events = run_until(&mut race, |event| matches!(event, RaceEvent::Finished { .. }));
        assert!(!events
            .iter()
            .any(|event| matches!(event, RaceEvent::Crashed { .. })));
    }

    #[test]
    fn hitting_a_pole_is_a_crash() {
        let config = downhill(3000.0);
        // right pole's solid strip covers x in [390, 400]
        let gate = FlagPair::new(&config, 200.0, 200.0, Size::new(20.0, 40.0));
        let mut race = race(Landscape::new(config, vec![gate], vec![]).unwrap());

        let events = run_until(&mut race, |event| matches!(event, RaceEvent::Crashed { .. }));
        assert!(matches!(
            events.last(),
            Some(RaceEvent::Crashed {
                obstacle: Obstacle::Flag(0),
                ..
            })
        ));
    }

    #[test]
    fn crossing_the_bottom_finishes_the_race() {
        let landscape = Landscape::new(downhill(500.0), vec![], vec![]).unwrap();
        let mut race = race(landscape);

        let events = run_until(&mut race, |event| matches!(event, RaceEvent::Finished { .. }));
        let millis = match events.last() {
            Some(RaceEvent::Finished { millis, .. }) => *millis,
            other => panic!("expected a finish, got {:?}", other),
        };
        assert!(millis > 0.0);
        assert!(race.is_over());

        let skier = race.main_skier().unwrap();
        assert_eq!(skier.finished_at(), Some(millis));
        let position = skier.position();
        assert!(race.tick(&KeyState::new(), FRAME_SIZE).is_empty());
        assert_eq!(race.main_skier().unwrap().position(), position);
    }

    #[test]
    fn steering_keys_only_move_their_skier() {
        let landscape = Landscape::new(downhill(3000.0), vec![], vec![]).unwrap();
        let mut race = race(landscape);
        race.add_skier(None).unwrap();

        let mut keys = KeyState::new();
        for _ in 0..60 {
            race.tick(&keys, FRAME_SIZE);
        }
        // arrows belong to the first skier
        keys.set_pressed("ArrowLeft");
        race.tick(&keys, FRAME_SIZE);
        keys.end_update();
        keys.set_pressed("ArrowLeft");
        keys.set_released("ArrowLeft");
        keys.set_pressed("ArrowLeft");
        race.tick(&keys, FRAME_SIZE);
        keys.end_update();

        let first = &race.skiers()[0];
        let second = &race.skiers()[1];
        assert!(first.pose().angle < 0.0);
        assert!(first.velocity().x < 0.0);
        assert_eq!(second.pose().angle, 0.0);
        assert_eq!(second.velocity().x, 0.0);
    }

    #[test]
    fn race_is_over_only_when_everyone_finished() {
        let landscape = Landscape::new(downhill(500.0), vec![], vec![]).unwrap();
        let mut race = race(landscape);
        let second = race.add_skier(None).unwrap();

        // knock the second skier down so the first finishes alone
        race.skiers.iter_mut().find(|s| s.id() == second).unwrap().crash();
        run_until(&mut race, |event| matches!(event, RaceEvent::Finished { .. }));
        assert!(!race.is_over());

        run_until(&mut race, |event| matches!(event, RaceEvent::Finished { .. }));
        assert!(race.is_over());
    }

    #[test]
    fn keyboards_run_out_and_come_back() {
        let landscape = Landscape::new(downhill(3000.0), vec![], vec![]).unwrap();
        let mut race = Race::new(landscape, poses());
        let ids: Vec<Uuid> = (0..4).map(|_| race.add_skier(None).unwrap()).collect();
        assert!(race.add_skier(None).is_err());

        let removed = race.remove_skier(ids[1]).unwrap();
        assert_eq!(removed.id(), ids[1]);
        assert!(race.remove_skier(ids[1]).is_none());

        let chosen = Uuid::new_v4();
        assert_eq!(race.add_skier(Some(chosen)).unwrap(), chosen);
        let newest = race.skiers().last().unwrap();
        assert_eq!(newest.keyboard(), removed.keyboard());
    }

    #[test]
    fn skiers_line_up_around_the_middle() {
        let landscape = Landscape::new(downhill(3000.0), vec![], vec![]).unwrap();
        let mut race = Race::new(landscape, poses());
        for _ in 0..3 {
            race.add_skier(None).unwrap();
        }
        let xs: Vec<f64> = race.skiers().iter().map(|s| s.position().x).collect();
        assert_eq!(xs, vec![400.0, 440.0, 360.0]);
    }
}
