/// Seconds a crashed skier stays on the ground
pub const DOWN_TIME: f64 = 2.0;
/// Seconds after a crash before the skier can crash again
pub const INVULN_TIME: f64 = 4.0;

/// ┌──────────────── Condition Transition Flow ─────────────────┐
/// │  From        →  Event            →  To                     │
/// ├────────────────────────────────────────────────────────────┤
/// │  Skiing      →  Crash            →  Fallen                 │
/// │  Fallen      →  Tick (≥ DOWN)    →  Recovering             │
/// │  Recovering  →  Tick (≥ INVULN)  →  Skiing                 │
/// │  any         →  Finish           →  Finished               │
/// └────────────────────────────────────────────────────────────┘
/// Everything else keeps the current condition: crashing while already down
/// or recovering does nothing, and a finished skier stays finished.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Condition {
    Skiing,
    /// on the ground, ignores steering and doesn't move
    Fallen { elapsed: f64 },
    /// back up, can't crash again yet
    Recovering { elapsed: f64 },
    /// crossed the end of the slope after `millis` of racing
    Finished { millis: f64 },
}

pub enum Event {
    Crash,
    Tick(f64),
    Finish(f64),
}

impl Condition {
    pub fn transition(self, event: Event) -> Self {
        use Condition::*;
        match (self, event) {
            (Finished { .. }, _) => self,
            (_, Event::Finish(millis)) => Finished { millis },
            (Skiing, Event::Crash) => Fallen { elapsed: 0.0 },
            (Fallen { elapsed }, Event::Tick(dt)) | (Recovering { elapsed }, Event::Tick(dt)) => {
                Self::since_crash(elapsed + dt)
            }
            _ => self,
        }
    }

    fn since_crash(elapsed: f64) -> Self {
        if elapsed >= INVULN_TIME {
            Condition::Skiing
        } else if elapsed >= DOWN_TIME {
            Condition::Recovering { elapsed }
        } else {
            Condition::Fallen { elapsed }
        }
    }

    pub fn is_down(&self) -> bool {
        matches!(self, Condition::Fallen { .. })
    }

    pub fn can_crash(&self) -> bool {
        matches!(self, Condition::Skiing)
    }

    pub fn finished_at(&self) -> Option<f64> {
        match self {
            Condition::Finished { millis } => Some(*millis),
            _ => None,
        }
    }
}
