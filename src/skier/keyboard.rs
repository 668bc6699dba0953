use crate::engine::input::KeyState;

/// A pair of steering keys, by `KeyboardEvent.code`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Keyboard {
    pub left: &'static str,
    pub right: &'static str,
}

/// Layouts handed out to local skiers, in order
pub const KEYBOARDS: [Keyboard; 4] = [
    Keyboard {
        left: "ArrowLeft",
        right: "ArrowRight",
    },
    Keyboard {
        left: "KeyA",
        right: "KeyD",
    },
    Keyboard {
        left: "KeyH",
        right: "KeyK",
    },
    Keyboard {
        left: "Numpad7",
        right: "Numpad9",
    },
];

impl Keyboard {
    pub fn is_turning_left(&self, keys: &KeyState) -> bool {
        keys.was_pressed(self.left)
    }

    pub fn is_turning_right(&self, keys: &KeyState) -> bool {
        keys.was_pressed(self.right)
    }
}

/// Which layouts are taken, one per skier
#[derive(Debug, Default)]
pub struct KeyboardPool {
    locked: [bool; KEYBOARDS.len()],
}

impl KeyboardPool {
    pub fn new() -> Self {
        KeyboardPool::default()
    }

    pub fn is_locked(&self, keyboard: &Keyboard) -> bool {
        Self::index_of(keyboard).map_or(false, |index| self.locked[index])
    }

    /// false if the keyboard was already taken
    pub fn lock(&mut self, keyboard: &Keyboard) -> bool {
        match Self::index_of(keyboard) {
            Some(index) if !self.locked[index] => {
                self.locked[index] = true;
                true
            }
            _ => false,
        }
    }

    pub fn unlock(&mut self, keyboard: &Keyboard) {
        if let Some(index) = Self::index_of(keyboard) {
            self.locked[index] = false;
        }
    }

    /// Lock and return the first free layout
    pub fn lock_free(&mut self) -> Option<Keyboard> {
        let keyboard = KEYBOARDS.iter().find(|keyboard| !self.is_locked(keyboard))?;
        self.lock(keyboard);
        Some(*keyboard)
    }

    fn index_of(keyboard: &Keyboard) -> Option<usize> {
        KEYBOARDS.iter().position(|known| known == keyboard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_are_handed_out_in_order_until_exhausted() {
        let mut pool = KeyboardPool::new();
        for expected in KEYBOARDS {
            assert_eq!(pool.lock_free(), Some(expected));
        }
        assert_eq!(pool.lock_free(), None);
    }

    #[test]
    fn unlocked_layout_is_reused() {
        let mut pool = KeyboardPool::new();
        let arrows = pool.lock_free().unwrap();
        let wasd = pool.lock_free().unwrap();
        assert!(!pool.lock(&arrows));

        pool.unlock(&arrows);
        assert!(!pool.is_locked(&arrows));
        assert!(pool.is_locked(&wasd));
        assert_eq!(pool.lock_free(), Some(arrows));
    }

    #[test]
    fn turning_reads_fresh_presses_only() {
        let keyboard = KEYBOARDS[1];
        let mut keys = KeyState::new();
        keys.set_pressed("KeyA");
        assert!(keyboard.is_turning_left(&keys));
        assert!(!keyboard.is_turning_right(&keys));

        keys.end_update();
        assert!(!keyboard.is_turning_left(&keys));
    }
}
