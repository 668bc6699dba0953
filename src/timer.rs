/// Length of the countdown before a race, in milliseconds
pub const COUNTDOWN_MILLIS: f64 = 3000.0;

/// Race clock in milliseconds, negative while counting down
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RaceTimer {
    millis: f64,
}

impl Default for RaceTimer {
    fn default() -> Self {
        RaceTimer::starting_at(-COUNTDOWN_MILLIS)
    }
}

impl RaceTimer {
    pub fn new() -> Self {
        RaceTimer::default()
    }

    /// Start from an arbitrary point, e.g. to line up with another race's
    /// clock or to skip the countdown with 0
    pub fn starting_at(millis: f64) -> Self {
        RaceTimer { millis }
    }

    pub fn advance(&mut self, millis: f64) {
        self.millis += millis;
    }

    pub fn millis(&self) -> f64 {
        self.millis
    }

    pub fn is_counting_down(&self) -> bool {
        self.millis < 0.0
    }
}

/// Clock text for the header
/// - counting down : whole seconds left, "3", "2", "1"
/// - racing        : "m:ss.ss"
pub fn format_millis(millis: f64) -> String {
    if millis < 0.0 {
        return format!("{}", (-millis / 1000.0).floor() as i64 + 1);
    }

    let seconds = (millis / 10.0).round() / 100.0;
    let minutes = (seconds / 60.0).floor();
    let seconds = seconds - minutes * 60.0;

    format!("{}:{:05.2}", minutes as i64, seconds)
}
