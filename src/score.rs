//! Score and the score-driven speed ramp.

/// Points gathered since the last speed step needed to earn the next one.
pub const STEP_THRESHOLD: u64 = 500;
/// Each step shaves this percentage off the frame delay.
const STEP_PERCENT: u64 = 5;
/// The delay never drops below this.
pub const MIN_DELAY_MS: u64 = 50;

/// Frame delay and step count. The delay only ever decreases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeedRamp {
    delay_ms: u64,
    accumulated: u64,
    steps: u32,
}

impl SpeedRamp {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms: delay_ms.max(MIN_DELAY_MS),
            accumulated: 0,
            steps: 0,
        }
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn accumulated(&self) -> u64 {
        self.accumulated
    }

    /// Add points; step at most once when the accumulator passes the
    /// threshold. The excess carries over. Returns true on a step.
    pub fn record(&mut self, points: u64) -> bool {
        self.accumulated += points;
        if self.accumulated <= STEP_THRESHOLD || self.delay_ms <= MIN_DELAY_MS {
            return false;
        }
        let cut = (self.delay_ms * STEP_PERCENT / 100).max(1);
        self.delay_ms = self.delay_ms.saturating_sub(cut).max(MIN_DELAY_MS);
        self.accumulated -= STEP_THRESHOLD;
        self.steps += 1;
        true
    }
}

/// Monotonic score counter plus the speed ramp it drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scoreboard {
    score: u64,
    pub ramp: SpeedRamp,
}

impl Scoreboard {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            score: 0,
            ramp: SpeedRamp::new(delay_ms),
        }
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    /// Credit points to both the score and the speed accumulator. Returns
    /// true if the game sped up.
    pub fn award(&mut self, points: u64) -> bool {
        self.score += points;
        points > 0 && self.ramp.record(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_awards_do_not_step() {
        let mut board = Scoreboard::new(250);
        assert!(!board.award(300));
        assert!(!board.award(200));
        assert_eq!(board.score(), 500);
        assert_eq!(board.ramp.delay_ms(), 250);
        assert_eq!(board.ramp.steps(), 0);
    }

    #[test]
    fn crossing_the_threshold_cuts_five_percent() {
        let mut board = Scoreboard::new(250);
        assert!(board.award(504));
        assert_eq!(board.ramp.delay_ms(), 238);
        assert_eq!(board.ramp.steps(), 1);
        assert_eq!(board.ramp.accumulated(), 4);
        assert_eq!(board.score(), 504);
    }

    #[test]
    fn delay_never_increases_and_stops_at_floor() {
        let mut ramp = SpeedRamp::new(120);
        let mut last = ramp.delay_ms();
        for _ in 0..200 {
            ramp.record(600);
            assert!(ramp.delay_ms() <= last);
            last = ramp.delay_ms();
        }
        assert_eq!(ramp.delay_ms(), MIN_DELAY_MS);
        let steps = ramp.steps();
        assert!(!ramp.record(10_000));
        assert_eq!(ramp.steps(), steps);
    }

    #[test]
    fn zero_points_change_nothing() {
        let mut board = Scoreboard::new(175);
        assert!(!board.award(0));
        assert_eq!(board, Scoreboard::new(175));
    }
}
