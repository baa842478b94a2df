use crate::clock::millis_between;
use crate::util::mean;
use std::collections::VecDeque;
use std::time::SystemTime;

/// Slowest and fastest reveal multipliers for the dynamic mode.
pub const FLOOR_SPEED: f64 = 3.0;
pub const CEILING_SPEED: f64 = 20.0;
/// How much the multiplier moves per adjustment.
const SPEED_STEP: f64 = 1.0;
/// Minimum time between two adjustments.
const CHECK_INTERVAL_MS: f64 = 300.0;
/// Rolling accuracy must stay above this for the pacer to move at all.
const ACCURACY_GATE: f64 = 85.0;
/// Rolling window size, in accuracy samples.
const SAMPLE_WINDOW: usize = 2;

/// Oscillating difficulty controller for the dynamic mode.
///
/// While the player's rolling accuracy stays high the reveal speed climbs
/// one step at a time; at the ceiling it turns around and descends back to
/// the floor, then climbs again. Sloppy typing freezes the speed where it
/// is.
#[derive(Debug, Clone)]
pub struct SpeedPacer {
    speed: f64,
    rising: bool,
    samples: VecDeque<f64>,
    last_check: Option<SystemTime>,
}

impl SpeedPacer {
    pub fn new() -> Self {
        Self {
            speed: FLOOR_SPEED,
            rising: true,
            samples: VecDeque::with_capacity(SAMPLE_WINDOW),
            last_check: None,
        }
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn is_rising(&self) -> bool {
        self.rising
    }

    /// Milliseconds between successive character reveals at the current
    /// speed, never below 20ms.
    pub fn reveal_interval_ms(&self) -> f64 {
        (1000.0 / self.speed).max(20.0)
    }

    /// Feed one accuracy observation (percent). Throttled internally: at
    /// most one adjustment per check interval.
    pub fn observe(&mut self, accuracy: f64, now: SystemTime) {
        if let Some(last) = self.last_check {
            if millis_between(last, now) <= CHECK_INTERVAL_MS {
                return;
            }
        }
        self.last_check = Some(now);

        self.samples.push_back(accuracy);
        while self.samples.len() > SAMPLE_WINDOW {
            self.samples.pop_front();
        }

        let rolling = mean(&self.samples.iter().copied().collect::<Vec<_>>()).unwrap_or(0.0);
        if rolling > ACCURACY_GATE {
            self.step();
        }
    }

    fn step(&mut self) {
        if self.rising {
            self.speed += SPEED_STEP;
            if self.speed >= CEILING_SPEED {
                self.speed = CEILING_SPEED;
                self.rising = false;
            }
        } else {
            self.speed -= SPEED_STEP;
            if self.speed <= FLOOR_SPEED {
                self.speed = FLOOR_SPEED;
                self.rising = true;
            }
        }
    }
}

impl Default for SpeedPacer {
    fn default() -> Self {
        Self::new()
    }
}

/// How much of the prompt the dynamic mode has revealed so far.
///
/// Opens at a fixed head start and grows one character per reveal
/// interval, at whatever speed the pacer currently dictates.
#[derive(Debug, Clone)]
pub struct RevealWindow {
    shown: usize,
    last_reveal: Option<SystemTime>,
}

/// Characters visible before the first reveal tick.
const INITIAL_REVEAL: usize = 20;

impl RevealWindow {
    pub fn new() -> Self {
        Self {
            shown: INITIAL_REVEAL,
            last_reveal: None,
        }
    }

    /// Number of characters of a `total`-length prompt currently visible.
    pub fn visible(&self, total: usize) -> usize {
        self.shown.min(total)
    }

    /// Advance the window according to elapsed time and the pacer speed.
    pub fn poll(&mut self, pacer: &SpeedPacer, now: SystemTime, total: usize) {
        let interval = pacer.reveal_interval_ms();
        let last = *self.last_reveal.get_or_insert(now);
        let mut elapsed = millis_between(last, now);
        while elapsed >= interval && self.shown < total {
            self.shown += 1;
            elapsed -= interval;
            self.last_reveal = Some(now);
        }
    }
}

impl Default for RevealWindow {
    fn default() -> Self {
        Self::new()
    }
}
