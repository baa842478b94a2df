use crate::clock::{millis_between, Clock};
use crate::simulator::Simulator;
use crate::util::{accuracy_percent, std_dev};
use crate::TICK_RATE_MS;
use clap::ValueEnum;
use itertools::Itertools;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::SystemTime;

#[derive(Clone, Debug, Copy, PartialEq)]
pub enum KeyOutcome {
    Correct,
    Incorrect,
}

/// One keystroke as typed by a participant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keystroke {
    pub char: char,
    pub outcome: KeyOutcome,
    pub timestamp: SystemTime,
}

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Race the clock; every miss adds a one second penalty.
    Classic,
    /// The prompt reveals itself at an oscillating speed.
    Dynamic,
    /// Head-to-head against the simulated rival.
    Rival,
}

/// WPM observed at a moment of the run, for plotting progress over time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WpmSample {
    pub t: f64,
    pub wpm: f64,
}

/// One participant's side of a race: the prompt, everything typed so far,
/// and the results once computed.
///
/// Input is append-only; there is no backspace, so a miss stays a miss.
#[derive(Debug)]
pub struct Session {
    pub prompt: String,
    pub mode: GameMode,
    pub keystrokes: Vec<Keystroke>,
    pub started_at: Option<SystemTime>,
    pub seconds_remaining: Option<f64>,
    pub time_limit: Option<f64>,
    pub penalty_secs: f64,
    pub wpm: f64,
    pub accuracy: f64,
    pub consistency: f64,
    pub wpm_series: Vec<WpmSample>,
}

impl Session {
    pub fn new(prompt: impl Into<String>, mode: GameMode, time_limit: Option<f64>) -> Self {
        Self {
            prompt: prompt.into(),
            mode,
            keystrokes: vec![],
            started_at: None,
            seconds_remaining: time_limit,
            time_limit,
            penalty_secs: 0.0,
            wpm: 0.0,
            accuracy: 0.0,
            consistency: 0.0,
            wpm_series: vec![],
        }
    }

    pub fn has_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn has_finished(&self) -> bool {
        self.keystrokes.len() >= self.prompt.chars().count()
            || matches!(self.seconds_remaining, Some(secs) if secs <= 0.0)
    }

    /// Record one typed character. The first keystroke starts the clock;
    /// anything typed past the end of the prompt is ignored.
    pub fn write(&mut self, c: char, now: SystemTime) {
        let idx = self.keystrokes.len();
        let expected = match self.prompt.chars().nth(idx) {
            Some(expected) => expected,
            None => return,
        };
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }

        let outcome = if c == expected {
            KeyOutcome::Correct
        } else {
            KeyOutcome::Incorrect
        };
        if outcome == KeyOutcome::Incorrect && self.mode == GameMode::Classic {
            self.penalty_secs += 1.0;
        }

        self.keystrokes.push(Keystroke {
            char: c,
            outcome,
            timestamp: now,
        });
    }

    /// Advance the countdown by one tick, for time-limited runs.
    pub fn on_tick(&mut self) {
        if let Some(secs) = self.seconds_remaining {
            self.seconds_remaining = Some(secs - TICK_RATE_MS as f64 / 1000.0);
        }
    }

    pub fn correct_count(&self) -> usize {
        self.keystrokes
            .iter()
            .filter(|k| k.outcome == KeyOutcome::Correct)
            .count()
    }

    pub fn miss_count(&self) -> usize {
        self.keystrokes.len() - self.correct_count()
    }

    /// Accuracy over what has been typed so far; 100 before any input.
    pub fn live_accuracy(&self) -> f64 {
        accuracy_percent(self.correct_count(), self.keystrokes.len())
    }

    /// Total run time in seconds, penalties included.
    pub fn total_secs(&self, now: SystemTime) -> f64 {
        let raw = self
            .started_at
            .map(|start| millis_between(start, now) / 1000.0)
            .unwrap_or(0.0);
        raw + self.penalty_secs
    }

    /// Compute the final WPM, accuracy, consistency, and the per-second
    /// WPM series. Call once the run is over.
    pub fn calc_results(&mut self, now: SystemTime) {
        let started_at = match self.started_at {
            Some(started_at) => started_at,
            None => return,
        };

        // Correct keystrokes bucketed into whole seconds since the start.
        let per_second: Vec<(f64, f64)> = self
            .keystrokes
            .iter()
            .filter(|k| k.outcome == KeyOutcome::Correct)
            .fold(HashMap::new(), |mut buckets, k| {
                let secs = millis_between(started_at, k.timestamp) / 1000.0;
                let bucket = secs.ceil().max(1.0) as u64;
                *buckets.entry(bucket).or_insert(0u64) += 1;
                buckets
            })
            .into_iter()
            .sorted_by(|a, b| a.0.cmp(&b.0))
            .map(|(secs, count)| (secs as f64, count as f64))
            .collect();

        self.wpm_series.clear();
        let mut typed_so_far = 0.0;
        for (secs, count) in &per_second {
            typed_so_far += count;
            self.wpm_series.push(WpmSample {
                t: *secs,
                wpm: (60.0 / secs) * typed_so_far / 5.0,
            });
        }

        let throughput: Vec<f64> = per_second.iter().map(|(_, count)| *count).collect();
        self.consistency = std_dev(&throughput).unwrap_or(0.0);

        let total = self.total_secs(now);
        self.wpm = if total > 0.0 {
            ((self.correct_count() as f64 / 5.0) / (total / 60.0)).ceil()
        } else {
            0.0
        };
        self.accuracy = self.live_accuracy().round();
    }
}

/// Winner of a rival race, judged at the moment of inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RaceOutcome {
    PlayerWin,
    RivalWin,
    Draw,
}

/// A head-to-head run: the local session plus a simulated rival typing the
/// same prompt.
///
/// The rival starts the instant the player types their first character,
/// and is advanced by polling on the shared tick.
pub struct Race<R: Rng, C: Clock> {
    pub session: Session,
    rival: Simulator<R, C>,
    rival_running: bool,
    pub rival_typed: String,
    pub rival_mistakes: usize,
}

impl<R: Rng, C: Clock> Race<R, C> {
    pub fn new(prompt: impl Into<String>, time_limit: Option<f64>, rival: Simulator<R, C>) -> Self {
        Self {
            session: Session::new(prompt, GameMode::Rival, time_limit),
            rival,
            rival_running: false,
            rival_typed: String::new(),
            rival_mistakes: 0,
        }
    }

    pub fn player_key(&mut self, c: char, now: SystemTime) {
        if !self.rival_running {
            self.rival.start_run(&self.session.prompt);
            self.rival_running = true;
        }
        self.session.write(c, now);
    }

    /// Poll the rival once; no-op until the player has started.
    pub fn poll_rival(&mut self) {
        if !self.rival_running || self.rival.is_done() {
            return;
        }
        let emission = self.rival.next_emission();
        if emission.is_idle() {
            return;
        }
        if emission.mistake {
            self.rival_mistakes += 1;
        }
        self.rival_typed.push_str(&emission.keys);
    }

    pub fn rival_finished(&self) -> bool {
        self.rival_running && self.rival.is_done()
    }

    /// Rival progress through the prompt, in percent.
    pub fn rival_progress(&self) -> f64 {
        let total = self.session.prompt.chars().count();
        if total == 0 || !self.rival_running {
            return 0.0;
        }
        (self.rival.stats().position as f64 / total as f64) * 100.0
    }

    /// `None` while both sides are still typing. The first side observed
    /// finished wins; a simultaneous finish is a draw.
    pub fn outcome(&self) -> Option<RaceOutcome> {
        match (self.session.has_finished(), self.rival_finished()) {
            (true, true) => Some(RaceOutcome::Draw),
            (true, false) => Some(RaceOutcome::PlayerWin),
            (false, true) => Some(RaceOutcome::RivalWin),
            (false, false) => None,
        }
    }
}
