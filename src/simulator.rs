use crate::clock::{millis_between, Clock, SystemClock};
use crate::keyboard::{adjacent_keys, is_implausible_cluster, is_sentence_punctuation, is_vowel};
use crate::profile::{MistakeKind, SimulatorConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::SystemTime;

/// Assumed word length for WPM conversion.
const CHARS_PER_WORD: f64 = 5.0;
/// Fatigue never drags the effective speed below this floor.
const MIN_EFFECTIVE_WPM: f64 = 1.0;

const NO_RUN: &str = "simulator polled before start_run; call start_run first";

/// One simulated keystroke event.
///
/// `keys` is empty when the pacing budget has not been reached this tick
/// (nothing to emit). A double-press carries both characters in one event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Emission {
    pub keys: String,
    pub mistake: bool,
}

impl Emission {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.keys.is_empty()
    }

    fn key(c: char) -> Self {
        Self {
            keys: c.to_string(),
            mistake: false,
        }
    }

    fn mistake(keys: impl Into<String>) -> Self {
        Self {
            keys: keys.into(),
            mistake: true,
        }
    }
}

/// Read-only snapshot of a run in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunStats {
    pub position: usize,
    pub mistakes: usize,
    pub elapsed_secs: f64,
    pub accuracy: f64,
}

#[derive(Debug)]
struct Run {
    text: Vec<char>,
    cursor: usize,
    mistakes: usize,
    consecutive_correct: usize,
    cooldown_ms: f64,
    cooldown_touched: SystemTime,
    started_at: SystemTime,
    /// Total keystroke delay already spent; the next character is due once
    /// real elapsed time passes this plus its own delay.
    spent_delay_ms: f64,
}

/// Produces a human-like keystroke stream over a target text.
///
/// The caller polls [`next_emission`](Simulator::next_emission) on a fixed
/// interval (50ms in the stock setup); the simulator does no scheduling of
/// its own. Randomness and time are injected so runs can be replayed
/// deterministically.
pub struct Simulator<R: Rng, C: Clock> {
    config: SimulatorConfig,
    rng: R,
    clock: C,
    run: Option<Run>,
}

pub type StdSimulator = Simulator<StdRng, SystemClock>;

impl Simulator<StdRng, SystemClock> {
    pub fn new(config: SimulatorConfig) -> Self {
        Self::with_parts(config, StdRng::from_entropy(), SystemClock)
    }

    /// Seeded variant for reproducible keystroke streams.
    pub fn seeded(config: SimulatorConfig, seed: u64) -> Self {
        Self::with_parts(config, StdRng::seed_from_u64(seed), SystemClock)
    }
}

impl<R: Rng, C: Clock> Simulator<R, C> {
    pub fn with_parts(config: SimulatorConfig, rng: R, clock: C) -> Self {
        Self {
            config,
            rng,
            clock,
            run: None,
        }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Begin typing `text`, discarding any previous run.
    pub fn start_run(&mut self, text: &str) {
        let now = self.clock.now();
        self.run = Some(Run {
            text: text.chars().collect(),
            cursor: 0,
            mistakes: 0,
            consecutive_correct: 0,
            cooldown_ms: 0.0,
            cooldown_touched: now,
            started_at: now,
            spent_delay_ms: 0.0,
        });
    }

    /// Whether the current run has consumed the whole target text.
    pub fn is_done(&self) -> bool {
        matches!(&self.run, Some(run) if run.cursor >= run.text.len())
    }

    /// Poll for the next keystroke. Returns an idle emission when the run
    /// is finished or not enough wall time has passed for the next key.
    ///
    /// Panics if called before [`start_run`](Simulator::start_run).
    pub fn next_emission(&mut self) -> Emission {
        let now = self.clock.now();
        let (elapsed_ms, spent_ms, current) = {
            let run = self.run.as_ref().expect(NO_RUN);
            if run.cursor >= run.text.len() {
                return Emission::idle();
            }
            (
                millis_between(run.started_at, now),
                run.spent_delay_ms,
                run.text[run.cursor],
            )
        };

        let delay_ms = self.char_delay_ms(elapsed_ms, current);
        if elapsed_ms < spent_ms + delay_ms {
            return Emission::idle();
        }

        // Cooldown decays by the real time since it was last touched.
        {
            let run = self.run.as_mut().expect(NO_RUN);
            if run.cooldown_ms > 0.0 {
                run.cooldown_ms -= millis_between(run.cooldown_touched, now);
                run.cooldown_touched = now;
            }
        }

        let probability = self.mistake_probability();
        let cooled_down = self.run.as_ref().expect(NO_RUN).cooldown_ms <= 0.0;
        if cooled_down && self.rng.gen::<f64>() < probability {
            let cooldown_ms = 500.0 + self.rng.gen::<f64>() * 1000.0;
            {
                let run = self.run.as_mut().expect(NO_RUN);
                run.mistakes += 1;
                run.consecutive_correct = 0;
                run.cooldown_ms = cooldown_ms;
                run.cooldown_touched = now;
            }
            let kind = self.config.mistake_weights.sample(&mut self.rng);
            return self.emit_mistake(kind, delay_ms);
        }

        let run = self.run.as_mut().expect(NO_RUN);
        run.consecutive_correct += 1;
        run.spent_delay_ms += delay_ms;
        let c = run.text[run.cursor];
        run.cursor += 1;
        Emission::key(c)
    }

    /// Snapshot of the current run.
    ///
    /// Panics if called before [`start_run`](Simulator::start_run).
    pub fn stats(&self) -> RunStats {
        let run = self.run.as_ref().expect(NO_RUN);
        let elapsed_secs = millis_between(run.started_at, self.clock.now()) / 1000.0;
        let accuracy = if run.cursor == 0 {
            100.0
        } else {
            ((run.cursor as f64 - run.mistakes as f64) / run.cursor as f64) * 100.0
        };
        RunStats {
            position: run.cursor,
            mistakes: run.mistakes,
            elapsed_secs,
            accuracy,
        }
    }

    /// Delay this keystroke must wait for, in milliseconds: the fatigued
    /// per-character time with 10% jitter, plus a beat after sentence
    /// punctuation.
    fn char_delay_ms(&mut self, elapsed_ms: f64, current: char) -> f64 {
        let elapsed_minutes = elapsed_ms / 60_000.0;
        let speed = (self.config.base_speed
            * (1.0 - elapsed_minutes * self.config.fatigue_factor))
            .max(MIN_EFFECTIVE_WPM);
        let ms_per_char = 60_000.0 / (speed * CHARS_PER_WORD);
        let jittered = ms_per_char * (0.9 + self.rng.gen::<f64>() * 0.2);
        let pause = if is_sentence_punctuation(current) {
            150.0 + self.rng.gen::<f64>() * 100.0
        } else {
            0.0
        };
        jittered + pause
    }

    /// Mistake chance for the next key: the configured rate, damped 1% per
    /// correct keystroke in the current streak.
    fn mistake_probability(&self) -> f64 {
        let streak = self.run.as_ref().expect(NO_RUN).consecutive_correct as f64;
        (self.config.mistake_rate * (1.0 - streak * 0.01)).clamp(0.0, 1.0)
    }

    fn spend_delay(&mut self, delay_ms: f64) {
        self.run.as_mut().expect(NO_RUN).spent_delay_ms += delay_ms;
    }

    fn emit_mistake(&mut self, kind: MistakeKind, delay_ms: f64) -> Emission {
        let (current, cursor, len) = {
            let run = self.run.as_ref().expect(NO_RUN);
            (run.text[run.cursor], run.cursor, run.text.len())
        };

        match kind {
            MistakeKind::Adjacent => {
                // Unknown characters have no neighbors; the typist "hits"
                // the intended key, still logged as a fumble.
                let fallback = [current];
                let neighbors: &[char] = adjacent_keys(current).unwrap_or(fallback.as_slice());
                let (common, rest) = neighbors.split_at(neighbors.len().min(2));
                let pool = if rest.is_empty() || self.rng.gen::<f64>() < 0.7 {
                    common
                } else {
                    rest
                };
                let pick = pool[self.rng.gen_range(0..pool.len())];
                self.spend_delay(delay_ms);
                Emission::mistake(pick.to_string())
            }
            MistakeKind::Double => {
                if is_vowel(current) {
                    self.spend_delay(delay_ms);
                    let mut keys = String::with_capacity(2);
                    keys.push(current);
                    keys.push(current);
                    Emission::mistake(keys)
                } else {
                    // Only vowels get doubled; otherwise this tick is
                    // re-evaluated from scratch.
                    self.next_emission()
                }
            }
            MistakeKind::Skip => {
                let chance = if is_vowel(current) || is_sentence_punctuation(current) {
                    0.3
                } else {
                    0.7
                };
                if self.rng.gen::<f64>() < chance {
                    // Jump past the character without emitting it and try
                    // again at the new position.
                    self.run.as_mut().expect(NO_RUN).cursor += 1;
                    self.next_emission()
                } else {
                    // A declined skip emits the intended character but the
                    // keystroke stays logged as a mistake.
                    self.spend_delay(delay_ms);
                    Emission::mistake(current.to_string())
                }
            }
            MistakeKind::Transpose => {
                if cursor + 1 < len {
                    let next = self.run.as_ref().expect(NO_RUN).text[cursor + 1];
                    if !is_implausible_cluster(&[current, next, next]) {
                        self.run.as_mut().expect(NO_RUN).cursor += 1;
                        self.spend_delay(delay_ms);
                        return Emission::mistake(next.to_string());
                    }
                }
                self.spend_delay(delay_ms);
                Emission::mistake(current.to_string())
            }
        }
    }
}
