use clap::ValueEnum;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Rival temperament preset. Careful types slower but cleaner; aggressive
/// types faster, fumbles more, and tires quicker.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Personality {
    Careful,
    Balanced,
    Aggressive,
}

/// The four ways the simulated typist gets a character wrong.
#[derive(Debug, Copy, Clone, PartialEq, Eq, strum_macros::Display)]
pub enum MistakeKind {
    Adjacent,
    Double,
    Skip,
    Transpose,
}

/// Relative frequency of each mistake kind. These are weights, not strict
/// probabilities: draws normalize by the total, so the fields need not sum
/// to exactly one.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct MistakeWeights {
    pub adjacent: f64,
    pub double: f64,
    pub skip: f64,
    pub transpose: f64,
}

impl Default for MistakeWeights {
    fn default() -> Self {
        Self {
            adjacent: 0.5,
            double: 0.2,
            skip: 0.2,
            transpose: 0.1,
        }
    }
}

impl MistakeWeights {
    pub fn total(&self) -> f64 {
        self.adjacent + self.double + self.skip + self.transpose
    }

    /// Weighted draw of a mistake kind. Degenerate weights (zero or
    /// negative total) fall back to the adjacent kind.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> MistakeKind {
        let total = self.total();
        if total <= 0.0 {
            return MistakeKind::Adjacent;
        }
        let draw = rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        let table = [
            (MistakeKind::Adjacent, self.adjacent),
            (MistakeKind::Double, self.double),
            (MistakeKind::Skip, self.skip),
            (MistakeKind::Transpose, self.transpose),
        ];
        for (kind, weight) in table {
            cumulative += weight;
            if draw < cumulative {
                return kind;
            }
        }
        MistakeKind::Adjacent
    }
}

/// Immutable tuning for one simulated typist.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    pub personality: Personality,
    /// Base typing speed in words per minute.
    pub base_speed: f64,
    /// Per-character probability of injecting a mistake.
    pub mistake_rate: f64,
    pub mistake_weights: MistakeWeights,
    /// Fraction of base speed lost per elapsed minute.
    pub fatigue_factor: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self::preset(Personality::Balanced)
    }
}

impl SimulatorConfig {
    pub fn preset(personality: Personality) -> Self {
        let (base_speed, mistake_rate, fatigue_factor) = match personality {
            Personality::Careful => (70.0, 0.02, 0.03),
            Personality::Balanced => (80.0, 0.03, 0.05),
            Personality::Aggressive => (90.0, 0.04, 0.07),
        };
        Self {
            personality,
            base_speed,
            mistake_rate,
            mistake_weights: MistakeWeights::default(),
            fatigue_factor,
        }
    }

    pub fn with_overrides(mut self, overrides: &SimulatorOverrides) -> Self {
        if let Some(base_speed) = overrides.base_speed {
            self.base_speed = base_speed;
        }
        if let Some(mistake_rate) = overrides.mistake_rate {
            self.mistake_rate = mistake_rate;
        }
        if let Some(mistake_weights) = overrides.mistake_weights {
            self.mistake_weights = mistake_weights;
        }
        if let Some(fatigue_factor) = overrides.fatigue_factor {
            self.fatigue_factor = fatigue_factor;
        }
        self
    }
}

/// Field-level overrides applied on top of a preset.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulatorOverrides {
    pub base_speed: Option<f64>,
    pub mistake_rate: Option<f64>,
    pub mistake_weights: Option<MistakeWeights>,
    pub fatigue_factor: Option<f64>,
}
