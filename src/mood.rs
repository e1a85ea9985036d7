//! Mood and drift: the two bounded scalars behind the colour and labels

use crate::models::Record;

/// Inclusive range a scalar is clamped into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

pub const MOOD: Bounds = Bounds::new(0.1, 0.95);
pub const DRIFT: Bounds = Bounds::new(0.05, 0.6);

const BLOOM_MOOD_STEP: f64 = 0.12;
const BLOOM_DRIFT_STEP: f64 = 0.05;
const CALM_MOOD_STEP: f64 = 0.08;
const CALM_DRIFT_STEP: f64 = 0.08;

/// Raise mood and drift for a bloom.
pub fn lift(record: &mut Record) {
    record.mood = MOOD.clamp(record.mood + BLOOM_MOOD_STEP);
    record.drift = DRIFT.clamp(record.drift + BLOOM_DRIFT_STEP);
}

/// Lower mood and drift for calm mode.
pub fn settle(record: &mut Record) {
    record.mood = MOOD.clamp(record.mood - CALM_MOOD_STEP);
    record.drift = DRIFT.clamp(record.drift - CALM_DRIFT_STEP);
}

/// Qualitative reading of the mood scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoodLabel {
    Icy,
    Cosmic,
    Mint,
}

impl MoodLabel {
    pub fn of(mood: f64) -> Self {
        if mood < 0.45 {
            MoodLabel::Icy
        } else if mood < 0.7 {
            MoodLabel::Cosmic
        } else {
            MoodLabel::Mint
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MoodLabel::Icy => "icy",
            MoodLabel::Cosmic => "cosmic",
            MoodLabel::Mint => "mint",
        }
    }
}

/// Qualitative reading of the drift scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftLabel {
    Low,
    Medium,
    Spicy,
}

impl DriftLabel {
    pub fn of(drift: f64) -> Self {
        if drift < 0.18 {
            DriftLabel::Low
        } else if drift < 0.3 {
            DriftLabel::Medium
        } else {
            DriftLabel::Spicy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DriftLabel::Low => "low",
            DriftLabel::Medium => "medium",
            DriftLabel::Spicy => "spicy",
        }
    }
}

impl std::fmt::Display for MoodLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for DriftLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
