use std::time::Duration;

use thiserror::Error;

use crate::buffer::BlockKind;

/// Used whenever a pause instruction cannot be understood.
pub const DEFAULT_PAUSE_SECS: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PauseSpecError {
    #[error("expected `<number> <unit>`, got {0} token(s)")]
    TokenCount(usize),
    #[error("invalid duration value: {0:?}")]
    InvalidNumber(String),
    #[error("unknown duration unit: {0:?}")]
    UnknownUnit(String),
    #[error("duration out of range: {0:?}")]
    OutOfRange(String),
}

/// Length of a timed pause, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PauseDuration {
    seconds: f64,
    defaulted: bool,
}

impl Default for PauseDuration {
    fn default() -> Self {
        Self {
            seconds: DEFAULT_PAUSE_SECS,
            defaulted: true,
        }
    }
}

impl PauseDuration {
    pub fn from_secs(seconds: f64) -> Self {
        Self {
            seconds,
            defaulted: false,
        }
    }

    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    /// Saturates at `Duration::MAX`; NaN and negative values become zero.
    pub fn as_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.seconds).unwrap_or(if self.seconds > 0.0 {
            Duration::MAX
        } else {
            Duration::ZERO
        })
    }

    /// True when the instruction was malformed and the default was used.
    pub fn is_defaulted(&self) -> bool {
        self.defaulted
    }

    /// Strict form of [`parse_pause_duration`].
    pub fn parse_strict(spec: &str) -> Result<Self, PauseSpecError> {
        let tokens: Vec<&str> = spec.split_whitespace().collect();
        let [value, unit] = tokens.as_slice() else {
            return Err(PauseSpecError::TokenCount(tokens.len()));
        };

        let amount: f64 = value
            .parse()
            .ok()
            .filter(|n: &f64| n.is_finite() && *n >= 0.0)
            .ok_or_else(|| PauseSpecError::InvalidNumber((*value).to_string()))?;

        let multiplier = match unit.to_lowercase().as_str() {
            "second" | "seconds" => 1.0,
            "minute" | "minutes" => 60.0,
            _ => return Err(PauseSpecError::UnknownUnit((*unit).to_string())),
        };

        let seconds = amount * multiplier;
        if !(seconds.is_finite() && seconds < Duration::MAX.as_secs_f64()) {
            return Err(PauseSpecError::OutOfRange(spec.trim().to_string()));
        }

        Ok(Self::from_secs(seconds))
    }

    /// Parses a whole `<pause>…</pause>` block, tags optional.
    pub fn from_block(raw: &str) -> Self {
        parse_pause_duration(inner_text(raw))
    }
}

/// Parses `"<number> seconds|second|minutes|minute"`, falling back to
/// [`DEFAULT_PAUSE_SECS`] on anything else.
pub fn parse_pause_duration(spec: &str) -> PauseDuration {
    match PauseDuration::parse_strict(spec.trim()) {
        Ok(duration) => duration,
        Err(err) => {
            log::warn!("pause instruction {spec:?} not understood ({err}), using default");
            PauseDuration::default()
        }
    }
}

fn inner_text(raw: &str) -> &str {
    let kind = BlockKind::Pause;
    let raw = raw.trim();
    let raw = raw.strip_prefix(kind.open_tag()).unwrap_or(raw);
    let raw = raw.strip_suffix(kind.close_tag()).unwrap_or(raw);
    raw.trim()
}
