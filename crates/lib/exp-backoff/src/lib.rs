//! Exponential backoff calculator.

#![no_std]

use core::time::Duration;

/// An exponential backoff state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    /// Factor the delay grows by on every failure.
    pub factor: u32,

    /// The delay to start from, and to return to on reset.
    pub min: Duration,

    /// Delay clamp.
    pub max: Duration,

    /// The current delay.
    pub value: Duration,
}

impl State {
    /// Doubling backoff between `min` and `max`.
    pub const fn doubling(min: Duration, max: Duration) -> Self {
        Self {
            factor: 2,
            min,
            max,
            value: min,
        }
    }

    /// Grow the delay after a failure and return it.
    pub fn advance(&mut self) -> Duration {
        self.value = self.value.saturating_mul(self.factor).min(self.max);
        self.value
    }

    /// Peek the current delay.
    pub const fn peek(&self) -> Duration {
        self.value
    }

    /// Go back to the minimal delay.
    pub const fn reset(&mut self) {
        self.value = self.min;
    }
}

#[cfg(test)]
mod tests;
