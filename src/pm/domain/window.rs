//! Completion-window validation for PM tasks.

use super::PmDomainError;
use chrono::NaiveDate;

/// Tolerance, in days, around the scheduled date within which a completion
/// date is accepted. Inclusive on both sides.
pub const COMPLETION_WINDOW_DAYS: i64 = 15;

/// Symmetric tolerance window around a scheduled date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionWindow {
    days: i64,
}

impl CompletionWindow {
    /// Creates a window of `days` on either side of the scheduled date.
    #[must_use]
    pub const fn new(days: i64) -> Self {
        Self { days }
    }

    /// Returns the window half-width in days.
    #[must_use]
    pub const fn days(self) -> i64 {
        self.days
    }

    /// Validates a proposed completion date against the scheduled date.
    ///
    /// Both early and late completions outside the window are rejected; the
    /// reported `days_away` is the absolute offset for user messaging.
    ///
    /// # Errors
    ///
    /// Returns [`PmDomainError::CompletionOutOfWindow`] when the offset
    /// exceeds the window in either direction.
    pub fn validate(self, scheduled: NaiveDate, completed: NaiveDate) -> Result<(), PmDomainError> {
        let days_away = completed.signed_duration_since(scheduled).num_days().abs();
        if days_away > self.days {
            return Err(PmDomainError::CompletionOutOfWindow { days_away });
        }
        Ok(())
    }
}

impl Default for CompletionWindow {
    fn default() -> Self {
        Self::new(COMPLETION_WINDOW_DAYS)
    }
}
