//! Recurrence frequency classification and the recurrence calculator.

use super::{ParseFrequencyError, PmDomainError};
use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Recurrence interval classification for a PM task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Every day.
    Daily,
    /// Every 7 days.
    Weekly,
    /// Every 14 days.
    Biweekly,
    /// Every calendar month.
    Monthly,
    /// Every 3 calendar months.
    Quarterly,
    /// Every 6 calendar months.
    SemiAnnual,
    /// Every 12 calendar months.
    Annual,
    /// Every `custom_interval_days` days.
    Custom,
}

impl Frequency {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::SemiAnnual => "semi_annual",
            Self::Annual => "annual",
            Self::Custom => "custom",
        }
    }

    /// Interprets an externally supplied frequency name.
    ///
    /// Unrecognised names fall back to [`Frequency::Monthly`]. This is the
    /// lenient entry point for caller input; persisted values go through the
    /// strict [`TryFrom`] conversion instead so storage corruption is never
    /// papered over.
    #[must_use]
    pub fn from_name(value: &str) -> Self {
        Self::try_from(value).unwrap_or(Self::Monthly)
    }

    /// Computes the next anchor date after `anchor` for this frequency.
    ///
    /// Day-based frequencies add a fixed duration. Month-based frequencies
    /// add calendar months with the day-of-month clamped to the length of
    /// the target month, so Jan 31 + 1 month lands on Feb 28 (or 29 in a
    /// leap year) and Jan 31 + 3 months lands on Apr 30.
    ///
    /// # Errors
    ///
    /// Returns [`PmDomainError::InvalidFrequencyConfig`] for a custom
    /// frequency without a positive `custom_interval_days`, and
    /// [`PmDomainError::DateOutOfRange`] when the addition overflows the
    /// supported calendar range.
    pub fn next_occurrence(
        self,
        anchor: NaiveDate,
        custom_interval_days: Option<u32>,
    ) -> Result<NaiveDate, PmDomainError> {
        let next = match self {
            Self::Daily => anchor.checked_add_days(Days::new(1)),
            Self::Weekly => anchor.checked_add_days(Days::new(7)),
            Self::Biweekly => anchor.checked_add_days(Days::new(14)),
            Self::Custom => {
                let interval = custom_interval_days.filter(|days| *days > 0).ok_or(
                    PmDomainError::InvalidFrequencyConfig {
                        interval: custom_interval_days,
                    },
                )?;
                anchor.checked_add_days(Days::new(u64::from(interval)))
            }
            Self::Monthly => anchor.checked_add_months(Months::new(1)),
            Self::Quarterly => anchor.checked_add_months(Months::new(3)),
            Self::SemiAnnual => anchor.checked_add_months(Months::new(6)),
            Self::Annual => anchor.checked_add_months(Months::new(12)),
        };
        next.ok_or(PmDomainError::DateOutOfRange(anchor))
    }

    /// Validates the custom-interval configuration for this frequency.
    ///
    /// Non-custom frequencies ignore the field entirely.
    ///
    /// # Errors
    ///
    /// Returns [`PmDomainError::InvalidFrequencyConfig`] for a custom
    /// frequency with a missing or non-positive interval.
    pub fn validate_interval(self, custom_interval_days: Option<u32>) -> Result<(), PmDomainError> {
        if self == Self::Custom && custom_interval_days.filter(|days| *days > 0).is_none() {
            return Err(PmDomainError::InvalidFrequencyConfig {
                interval: custom_interval_days,
            });
        }
        Ok(())
    }
}

impl TryFrom<&str> for Frequency {
    type Error = ParseFrequencyError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "biweekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "semi_annual" => Ok(Self::SemiAnnual),
            "annual" => Ok(Self::Annual),
            "custom" => Ok(Self::Custom),
            _ => Err(ParseFrequencyError(value.to_owned())),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
