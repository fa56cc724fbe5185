//! Row-partial-tolerant CSV import of PM tasks.
//!
//! Each data row is validated and committed independently: a malformed row
//! is reported as an error without rolling back or blocking sibling rows.
//! This is the one deliberate exception to the fail-fast propagation policy.

use super::scheduler::{CreatePmTaskRequest, PmSchedulerService};
use crate::pm::domain::{Priority, UserId};
use crate::pm::ports::{EntitlementProvider, PmTaskRepository, SiteRepository};
use chrono::NaiveDate;
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::io::Read;
use tracing::debug;
use uuid::Uuid;

/// Outcome of importing one CSV data row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CsvRowOutcome {
    /// The row produced a new open task.
    Created,
    /// The row was blank and ignored.
    Skipped,
    /// The row was malformed or failed validation.
    Error,
}

/// Per-row import report entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsvRowReport {
    /// 1-based data-row number (the header row is not counted).
    pub row_number: usize,
    /// Row outcome.
    pub outcome: CsvRowOutcome,
    /// Human-readable detail: the created task id or the failure reason.
    pub message: String,
}

/// Ordered report of a CSV import run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct CsvImportReport {
    rows: Vec<CsvRowReport>,
}

impl CsvImportReport {
    /// Returns the per-row reports in input order.
    #[must_use]
    pub fn rows(&self) -> &[CsvRowReport] {
        &self.rows
    }

    /// Returns the number of rows with the given outcome.
    #[must_use]
    pub fn count(&self, outcome: CsvRowOutcome) -> usize {
        self.rows.iter().filter(|row| row.outcome == outcome).count()
    }
}

/// Expected CSV columns. Missing optional columns deserialize to `None`.
#[derive(Debug, Deserialize)]
struct CsvTaskRow {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    scheduled_date: Option<String>,
    #[serde(default)]
    frequency: Option<String>,
    #[serde(default)]
    custom_interval_days: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    assigned_to: Option<String>,
}

impl CsvTaskRow {
    fn is_blank(&self) -> bool {
        [
            &self.title,
            &self.scheduled_date,
            &self.frequency,
            &self.custom_interval_days,
            &self.priority,
            &self.assigned_to,
        ]
        .into_iter()
        .all(|field| field.as_deref().is_none_or(|value| value.trim().is_empty()))
    }

    /// Builds a creation request from the raw row values.
    fn into_request(self) -> Result<CreatePmTaskRequest, String> {
        let title = self
            .title
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| "missing title".to_owned())?
            .to_owned();
        let scheduled_raw = self
            .scheduled_date
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| "missing scheduled_date".to_owned())?;
        let scheduled_date = NaiveDate::parse_from_str(scheduled_raw, "%Y-%m-%d")
            .map_err(|err| format!("invalid scheduled_date '{scheduled_raw}': {err}"))?;
        let frequency = self
            .frequency
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or("monthly")
            .to_owned();

        let mut request = CreatePmTaskRequest::new(title, scheduled_date, frequency);

        if let Some(raw) = trimmed(self.custom_interval_days.as_deref()) {
            let days: u32 = raw
                .parse()
                .map_err(|err| format!("invalid custom_interval_days '{raw}': {err}"))?;
            request = request.with_custom_interval(days);
        }
        if let Some(raw) = trimmed(self.priority.as_deref()) {
            let priority =
                Priority::try_from(raw).map_err(|err| format!("invalid priority: {err}"))?;
            request = request.with_priority(priority);
        }
        if let Some(raw) = trimmed(self.assigned_to.as_deref()) {
            let user: Uuid = raw
                .parse()
                .map_err(|err| format!("invalid assigned_to '{raw}': {err}"))?;
            request = request.with_assignee(UserId::from_uuid(user));
        }
        Ok(request)
    }
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|raw| !raw.is_empty())
}

impl<S, E, C> PmSchedulerService<S, E, C>
where
    S: PmTaskRepository + SiteRepository,
    E: EntitlementProvider,
    C: Clock + Send + Sync,
{
    /// Imports PM tasks from CSV data with a header row.
    ///
    /// Rows are processed sequentially and committed independently; the
    /// call itself never fails on row content. Blank rows report
    /// [`CsvRowOutcome::Skipped`]; unreadable, malformed, or rejected rows
    /// report [`CsvRowOutcome::Error`] with the reason.
    pub async fn import_csv<R: Read>(&self, actor: UserId, source: R) -> CsvImportReport {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(source);

        let mut report = CsvImportReport::default();
        for (index, record) in reader.deserialize::<CsvTaskRow>().enumerate() {
            let row_number = index.saturating_add(1);
            let entry = match record {
                Err(err) => CsvRowReport {
                    row_number,
                    outcome: CsvRowOutcome::Error,
                    message: format!("unreadable row: {err}"),
                },
                Ok(row) if row.is_blank() => CsvRowReport {
                    row_number,
                    outcome: CsvRowOutcome::Skipped,
                    message: "blank row".to_owned(),
                },
                Ok(row) => match row.into_request() {
                    Err(message) => CsvRowReport {
                        row_number,
                        outcome: CsvRowOutcome::Error,
                        message,
                    },
                    Ok(request) => match self.create_task(actor, request).await {
                        Ok(view) => CsvRowReport {
                            row_number,
                            outcome: CsvRowOutcome::Created,
                            message: view.id.to_string(),
                        },
                        Err(err) => CsvRowReport {
                            row_number,
                            outcome: CsvRowOutcome::Error,
                            message: err.to_string(),
                        },
                    },
                },
            };
            report.rows.push(entry);
        }
        debug!(
            created = report.count(CsvRowOutcome::Created),
            skipped = report.count(CsvRowOutcome::Skipped),
            errors = report.count(CsvRowOutcome::Error),
            "csv import finished"
        );
        report
    }
}
