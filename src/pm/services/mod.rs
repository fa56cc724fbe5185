//! Application services orchestrating PM scheduling operations.

mod import;
mod scheduler;

pub use import::{CsvImportReport, CsvRowOutcome, CsvRowReport};
pub use scheduler::{
    CompletionOutcome, CreatePmTaskRequest, PmSchedulerError, PmSchedulerResult,
    PmSchedulerService, PmTaskView,
};
