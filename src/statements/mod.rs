//! Statement import: raw uploads, AI extraction into transaction records,
//! and the job queue that feeds each extracted batch to the ledger.

mod extract;
mod jobs;

pub(crate) use extract::StatementExtractor;
pub(crate) use jobs::{cancel_job, job_status, run_pending, schedule_statement, upload_statement};

#[cfg(test)]
mod tests;
