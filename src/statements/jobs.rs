use tracing::{info, warn};

use super::StatementExtractor;
use crate::auth::Session;
use crate::db::{self, Database};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{ImportRequest, Ledger, SignPolicy};
use crate::models::*;

/// Outcome of one job picked up by [`run_pending`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JobRun {
    pub(crate) job_id: i64,
    pub(crate) status: JobStatus,
    pub(crate) inserted: usize,
    pub(crate) error: Option<String>,
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Store raw statement text for later extraction.
pub(crate) fn upload_statement(
    db: &Database,
    session: &Session,
    file_name: &str,
    content: &str,
) -> LedgerResult<i64> {
    let user = session.require()?;
    if file_name.trim().is_empty() {
        return Err(LedgerError::invalid("file name is required"));
    }
    if content.trim().is_empty() {
        return Err(LedgerError::invalid(format!("{file_name} is empty")));
    }
    let id = db::insert_statement_file(db.conn(), user, file_name.trim(), content, &now())?;
    info!(statement_file_id = id, file = file_name, bytes = content.len(), "statement uploaded");
    Ok(id)
}

/// Queue extraction of an uploaded statement. The job starts `pending`.
pub(crate) fn schedule_statement(
    db: &Database,
    session: &Session,
    statement_file_id: i64,
) -> LedgerResult<i64> {
    let user = session.require()?;
    let file = db::get_statement_file(db.conn(), statement_file_id)?
        .ok_or_else(|| LedgerError::NotFound(format!("statement file {statement_file_id}")))?;
    if file.user_id != user {
        return Err(LedgerError::Unauthorized(format!("statement file {statement_file_id}")));
    }
    let job_id = db::insert_job(db.conn(), user, JobKind::ProcessStatement, file.id, &now())?;
    info!(job_id, statement_file_id, "statement job scheduled");
    Ok(job_id)
}

pub(crate) fn job_status(db: &Database, session: &Session, job_id: i64) -> LedgerResult<Job> {
    let user = session.require()?;
    let job = db::get_job(db.conn(), job_id)?
        .ok_or_else(|| LedgerError::NotFound(format!("job {job_id}")))?;
    if job.user_id != user {
        return Err(LedgerError::Unauthorized(format!("job {job_id}")));
    }
    Ok(job)
}

pub(crate) fn cancel_job(db: &Database, session: &Session, job_id: i64) -> LedgerResult<()> {
    let job = job_status(db, session, job_id)?;
    if job.status.is_finished() {
        return Err(LedgerError::invalid(format!(
            "job {job_id} already finished as {}",
            job.status
        )));
    }
    if !db::finish_job(db.conn(), job_id, JobStatus::Canceled, None, &now())? {
        return Err(LedgerError::invalid(format!("job {job_id} is no longer pending")));
    }
    info!(job_id, "job canceled");
    Ok(())
}

/// Run every pending job in creation order. Each job extracts its statement
/// and imports the records as one batch for the job's owner, settling the job
/// in the same commit. A job that fails records its error and leaves the
/// ledger untouched. A job canceled while it ran keeps its status and
/// imports nothing.
pub(crate) fn run_pending(
    db: &mut Database,
    extractor: &StatementExtractor<'_>,
    policy: SignPolicy,
) -> LedgerResult<Vec<JobRun>> {
    let queued = db::pending_jobs(db.conn())?;
    let mut runs = Vec::with_capacity(queued.len());

    for job in queued {
        // Canceled since the queue was read.
        let still_pending = db::get_job(db.conn(), job.id)?
            .is_some_and(|j| j.status == JobStatus::Pending);
        if !still_pending {
            continue;
        }

        let run = match process(db, extractor, policy, &job) {
            Ok(inserted) => {
                info!(job_id = job.id, inserted, "job succeeded");
                JobRun {
                    job_id: job.id,
                    status: JobStatus::Success,
                    inserted,
                    error: None,
                }
            }
            Err(LedgerError::Storage(e)) => return Err(LedgerError::Storage(e)),
            Err(e) => {
                let message = e.to_string();
                let failed =
                    db::finish_job(db.conn(), job.id, JobStatus::Failed, Some(&message), &now())?;
                let status = if failed {
                    warn!(job_id = job.id, code = e.code(), error = %message, "job failed");
                    JobStatus::Failed
                } else {
                    let settled = db::get_job(db.conn(), job.id)?
                        .ok_or_else(|| LedgerError::NotFound(format!("job {}", job.id)))?;
                    info!(job_id = job.id, status = %settled.status, "job left pending while running");
                    settled.status
                };
                JobRun {
                    job_id: job.id,
                    status,
                    inserted: 0,
                    error: Some(message),
                }
            }
        };
        runs.push(run);
    }
    Ok(runs)
}

fn process(
    db: &mut Database,
    extractor: &StatementExtractor<'_>,
    policy: SignPolicy,
    job: &Job,
) -> LedgerResult<usize> {
    let file = db::get_statement_file(db.conn(), job.statement_file_id)?
        .ok_or_else(|| LedgerError::NotFound(format!("statement file {}", job.statement_file_id)))?;
    let transactions = extractor.extract(&file.content)?;
    let imported = Ledger::new(db, policy).import_batch(
        &Session::signed_in(job.user_id),
        ImportRequest {
            file_name: file.file_name,
            statement_file_id: Some(file.id),
            job_id: Some(job.id),
            transactions,
        },
    )?;
    Ok(imported.inserted)
}
