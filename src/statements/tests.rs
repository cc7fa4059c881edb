#![allow(clippy::unwrap_used)]

use std::cell::RefCell;
use std::collections::VecDeque;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::extract::{parse_extraction, CATEGORIES};
use super::jobs::JobRun;
use super::*;
use crate::ai::CompletionClient;
use crate::auth::Session;
use crate::db::{self, Database};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{Ledger, SignPolicy};
use crate::models::{JobStatus, Month, TransactionKind};

/// Replays canned replies in order and remembers every prompt.
#[derive(Default)]
struct ScriptedClient {
    replies: RefCell<VecDeque<Result<String, String>>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedClient {
    fn replying(replies: &[&str]) -> Self {
        let client = Self::default();
        for r in replies {
            client.replies.borrow_mut().push_back(Ok(r.to_string()));
        }
        client
    }

    fn failing(message: &str) -> Self {
        let client = Self::default();
        client.replies.borrow_mut().push_back(Err(message.into()));
        client
    }
}

impl CompletionClient for ScriptedClient {
    fn complete(&self, prompt: &str) -> LedgerResult<String> {
        self.prompts.borrow_mut().push(prompt.to_string());
        match self.replies.borrow_mut().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(LedgerError::AiError(message)),
            None => Err(LedgerError::AiError("no scripted reply left".into())),
        }
    }
}

/// Cancels a job through a second connection while the model is answering,
/// the way a `job cancel` from another process would.
struct CancelingClient {
    other: Database,
    owner: Session,
    job_id: i64,
}

impl CompletionClient for CancelingClient {
    fn complete(&self, _prompt: &str) -> LedgerResult<String> {
        cancel_job(&self.other, &self.owner, self.job_id)?;
        Ok(DECEMBER.into())
    }
}

const DECEMBER: &str = r#"{"transactions": [
    {"date": "2024-12-02", "description": "Market", "amount": 40, "type": "expense", "category": "Food & Dining"},
    {"date": "2024-12-03", "description": "Bakery", "amount": 60.00, "type": "expense", "category": "Food & Dining"},
    {"date": "2024-12-04", "description": "Refund - Bakery", "amount": 10, "type": "income", "category": "Food & Dining"}
]}"#;

fn setup() -> (Database, Session) {
    let db = Database::open_in_memory().unwrap();
    let user = db.register_user("alice").unwrap();
    (db, Session::signed_in(user))
}

// ── Extraction parsing ────────────────────────────────────────

#[test]
fn test_parse_valid_reply() {
    let records = parse_extraction(DECEMBER).unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].amount, dec!(40));
    assert_eq!(records[1].amount, dec!(60.00));
    assert_eq!(records[2].kind, TransactionKind::Income);
    assert_eq!(records[2].description, "Refund - Bakery");
    assert_eq!(records[0].category, "Food & Dining");
}

#[test]
fn test_parse_fenced_reply() {
    let fenced = format!("```json\n{DECEMBER}\n```");
    assert_eq!(parse_extraction(&fenced).unwrap().len(), 3);
}

#[test]
fn test_parse_keeps_exact_decimals() {
    let raw = r#"{"transactions": [
        {"date": "2024-12-02", "description": "a", "amount": 0.1, "type": "expense", "category": "Other"},
        {"date": "2024-12-02", "description": "b", "amount": "19.99", "type": "expense", "category": "Other"}
    ]}"#;
    let records = parse_extraction(raw).unwrap();
    assert_eq!(records[0].amount, dec!(0.1));
    assert_eq!(records[1].amount, dec!(19.99));
}

#[test]
fn test_parse_empty_transactions_is_ok() {
    assert!(parse_extraction(r#"{"transactions": []}"#).unwrap().is_empty());
}

#[test]
fn test_parse_empty_reply_is_ai_error() {
    assert_eq!(parse_extraction("").unwrap_err().code(), "AI_ERROR");
}

#[test]
fn test_parse_rejects_non_json_and_wrong_shape() {
    assert_eq!(parse_extraction("no idea").unwrap_err().code(), "INVALID_INPUT");
    assert_eq!(parse_extraction("[]").unwrap_err().code(), "INVALID_INPUT");
    assert_eq!(
        parse_extraction(r#"{"transactions": "none"}"#).unwrap_err().code(),
        "INVALID_INPUT"
    );
}

#[test]
fn test_parse_names_bad_record() {
    let cases = [
        r#"{"description": "x", "amount": 1, "type": "expense", "category": "Other"}"#,
        r#"{"date": "someday", "description": "x", "amount": 1, "type": "expense", "category": "Other"}"#,
        r#"{"date": "2024-12-02", "description": "x", "amount": -5, "type": "expense", "category": "Other"}"#,
        r#"{"date": "2024-12-02", "description": "x", "amount": 0, "type": "expense", "category": "Other"}"#,
        r#"{"date": "2024-12-02", "description": "x", "amount": 1, "type": "transfer", "category": "Other"}"#,
        r#"{"date": "2024-12-02", "description": "x", "amount": 1, "type": "expense", "category": " "}"#,
        r#"{"date": "2024-12-02", "amount": 1, "type": "expense", "category": "Other"}"#,
    ];
    let good = r#"{"date": "2024-12-01", "description": "ok", "amount": 1, "type": "expense", "category": "Other"}"#;
    for bad in cases {
        let raw = format!(r#"{{"transactions": [{good}, {bad}]}}"#);
        let err = parse_extraction(&raw).unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT", "{bad}");
        assert!(err.to_string().contains("record 1"), "{err}");
    }
}

#[test]
fn test_extractor_prompt_carries_statement_and_categories() {
    let client = ScriptedClient::replying(&[DECEMBER]);
    let extractor = StatementExtractor::new(&client);
    extractor.extract("12/02 MARKET 40.00").unwrap();

    let prompts = client.prompts.borrow();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("12/02 MARKET 40.00"));
    for category in CATEGORIES {
        assert!(prompts[0].contains(category));
    }
}

#[test]
fn test_extractor_rejects_blank_statement_without_calling_model() {
    let client = ScriptedClient::default();
    let err = StatementExtractor::new(&client).extract("  \n").unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");
    assert!(client.prompts.borrow().is_empty());
}

// ── Upload and scheduling ─────────────────────────────────────

#[test]
fn test_upload_requires_session_and_content() {
    let (db, s) = setup();
    let anon = Session::anonymous();
    assert_eq!(
        upload_statement(&db, &anon, "dec.txt", "x").unwrap_err().code(),
        "UNAUTHENTICATED"
    );
    assert_eq!(
        upload_statement(&db, &s, "dec.txt", "   ").unwrap_err().code(),
        "INVALID_INPUT"
    );
    assert_eq!(upload_statement(&db, &s, "", "x").unwrap_err().code(), "INVALID_INPUT");
}

#[test]
fn test_schedule_checks_owner() {
    let (db, alice) = setup();
    let bob = Session::signed_in(db.register_user("bob").unwrap());
    let file = upload_statement(&db, &alice, "dec.txt", "statement").unwrap();

    assert_eq!(schedule_statement(&db, &bob, file).unwrap_err().code(), "UNAUTHORIZED");
    assert_eq!(schedule_statement(&db, &alice, file + 99).unwrap_err().code(), "NOT_FOUND");

    let job_id = schedule_statement(&db, &alice, file).unwrap();
    let job = job_status(&db, &alice, job_id).unwrap();
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.statement_file_id, file);
    assert_eq!(job_status(&db, &bob, job_id).unwrap_err().code(), "UNAUTHORIZED");
}

#[test]
fn test_cancel_pending_then_finished() {
    let (db, s) = setup();
    let file = upload_statement(&db, &s, "dec.txt", "statement").unwrap();
    let job_id = schedule_statement(&db, &s, file).unwrap();

    cancel_job(&db, &s, job_id).unwrap();
    let job = job_status(&db, &s, job_id).unwrap();
    assert_eq!(job.status, JobStatus::Canceled);
    assert!(job.finished_at.is_some());

    assert_eq!(cancel_job(&db, &s, job_id).unwrap_err().code(), "INVALID_INPUT");
}

// ── Running jobs ──────────────────────────────────────────────

#[test]
fn test_run_pending_imports_batch() {
    let (mut db, s) = setup();
    let user = s.require().unwrap();
    let dec_2024 = Month::parse("2024-12").unwrap();
    Ledger::new(&mut db, SignPolicy::RefundOnly)
        .set_budget(&s, "Food & Dining", dec!(500), &dec_2024)
        .unwrap();

    let file = upload_statement(&db, &s, "december.txt", "raw statement").unwrap();
    let job_id = schedule_statement(&db, &s, file).unwrap();

    let client = ScriptedClient::replying(&[DECEMBER]);
    let runs = run_pending(&mut db, &StatementExtractor::new(&client), SignPolicy::RefundOnly).unwrap();
    assert_eq!(
        runs,
        vec![JobRun {
            job_id,
            status: JobStatus::Success,
            inserted: 3,
            error: None,
        }]
    );

    let budgets = db::budgets_for_month(db.conn(), user, &dec_2024).unwrap();
    assert_eq!(budgets[0].category, "Food & Dining");
    assert_eq!(budgets[0].spent, dec!(90));

    let summaries = db::latest_processed_statements(db.conn(), user, 10).unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].file_name, "december.txt");
    assert_eq!(summaries[0].statement_file_id, Some(file));
    assert_eq!(summaries[0].transaction_count, 3);
    assert_eq!(job_status(&db, &s, job_id).unwrap().status, JobStatus::Success);
}

#[test]
fn test_failed_extraction_writes_nothing() {
    let (mut db, s) = setup();
    let user = s.require().unwrap();
    let file = upload_statement(&db, &s, "december.txt", "raw statement").unwrap();
    let job_id = schedule_statement(&db, &s, file).unwrap();

    let client = ScriptedClient::replying(&["not json at all"]);
    let runs = run_pending(&mut db, &StatementExtractor::new(&client), SignPolicy::RefundOnly).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, JobStatus::Failed);

    let job = job_status(&db, &s, job_id).unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.unwrap().contains("not JSON"));
    assert_eq!(db::count_transactions(db.conn(), user).unwrap(), 0);
    assert!(db::latest_processed_statements(db.conn(), user, 10).unwrap().is_empty());
}

#[test]
fn test_model_failure_fails_job_and_queue_continues() {
    let (mut db, s) = setup();
    let first = upload_statement(&db, &s, "nov.txt", "november").unwrap();
    let second = upload_statement(&db, &s, "dec.txt", "december").unwrap();
    let first_job = schedule_statement(&db, &s, first).unwrap();
    let second_job = schedule_statement(&db, &s, second).unwrap();

    let client = ScriptedClient::failing("upstream timeout");
    client.replies.borrow_mut().push_back(Ok(DECEMBER.into()));

    let runs = run_pending(&mut db, &StatementExtractor::new(&client), SignPolicy::RefundOnly).unwrap();
    let statuses: Vec<(i64, JobStatus)> = runs.iter().map(|r| (r.job_id, r.status)).collect();
    assert_eq!(
        statuses,
        vec![(first_job, JobStatus::Failed), (second_job, JobStatus::Success)]
    );
    assert_eq!(runs[0].error.as_deref().map(|e| e.contains("upstream timeout")), Some(true));
    // The second prompt saw the second statement
    assert!(client.prompts.borrow()[1].contains("december"));
}

#[test]
fn test_canceled_jobs_are_skipped() {
    let (mut db, s) = setup();
    let file = upload_statement(&db, &s, "dec.txt", "statement").unwrap();
    let job_id = schedule_statement(&db, &s, file).unwrap();
    cancel_job(&db, &s, job_id).unwrap();

    let client = ScriptedClient::default();
    let runs = run_pending(&mut db, &StatementExtractor::new(&client), SignPolicy::RefundOnly).unwrap();
    assert!(runs.is_empty());
    assert!(client.prompts.borrow().is_empty());
}

#[test]
fn test_job_imports_for_owner_only() {
    let (mut db, alice) = setup();
    let bob = Session::signed_in(db.register_user("bob").unwrap());
    let file = upload_statement(&db, &bob, "bob.txt", "statement").unwrap();
    schedule_statement(&db, &bob, file).unwrap();

    let client = ScriptedClient::replying(&[DECEMBER]);
    run_pending(&mut db, &StatementExtractor::new(&client), SignPolicy::RefundOnly).unwrap();

    let alice_count = db::count_transactions(db.conn(), alice.require().unwrap()).unwrap();
    let bob_count = db::count_transactions(db.conn(), bob.require().unwrap()).unwrap();
    assert_eq!((alice_count, bob_count), (0, 3));
    let total: Decimal = db::all_transactions(db.conn(), bob.require().unwrap())
        .unwrap()
        .iter()
        .map(|t| t.amount)
        .sum();
    assert_eq!(total, dec!(110));
}

#[test]
fn test_job_canceled_during_extraction_imports_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.db");
    let mut db = Database::open(&path).unwrap();
    let user = db.register_user("alice").unwrap();
    let s = Session::signed_in(user);
    Ledger::new(&mut db, SignPolicy::RefundOnly)
        .set_budget(&s, "Food & Dining", dec!(500), &Month::parse("2024-12").unwrap())
        .unwrap();
    let file = upload_statement(&db, &s, "december.txt", "raw statement").unwrap();
    let job_id = schedule_statement(&db, &s, file).unwrap();

    let client = CancelingClient {
        other: Database::open(&path).unwrap(),
        owner: Session::signed_in(user),
        job_id,
    };
    let runs = run_pending(&mut db, &StatementExtractor::new(&client), SignPolicy::RefundOnly).unwrap();

    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, JobStatus::Canceled);
    assert_eq!(runs[0].inserted, 0);
    assert!(runs[0].error.as_deref().unwrap().contains("no longer pending"));

    assert_eq!(job_status(&db, &s, job_id).unwrap().status, JobStatus::Canceled);
    assert_eq!(db::count_transactions(db.conn(), user).unwrap(), 0);
    assert!(db::latest_processed_statements(db.conn(), user, 10).unwrap().is_empty());
    let budgets = db::budgets_for_month(db.conn(), user, &Month::parse("2024-12").unwrap()).unwrap();
    assert_eq!(budgets[0].spent, Decimal::ZERO);
}
