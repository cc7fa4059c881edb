#![allow(clippy::unwrap_used)]

use super::*;
use crate::ledger::{Ledger, SignPolicy};
use rust_decimal_macros::dec;
use std::cell::RefCell;

struct CannedClient {
    reply: String,
    prompt: RefCell<Option<String>>,
}

impl CannedClient {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.into(),
            prompt: RefCell::new(None),
        }
    }
}

impl CompletionClient for CannedClient {
    fn complete(&self, prompt: &str) -> LedgerResult<String> {
        *self.prompt.borrow_mut() = Some(prompt.to_string());
        Ok(self.reply.clone())
    }
}

const TWO_INSIGHTS: &str = r#"{"insights": [
    {"type": "budget_alert", "title": "Food over budget", "description": "You spent 120 of 100.", "priority": "high"},
    {"type": "savings_tip", "title": "Cook at home", "description": "Groceries are cheaper.", "priority": "low"}
]}"#;

fn setup_with_spending() -> (Database, Session, Month) {
    let mut db = Database::open_in_memory().unwrap();
    let s = Session::signed_in(db.register_user("alice").unwrap());
    let month = Month::parse("2024-12").unwrap();
    Ledger::new(&mut db, SignPolicy::RefundOnly)
        .set_budget(&s, "Food", dec!(100), &month)
        .unwrap();
    Ledger::new(&mut db, SignPolicy::RefundOnly)
        .add_transaction(
            &s,
            NewTransaction {
                amount: dec!(120),
                description: "Groceries".into(),
                category: "Food".into(),
                date: "2024-12-03".into(),
                kind: Some(TransactionKind::Expense),
                is_recurring: false,
            },
        )
        .unwrap();
    (db, s, month)
}

#[test]
fn test_no_transactions_is_no_data() {
    let mut db = Database::open_in_memory().unwrap();
    let s = Session::signed_in(db.register_user("alice").unwrap());
    let client = CannedClient::new(TWO_INSIGHTS);
    let err = generate_insights(&mut db, &s, &client, &Month::parse("2024-12").unwrap()).unwrap_err();
    assert_eq!(err.code(), "NO_DATA");
    assert!(client.prompt.borrow().is_none());
}

#[test]
fn test_generate_stores_unread_insights() {
    let (mut db, s, month) = setup_with_spending();
    let client = CannedClient::new(TWO_INSIGHTS);
    let ids = generate_insights(&mut db, &s, &client, &month).unwrap();
    assert_eq!(ids.len(), 2);

    let stored = latest_insights(&db, &s).unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|i| !i.is_read));
    assert_eq!(stored[1].kind, InsightKind::BudgetAlert);
    assert_eq!(stored[1].priority, Priority::High);

    let prompt = client.prompt.borrow().clone().unwrap();
    assert!(prompt.contains("Total transactions: 1"));
    assert!(prompt.contains("Categories: Food"));
    assert!(prompt.contains("\"overBudget\":true"));
}

#[test]
fn test_malformed_insight_stores_nothing() {
    let (mut db, s, month) = setup_with_spending();
    let reply = r#"{"insights": [
        {"type": "budget_alert", "title": "ok", "description": "ok", "priority": "high"},
        {"type": "prophecy", "title": "?", "description": "?", "priority": "low"}
    ]}"#;
    let err = generate_insights(&mut db, &s, &CannedClient::new(reply), &month).unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");
    assert!(err.to_string().contains("insight 1"));
    assert!(latest_insights(&db, &s).unwrap().is_empty());
}

#[test]
fn test_empty_reply_is_ai_error() {
    let (mut db, s, month) = setup_with_spending();
    let err = generate_insights(&mut db, &s, &CannedClient::new(""), &month).unwrap_err();
    assert_eq!(err.code(), "AI_ERROR");
}

#[test]
fn test_mark_read_and_mark_all() {
    let (mut db, s, month) = setup_with_spending();
    let ids = generate_insights(&mut db, &s, &CannedClient::new(TWO_INSIGHTS), &month).unwrap();

    mark_read(&db, &s, ids[0]).unwrap();
    assert_eq!(mark_all_read(&db, &s).unwrap(), 1);
    assert_eq!(mark_all_read(&db, &s).unwrap_err().code(), "NO_UNREAD_INSIGHTS");
}

#[test]
fn test_mark_read_checks_owner() {
    let (mut db, alice, month) = setup_with_spending();
    let bob = Session::signed_in(db.register_user("bob").unwrap());
    let ids = generate_insights(&mut db, &alice, &CannedClient::new(TWO_INSIGHTS), &month).unwrap();

    assert_eq!(mark_read(&db, &bob, ids[0]).unwrap_err().code(), "UNAUTHORIZED");
    assert_eq!(mark_read(&db, &alice, 9999).unwrap_err().code(), "NOT_FOUND");
    assert_eq!(mark_all_read(&db, &bob).unwrap_err().code(), "NO_UNREAD_INSIGHTS");
}

#[test]
fn test_latest_insights_caps_at_ten() {
    let (mut db, s, month) = setup_with_spending();
    for _ in 0..6 {
        generate_insights(&mut db, &s, &CannedClient::new(TWO_INSIGHTS), &month).unwrap();
    }
    assert_eq!(latest_insights(&db, &s).unwrap().len(), 10);
}

#[test]
fn test_summary_spending_covers_requested_month_only() {
    let (mut db, s, month) = setup_with_spending();
    Ledger::new(&mut db, SignPolicy::RefundOnly)
        .add_transaction(
            &s,
            NewTransaction {
                amount: dec!(999),
                description: "Laptop".into(),
                category: "Tech".into(),
                date: "2024-11-20".into(),
                kind: Some(TransactionKind::Expense),
                is_recurring: false,
            },
        )
        .unwrap();

    let summary = financial_summary(&db, s.require().unwrap(), &month).unwrap();
    assert_eq!(summary.total_transactions, 2);
    assert_eq!(summary.month_spending, dec!(120));

    let client = CannedClient::new(TWO_INSIGHTS);
    generate_insights(&mut db, &s, &client, &month).unwrap();
    let prompt = client.prompt.borrow().clone().unwrap();
    assert!(prompt.contains("Spending in 2024-12: $120"));
}
