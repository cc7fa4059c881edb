#![allow(clippy::unwrap_used)]

use super::*;
use crate::ledger::{Ledger, SignPolicy};
use rust_decimal_macros::dec;

fn setup() -> (Database, Session) {
    let db = Database::open_in_memory().unwrap();
    let user = db.register_user("alice").unwrap();
    (db, Session::signed_in(user))
}

fn add(db: &mut Database, s: &Session, kind: TransactionKind, amount: Decimal, category: &str, date: &str) {
    Ledger::new(db, SignPolicy::RefundOnly)
        .add_transaction(
            s,
            NewTransaction {
                amount,
                description: "entry".into(),
                category: category.into(),
                date: date.into(),
                kind: Some(kind),
                is_recurring: false,
            },
        )
        .unwrap();
}

fn month(m: &str) -> Month {
    Month::parse(m).unwrap()
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_budget_status_totals() {
    let (mut db, s) = setup();
    let dec_2024 = month("2024-12");
    Ledger::new(&mut db, SignPolicy::RefundOnly)
        .set_budget(&s, "Food", dec!(100), &dec_2024)
        .unwrap();
    Ledger::new(&mut db, SignPolicy::RefundOnly)
        .set_budget(&s, "Fun", dec!(50), &dec_2024)
        .unwrap();
    add(&mut db, &s, TransactionKind::Expense, dec!(120), "Food", "2024-12-05");
    add(&mut db, &s, TransactionKind::Expense, dec!(10), "Fun", "2024-12-06");

    let status = budget_status(&db, &s, &dec_2024).unwrap();
    assert_eq!(status.total_budget, dec!(150));
    assert_eq!(status.total_spent, dec!(130));
    assert_eq!(status.total_remaining, dec!(20));
    assert_eq!(status.categories.len(), 2);

    let food = &status.categories[0];
    assert_eq!(food.category, "Food");
    assert_eq!(food.remaining, dec!(-20));
    assert_eq!(food.percentage, dec!(120.0));
    assert_eq!(status.categories[1].percentage, dec!(20.0));
}

#[test]
fn test_budget_status_empty_month() {
    let (db, s) = setup();
    let status = budget_status(&db, &s, &month("2030-01")).unwrap();
    assert_eq!(status.total_budget, Decimal::ZERO);
    assert!(status.categories.is_empty());
}

#[test]
fn test_reports_require_session() {
    let (db, _) = setup();
    let anon = Session::anonymous();
    assert_eq!(
        budget_status(&db, &anon, &month("2024-12")).unwrap_err().code(),
        "UNAUTHENTICATED"
    );
    assert_eq!(monthly_trends(&db, &anon, 6).unwrap_err().code(), "UNAUTHENTICATED");
}

#[test]
fn test_transactions_between_is_inclusive() {
    let (mut db, s) = setup();
    add(&mut db, &s, TransactionKind::Expense, dec!(1), "Food", "2024-12-01");
    add(&mut db, &s, TransactionKind::Expense, dec!(2), "Food", "2024-12-15");
    add(&mut db, &s, TransactionKind::Expense, dec!(3), "Food", "2024-12-31");
    add(&mut db, &s, TransactionKind::Expense, dec!(4), "Food", "2025-01-01");

    let txns = transactions_between(&db, &s, day(2024, 12, 1), day(2024, 12, 31), None).unwrap();
    let amounts: Vec<Decimal> = txns.iter().map(|t| t.amount).collect();
    assert_eq!(amounts, vec![dec!(3), dec!(2), dec!(1)]);

    let limited = transactions_between(&db, &s, day(2024, 12, 1), day(2025, 1, 1), Some(2)).unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].amount, dec!(4));
}

#[test]
fn test_transactions_between_rejects_reversed_range() {
    let (db, s) = setup();
    let err = transactions_between(&db, &s, day(2024, 12, 31), day(2024, 12, 1), None).unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");
}

#[test]
fn test_transactions_for_month_scoped_to_user() {
    let (mut db, alice) = setup();
    let bob = Session::signed_in(db.register_user("bob").unwrap());
    add(&mut db, &alice, TransactionKind::Expense, dec!(5), "Food", "2024-12-01");
    add(&mut db, &bob, TransactionKind::Expense, dec!(6), "Food", "2024-12-01");

    let txns = transactions_for_month(&db, &alice, &month("2024-12"), None).unwrap();
    assert_eq!(txns.len(), 1);
    assert_eq!(txns[0].amount, dec!(5));
}

#[test]
fn test_spending_by_category_expenses_only() {
    let (mut db, s) = setup();
    add(&mut db, &s, TransactionKind::Expense, dec!(30), "Food", "2024-12-01");
    add(&mut db, &s, TransactionKind::Expense, dec!(20), "Food", "2024-12-02");
    add(&mut db, &s, TransactionKind::Expense, dec!(70), "Rent", "2024-12-03");
    add(&mut db, &s, TransactionKind::Income, dec!(999), "Food", "2024-12-04");
    add(&mut db, &s, TransactionKind::Expense, dec!(5), "Food", "2024-11-30");

    let spending = spending_by_category(&db, &s, &month("2024-12")).unwrap();
    assert_eq!(
        spending,
        vec![("Rent".to_string(), dec!(70)), ("Food".to_string(), dec!(50))]
    );
}

#[test]
fn test_monthly_trends_last_n_oldest_first() {
    let (mut db, s) = setup();
    add(&mut db, &s, TransactionKind::Expense, dec!(10), "Food", "2024-10-05");
    add(&mut db, &s, TransactionKind::Income, dec!(100), "Pay", "2024-11-01");
    add(&mut db, &s, TransactionKind::Expense, dec!(40), "Food", "2024-11-05");
    add(&mut db, &s, TransactionKind::Expense, dec!(25), "Food", "2024-12-05");

    let trends = monthly_trends(&db, &s, 2).unwrap();
    assert_eq!(trends.len(), 2);
    assert_eq!(trends[0].month, "2024-11");
    assert_eq!(trends[0].income, dec!(100));
    assert_eq!(trends[0].expenses, dec!(40));
    assert_eq!(trends[0].net, dec!(60));
    assert_eq!(trends[1].month, "2024-12");
    assert_eq!(trends[1].net, dec!(-25));

    assert_eq!(monthly_trends(&db, &s, 12).unwrap().len(), 3);
}

#[test]
fn test_processed_statements_latest_ten() {
    let (db, s) = setup();
    let user = s.require().unwrap();
    for i in 0..12 {
        db::insert_processed_statement(db.conn(), user, &format!("s{i}.txt"), None, i, "now").unwrap();
    }
    let recent = processed_statements(&db, &s).unwrap();
    assert_eq!(recent.len(), 10);
    assert_eq!(recent[0].file_name, "s11.txt");
}
