use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use tracing::{info, warn};

use crate::ai::{parse_reply, CompletionClient};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::ExtractedTransaction;
use crate::models::{parse_transaction_date, TransactionKind};

/// Categories the model is asked to choose from.
pub(crate) const CATEGORIES: [&str; 9] = [
    "Food & Dining",
    "Transportation",
    "Shopping",
    "Entertainment",
    "Bills & Utilities",
    "Healthcare",
    "Education",
    "Travel",
    "Other",
];

/// Turns raw statement text into validated transaction records through a
/// completion model.
pub(crate) struct StatementExtractor<'c> {
    client: &'c dyn CompletionClient,
}

impl<'c> StatementExtractor<'c> {
    pub(crate) fn new(client: &'c dyn CompletionClient) -> Self {
        Self { client }
    }

    pub(crate) fn extract(&self, statement: &str) -> LedgerResult<Vec<ExtractedTransaction>> {
        if statement.trim().is_empty() {
            return Err(LedgerError::invalid("statement is empty"));
        }
        let reply = self.client.complete(&extraction_prompt(statement))?;
        match parse_extraction(&reply) {
            Ok(records) => {
                info!(records = records.len(), "statement extracted");
                Ok(records)
            }
            Err(e) => {
                warn!(error = %e, "rejected extraction output");
                Err(e)
            }
        }
    }
}

fn extraction_prompt(statement: &str) -> String {
    let categories = CATEGORIES
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(" | ");

    let mut prompt = String::new();
    prompt.push_str(
        "Analyze this credit card or bank statement and extract transaction data.\n\n",
    );
    prompt.push_str("Statement content:\n");
    prompt.push_str(statement);
    prompt.push_str("\n\nReturn them in this JSON format:\n");
    prompt.push_str("{\n  \"transactions\": [\n    {\n");
    prompt.push_str("      \"date\": \"YYYY-MM-DD\",\n");
    prompt.push_str("      \"description\": \"Transaction description\",\n");
    prompt.push_str("      \"amount\": 123.45,\n");
    prompt.push_str("      \"type\": \"expense\" | \"income\",\n");
    prompt.push_str(&format!("      \"category\": {categories}\n"));
    prompt.push_str("    }\n  ]\n}\n\n");
    prompt.push_str("Rules:\n");
    prompt.push_str("- Credits and deposits are \"income\"; debits and purchases are \"expense\"\n");
    prompt.push_str("- Use absolute values for amounts\n");
    prompt.push_str("- Skip fees, interest charges and payment transactions\n");
    prompt.push_str("- Only include actual purchases and deposits\n");
    prompt
}

/// Validate a model reply of the shape `{"transactions": [...]}`.
///
/// Every record must carry a parseable `date`, a `description`, a positive
/// `amount`, a `type` of `expense` or `income` and a non-empty `category`.
/// The first bad record fails the whole reply.
pub(crate) fn parse_extraction(raw: &str) -> LedgerResult<Vec<ExtractedTransaction>> {
    let value = parse_reply(raw)?;
    let records = value
        .get("transactions")
        .and_then(Value::as_array)
        .ok_or_else(|| LedgerError::invalid("model response has no transactions array"))?;

    records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            parse_record(record).map_err(|msg| LedgerError::invalid(format!("record {i}: {msg}")))
        })
        .collect()
}

fn text<'a>(record: &'a Value, field: &str) -> Result<&'a str, String> {
    record
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("missing {field}"))
}

fn parse_record(record: &Value) -> Result<ExtractedTransaction, String> {
    let date = text(record, "date")?;
    parse_transaction_date(date).map_err(|e| e.to_string())?;

    let description = text(record, "description")?;

    let amount = record
        .get("amount")
        .and_then(decimal_of)
        .ok_or_else(|| "missing or non-numeric amount".to_string())?;
    if amount <= Decimal::ZERO {
        return Err(format!("amount must be positive, got {amount}"));
    }

    let kind_raw = text(record, "type")?;
    let kind = TransactionKind::parse(kind_raw)
        .ok_or_else(|| format!("unknown transaction type '{kind_raw}'"))?;

    let category = text(record, "category")?.trim();
    if category.is_empty() {
        return Err("missing category".into());
    }

    Ok(ExtractedTransaction {
        date: date.trim().to_string(),
        description: description.trim().to_string(),
        amount,
        kind,
        category: category.to_string(),
    })
}

/// Decimal from a JSON number (or numeric string) via its text form.
fn decimal_of(value: &Value) -> Option<Decimal> {
    let raw = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok()
}
