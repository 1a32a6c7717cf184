//! Evaluation of REST filters against JSON rows held in memory

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde_json::Value;
use soundbank_backend_client::{Filter, Order, Query};

/// Render a scalar cell the way it would appear in a query string
fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Compare a cell against a query-string operand: timestamps by instant,
/// numbers numerically, everything else as text
fn compare(cell: &Value, operand: &str) -> Option<Ordering> {
    if let Value::String(s) = cell {
        if let (Ok(a), Ok(b)) = (
            DateTime::parse_from_rfc3339(s),
            DateTime::parse_from_rfc3339(operand),
        ) {
            return Some(a.with_timezone(&Utc).cmp(&b.with_timezone(&Utc)));
        }
    }
    if let (Some(a), Ok(b)) = (cell.as_f64(), operand.parse::<f64>()) {
        return a.partial_cmp(&b);
    }
    cell_text(cell).map(|text| text.as_str().cmp(operand))
}

pub(crate) fn matches(row: &Value, filter: &Filter) -> bool {
    let cell = row.get(filter.column()).unwrap_or(&Value::Null);
    match filter {
        Filter::Eq(_, v) => compare(cell, v) == Some(Ordering::Equal),
        Filter::Gt(_, v) => compare(cell, v) == Some(Ordering::Greater),
        Filter::Is(_, None) => cell.is_null(),
        Filter::Is(_, Some(b)) => cell.as_bool() == Some(*b),
        Filter::In(_, values) => cell_text(cell).is_some_and(|text| values.contains(&text)),
    }
}

pub(crate) fn matches_all(row: &Value, query: &Query) -> bool {
    query.filters.iter().all(|f| matches(row, f))
}

/// Apply a query's order and limit to already-filtered rows
pub(crate) fn arrange(mut rows: Vec<Value>, query: &Query) -> Vec<Value> {
    if let Some((column, order)) = &query.order {
        rows.sort_by(|a, b| {
            let a = a.get(column).and_then(cell_text).unwrap_or_default();
            let b = b.get(column).and_then(cell_text).unwrap_or_default();
            match order {
                Order::Asc => a.cmp(&b),
                Order::Desc => b.cmp(&a),
            }
        });
    }
    if let Some(limit) = query.limit {
        rows.truncate(limit);
    }
    rows
}
