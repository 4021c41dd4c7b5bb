//! Plain-text rendering of query results and customer listings.

use chrono::{DateTime, Utc};
use serde_json::Value;
use shared::domain::Row;

use crate::{
    customer_controller::{Customer, CustomerListState},
    query_controller::QueryResult,
};

pub const NO_RESULTS: &str = "No results found.";
pub const NO_CUSTOMERS: &str = "No customers found.";
pub const LOADING_CUSTOMERS: &str = "Loading customers...";

const CUSTOMER_COLUMNS: [&str; 3] = ["Name", "Email", "Created At"];

pub fn format_created_at(created_at: &DateTime<Utc>) -> String {
    created_at.format("%Y-%m-%d").to_string()
}

/// Display form of a result cell: strings unquoted, everything else as JSON.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub fn render_query_result(result: &QueryResult) -> String {
    let mut out = String::new();
    out.push_str("Generated SQL\n");
    for line in result.sql.lines() {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
    out.push_str("\nResults\n");
    out.push_str(&render_rows(&result.rows));
    out
}

/// Columns come from the first row, in server order.
pub fn render_rows(rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return format!("{NO_RESULTS}\n");
    };
    let headers: Vec<String> = first.keys().cloned().collect();
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            headers
                .iter()
                .map(|column| row.get(column).map(display_value).unwrap_or_default())
                .collect::<Vec<String>>()
        })
        .collect();
    TextTable::new(headers, body).render()
}

pub fn render_customers(state: &CustomerListState) -> String {
    if state.is_loading() {
        return format!("{LOADING_CUSTOMERS}\n");
    }
    render_customer_table(&state.customers)
}

pub fn render_customer_table(customers: &[Customer]) -> String {
    if customers.is_empty() {
        return format!("{NO_CUSTOMERS}\n");
    }
    let headers: Vec<String> = CUSTOMER_COLUMNS.iter().map(|h| h.to_string()).collect();
    let body: Vec<Vec<String>> = customers
        .iter()
        .map(|customer| {
            vec![
                customer.name.clone(),
                customer.email.clone(),
                format_created_at(&customer.created_at),
            ]
        })
        .collect();
    TextTable::new(headers, body).render()
}

struct TextTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (idx, cell) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(idx) {
                    *width = (*width).max(cell.chars().count());
                }
            }
        }
        widths
    }

    fn render(&self) -> String {
        let widths = self.widths();
        let mut out = String::new();
        push_line(&mut out, &self.headers, &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&rule.join("-+-"));
        out.push('\n');
        for row in &self.rows {
            push_line(&mut out, row, &widths);
        }
        out
    }
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let padded: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(idx, width)| {
            let cell = cells.get(idx).map(String::as_str).unwrap_or_default();
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect();
    out.push_str(padded.join(" | ").trim_end());
    out.push('\n');
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
