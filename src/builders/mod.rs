// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Deterministic report builders. Each one runs a fixed set of parameterised
//! queries over a date range and returns the same [`Report`] shape the AI
//! relay produces.

pub mod accounts;
pub mod expenses;
pub mod parties;
pub mod products;
pub mod purchases;
pub mod sales;

use crate::report::{Report, Section};
use crate::utils::{company_name, fmt_amount, parse_date, to_decimal};
use anyhow::{Result, bail};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn parse(from: &str, to: &str) -> Result<Self> {
        let from = parse_date(from)?;
        let to = parse_date(to)?;
        if from > to {
            bail!("Start date {} is after end date {}", from, to);
        }
        Ok(DateRange { from, to })
    }

    /// Bound parameters for `BETWEEN ?1 AND ?2` on `YYYY-MM-DD` text columns.
    pub fn bounds(&self) -> (String, String) {
        (self.from.to_string(), self.to.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Sales,
    Purchases,
    Expenses,
    Accounts,
    Products,
    Customers,
    Suppliers,
}

impl ReportKind {
    pub const NAMES: &'static [&'static str] = &[
        "sales",
        "purchases",
        "expenses",
        "accounts",
        "products",
        "customers",
        "suppliers",
    ];

    pub fn parse(s: &str) -> Result<Self> {
        Ok(match s.trim().to_lowercase().as_str() {
            "sales" => ReportKind::Sales,
            "purchases" => ReportKind::Purchases,
            "expenses" => ReportKind::Expenses,
            "accounts" => ReportKind::Accounts,
            "products" => ReportKind::Products,
            "customers" => ReportKind::Customers,
            "suppliers" => ReportKind::Suppliers,
            other => bail!(
                "Unknown report '{}' (use {})",
                other,
                ReportKind::NAMES.join("|")
            ),
        })
    }
}

pub fn build(conn: &Connection, kind: ReportKind, range: &DateRange) -> Result<Report> {
    match kind {
        ReportKind::Sales => sales::build(conn, range),
        ReportKind::Purchases => purchases::build(conn, range),
        ReportKind::Expenses => expenses::build(conn, range),
        ReportKind::Accounts => accounts::build(conn, range),
        ReportKind::Products => products::build(conn, range),
        ReportKind::Customers => parties::build_customers(conn, range),
        ReportKind::Suppliers => parties::build_suppliers(conn, range),
    }
}

/// Report shell with the company name (if configured) and the period.
pub(crate) fn new_report(
    conn: &Connection,
    name: &str,
    range: &DateRange,
    sections: Vec<Section>,
) -> Result<Report> {
    let title = match company_name(conn)? {
        Some(c) => format!("{}: {}", c, name),
        None => name.to_string(),
    };
    Ok(Report {
        title,
        summary: Some(format!("Period {} to {}", range.from, range.to)),
        sections,
    })
}

/// Label/value pairs rendered as a two-column "Summary" table.
pub(crate) fn summary_section(items: Vec<(&str, String)>) -> Section {
    let rows = items
        .into_iter()
        .map(|(k, v)| vec![json!(k), json!(v)])
        .collect();
    Section::table("Summary", &["Metric", "Value"], rows)
}

pub(crate) fn money(v: f64) -> Value {
    json!((v * 100.0).round() / 100.0)
}

pub(crate) fn money_text(v: f64) -> Result<String> {
    Ok(fmt_amount(to_decimal(v)?))
}
