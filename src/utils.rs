// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

const UA: &str = concat!("daftar/", env!("CARGO_PKG_VERSION"));

pub fn http_client(timeout_secs: u64) -> Result<reqwest::blocking::Client> {
    let c = reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .user_agent(UA)
        .build()?;
    Ok(c)
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

/// Parse a strictly positive amount (quantities, prices, payments).
pub fn parse_positive(s: &str, what: &str) -> Result<f64> {
    let v: f64 = s
        .trim()
        .parse()
        .with_context(|| format!("Invalid {} '{}'", what, s))?;
    if !v.is_finite() || v <= 0.0 {
        bail!("{} must be greater than zero, got {}", what, s);
    }
    Ok(v)
}

/// Like [`parse_positive`] but zero is allowed.
pub fn parse_non_negative(s: &str, what: &str) -> Result<f64> {
    let v: f64 = s
        .trim()
        .parse()
        .with_context(|| format!("Invalid {} '{}'", what, s))?;
    if !v.is_finite() || v < 0.0 {
        bail!("{} must not be negative, got {}", what, s);
    }
    Ok(v)
}

/// Optional text argument of an edit; present but blank is an error.
pub fn optional_text<'a>(
    sub: &'a clap::ArgMatches,
    key: &str,
    what: &str,
) -> Result<Option<&'a str>> {
    sub.get_one::<String>(key)
        .map(|s| require_text(s, what))
        .transpose()
}

/// Reject blank required text fields before anything is written.
pub fn require_text<'a>(s: &'a str, what: &str) -> Result<&'a str> {
    let t = s.trim();
    if t.is_empty() {
        bail!("{} is required", what);
    }
    Ok(t)
}

pub fn to_decimal(v: f64) -> Result<Decimal> {
    Decimal::try_from(v).with_context(|| format!("Invalid amount '{}'", v))
}

pub fn fmt_amount(d: Decimal) -> String {
    format!("{:.2}", d.round_dp(2))
}

/// Cut `s` to at most `max` characters without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let v: Option<String> = conn
        .query_row("SELECT value FROM settings WHERE key=?1", params![key], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(v)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

/// Fail with a readable message when `id` does not exist in `table`.
pub fn require_row(conn: &Connection, table: &str, id: i64, what: &str) -> Result<()> {
    let found: Option<i64> = conn
        .query_row(
            &format!("SELECT id FROM {} WHERE id=?1", table),
            params![id],
            |r| r.get(0),
        )
        .optional()?;
    if found.is_none() {
        bail!("{} #{} not found", what, id);
    }
    Ok(())
}

pub fn company_name(conn: &Connection) -> Result<Option<String>> {
    let v: Option<String> = conn
        .query_row(
            "SELECT name FROM company_settings ORDER BY id LIMIT 1",
            [],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v.filter(|s| !s.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("درآمد ماهانه", 5), "درآمد...");
    }

    #[test]
    fn positive_amounts_only() {
        assert!(parse_positive("0", "price").is_err());
        assert!(parse_positive("-1", "price").is_err());
        assert!(parse_positive("abc", "price").is_err());
        assert_eq!(parse_positive(" 2.5 ", "price").unwrap(), 2.5);
        assert_eq!(parse_non_negative("0", "paid").unwrap(), 0.0);
    }
}
