// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db::query_database;
use crate::report::format_cell;
use crate::sql_guard::check_read_only;
use crate::utils::pretty_table;
use anyhow::{Result, anyhow};
use rusqlite::Connection;
use serde_json::Value;

/// `--param` values: JSON literals when they parse, plain strings otherwise.
pub fn parse_param(s: &str) -> Value {
    serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let sql = m.get_one::<String>("sql").unwrap();
    check_read_only(sql).map_err(|r| anyhow!("Query rejected: {}", r))?;
    let params: Vec<Value> = m
        .get_many::<String>("param")
        .map(|vals| vals.map(|s| parse_param(s)).collect())
        .unwrap_or_default();
    let result = query_database(conn, sql, &params)?;
    if m.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if m.get_flag("jsonl") {
        for row in &result.rows {
            let obj: serde_json::Map<String, Value> = result
                .columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect();
            println!("{}", serde_json::to_string(&obj)?);
        }
    } else {
        let header: Vec<&str> = result.columns.iter().map(String::as_str).collect();
        let rows = result
            .rows
            .iter()
            .map(|r| r.iter().map(format_cell).collect())
            .collect();
        println!("{}", pretty_table(&header, rows));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_fall_back_to_strings() {
        assert_eq!(parse_param("5"), Value::from(5));
        assert_eq!(parse_param("\"x\""), Value::from("x"));
        assert_eq!(parse_param("2025-01-01"), Value::from("2025-01-01"));
    }
}
