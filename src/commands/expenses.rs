// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db::{Table, prepare_tables};
use crate::models::Expense;
use crate::utils::{maybe_print_json, parse_date, parse_positive, pretty_table, require_text};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    prepare_tables(conn, &[Table::Expenses]);
    match m.subcommand() {
        Some(("add", sub)) => {
            let id = add(conn, sub)?;
            println!("Recorded expense #{}", id);
        }
        Some(("list", sub)) => {
            let from = sub
                .get_one::<String>("from")
                .map(|s| parse_date(s).map(|d| d.to_string()))
                .transpose()?;
            let to = sub
                .get_one::<String>("to")
                .map(|s| parse_date(s).map(|d| d.to_string()))
                .transpose()?;
            let data = list(conn, from.as_deref(), to.as_deref())?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|e| {
                        vec![
                            e.id.to_string(),
                            e.date,
                            e.expense_type,
                            format!("{:.2} {}", e.amount, e.currency),
                            format!("{:.2}", e.total),
                            e.bill_no.unwrap_or_default(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "Date", "Type", "Amount", "Total", "Bill"], rows)
                );
            }
        }
        Some(("type", sub)) => match sub.subcommand() {
            Some(("add", s)) => {
                let name = require_text(s.get_one::<String>("name").unwrap(), "Name")?;
                let id = ensure_type(conn, name)?;
                println!("Expense type '{}' is #{}", name, id);
            }
            Some(("list", _)) => {
                let mut stmt = conn.prepare("SELECT id, name FROM expense_types ORDER BY name")?;
                let rows = stmt
                    .query_map([], |r| {
                        Ok(vec![r.get::<_, i64>(0)?.to_string(), r.get::<_, String>(1)?])
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                println!("{}", pretty_table(&["ID", "Name"], rows));
            }
            _ => {}
        },
        _ => {}
    }
    Ok(())
}

/// Look up an expense type by name, creating it on first use.
pub fn ensure_type(conn: &Connection, name: &str) -> Result<i64> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM expense_types WHERE name=?1",
            params![name],
            |r| r.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }
    conn.execute("INSERT INTO expense_types(name) VALUES (?1)", params![name])?;
    Ok(conn.last_insert_rowid())
}

pub fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<i64> {
    let type_name = require_text(sub.get_one::<String>("type").unwrap(), "Expense type")?;
    let amount = parse_positive(sub.get_one::<String>("amount").unwrap(), "amount")?;
    let date = parse_date(sub.get_one::<String>("date").unwrap())?.to_string();
    let currency = sub.get_one::<String>("currency").unwrap().to_uppercase();
    let rate = parse_positive(sub.get_one::<String>("rate").unwrap(), "rate")?;
    let type_id = ensure_type(conn, type_name)?;
    conn.execute(
        "INSERT INTO expenses(expense_type_id, amount, currency, rate, total, date, bill_no, description)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            type_id,
            amount,
            currency,
            rate,
            amount * rate,
            date,
            sub.get_one::<String>("bill"),
            sub.get_one::<String>("description"),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list(conn: &Connection, from: Option<&str>, to: Option<&str>) -> Result<Vec<Expense>> {
    let mut stmt = conn.prepare(
        "SELECT e.id, t.name, e.amount, e.currency, e.rate, e.total, e.date, e.bill_no, e.description
         FROM expenses e JOIN expense_types t ON t.id = e.expense_type_id
         WHERE (?1 IS NULL OR substr(e.date,1,10) >= ?1) AND (?2 IS NULL OR substr(e.date,1,10) <= ?2)
         ORDER BY e.date DESC, e.id DESC",
    )?;
    let rows = stmt.query_map(params![from, to], |r| {
        Ok(Expense {
            id: r.get(0)?,
            expense_type: r.get(1)?,
            amount: r.get(2)?,
            currency: r.get(3)?,
            rate: r.get(4)?,
            total: r.get(5)?,
            date: r.get(6)?,
            bill_no: r.get(7)?,
            description: r.get(8)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
