// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db::{Table, prepare_tables};
use crate::models::Account;
use crate::utils::{
    maybe_print_json, optional_text, parse_date, parse_non_negative, parse_positive, pretty_table,
    require_row, require_text,
};
use anyhow::{Result, bail};
use log::debug;
use rusqlite::{Connection, params};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Deposit,
    Withdraw,
}

impl Movement {
    pub fn as_str(self) -> &'static str {
        match self {
            Movement::Deposit => "deposit",
            Movement::Withdraw => "withdraw",
        }
    }

    fn sign(self) -> f64 {
        match self {
            Movement::Deposit => 1.0,
            Movement::Withdraw => -1.0,
        }
    }
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    prepare_tables(conn, &[Table::Accounts]);
    match m.subcommand() {
        Some(("add", sub)) => {
            let id = add(conn, sub)?;
            println!("Added account #{}", id);
        }
        Some(("list", sub)) => {
            let data = list(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|a| {
                        vec![
                            a.id.to_string(),
                            a.name,
                            a.account_code.unwrap_or_default(),
                            a.account_type.unwrap_or_default(),
                            format!("{:.2}", a.current_balance),
                            if a.is_active { "yes" } else { "no" }.to_string(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "Name", "Code", "Type", "Balance", "Active"], rows)
                );
            }
        }
        Some(("edit", sub)) => {
            let id = edit(conn, sub)?;
            println!("Updated account #{}", id);
        }
        Some(("deposit", sub)) => movement_cmd(conn, Movement::Deposit, sub)?,
        Some(("withdraw", sub)) => movement_cmd(conn, Movement::Withdraw, sub)?,
        _ => {}
    }
    Ok(())
}

pub fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<i64> {
    let name = require_text(sub.get_one::<String>("name").unwrap(), "Name")?;
    let initial = parse_non_negative(sub.get_one::<String>("initial").unwrap(), "initial balance")?;
    conn.execute(
        "INSERT INTO accounts(name, account_code, account_type, initial_balance, current_balance)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![
            name,
            sub.get_one::<String>("code"),
            sub.get_one::<String>("type"),
            initial
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Balances only move through deposits and withdrawals, so they are not
/// editable here.
pub fn edit(conn: &Connection, sub: &clap::ArgMatches) -> Result<i64> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let name = optional_text(sub, "name", "Name")?;
    let active = sub.get_one::<bool>("active").map(|b| *b as i64);
    require_row(conn, "accounts", id, "account")?;
    conn.execute(
        "UPDATE accounts SET name = IFNULL(?1, name), account_code = IFNULL(?2, account_code),
                account_type = IFNULL(?3, account_type), is_active = IFNULL(?4, is_active),
                updated_at = datetime('now')
         WHERE id=?5",
        params![
            name,
            sub.get_one::<String>("code"),
            sub.get_one::<String>("type"),
            active,
            id
        ],
    )?;
    Ok(id)
}

pub fn list(conn: &Connection) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, account_code, account_type, initial_balance, current_balance, is_active
         FROM accounts ORDER BY name",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(Account {
            id: r.get(0)?,
            name: r.get(1)?,
            account_code: r.get(2)?,
            account_type: r.get(3)?,
            initial_balance: r.get(4)?,
            current_balance: r.get(5)?,
            is_active: r.get::<_, i64>(6)? != 0,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn movement_cmd(conn: &Connection, movement: Movement, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let amount = parse_positive(sub.get_one::<String>("amount").unwrap(), "amount")?;
    let date = parse_date(sub.get_one::<String>("date").unwrap())?.to_string();
    let currency = sub.get_one::<String>("currency").unwrap().to_uppercase();
    let rate = parse_positive(sub.get_one::<String>("rate").unwrap(), "rate")?;
    let notes = sub.get_one::<String>("notes").map(String::as_str);
    require_row(conn, "accounts", id, "account")?;
    let tx = conn.unchecked_transaction()?;
    let balance = record_movement(&tx, id, movement, amount, &currency, rate, &date, notes)?;
    tx.commit()?;
    println!(
        "{} {:.2} {} on account #{} (balance {:.2})",
        movement.as_str(),
        amount,
        currency,
        id,
        balance
    );
    Ok(())
}

/// Insert an account transaction and move `current_balance` by `amount * rate`.
/// Returns the new balance. Callers own the surrounding transaction.
#[allow(clippy::too_many_arguments)]
pub fn record_movement(
    conn: &Connection,
    account_id: i64,
    movement: Movement,
    amount: f64,
    currency: &str,
    rate: f64,
    date: &str,
    notes: Option<&str>,
) -> Result<f64> {
    if amount <= 0.0 || rate <= 0.0 {
        bail!("Amount and rate must be greater than zero");
    }
    let total = amount * rate;
    conn.execute(
        "INSERT INTO account_transactions(account_id, transaction_type, amount, currency, rate, total, transaction_date, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![account_id, movement.as_str(), amount, currency, rate, total, date, notes],
    )?;
    conn.execute(
        "UPDATE accounts SET current_balance = current_balance + ?1, updated_at = datetime('now')
         WHERE id=?2",
        params![movement.sign() * total, account_id],
    )?;
    let balance: f64 = conn.query_row(
        "SELECT current_balance FROM accounts WHERE id=?1",
        params![account_id],
        |r| r.get(0),
    )?;
    debug!(
        "account #{} {} {:.2}, balance now {:.2}",
        account_id,
        movement.as_str(),
        total,
        balance
    );
    Ok(balance)
}
