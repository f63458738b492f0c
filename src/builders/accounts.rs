// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{DateRange, money, money_text, new_report, summary_section};
use crate::report::{Report, Section};
use crate::utils::{fmt_amount, to_decimal};
use anyhow::Result;
use rusqlite::{Connection, params};
use serde_json::json;

pub fn build(conn: &Connection, range: &DateRange) -> Result<Report> {
    let (from, to) = range.bounds();

    let (deposits, withdrawals): (f64, f64) = conn.query_row(
        "SELECT
            IFNULL(SUM(CASE WHEN transaction_type='deposit' THEN total END),0.0),
            IFNULL(SUM(CASE WHEN transaction_type='withdraw' THEN total END),0.0)
         FROM account_transactions
         WHERE substr(transaction_date,1,10) BETWEEN ?1 AND ?2",
        params![from, to],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    let net = to_decimal(deposits)? - to_decimal(withdrawals)?;

    let mut stmt = conn.prepare(
        "SELECT name, IFNULL(account_code,''), IFNULL(account_type,''), initial_balance,
                current_balance
         FROM accounts WHERE is_active=1 ORDER BY name",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, f64>(3)?,
            r.get::<_, f64>(4)?,
        ))
    })?;
    let mut balances = Vec::new();
    let mut balance_total = 0.0;
    for row in rows {
        let (name, code, typ, initial, current) = row?;
        balance_total += current;
        balances.push(vec![
            json!(name),
            json!(code),
            json!(typ),
            money(initial),
            money(current),
        ]);
    }

    let mut stmt = conn.prepare(
        "SELECT t.transaction_date, a.name, t.transaction_type, t.amount, t.currency, t.total,
                IFNULL(t.notes,'')
         FROM account_transactions t JOIN accounts a ON a.id=t.account_id
         WHERE substr(t.transaction_date,1,10) BETWEEN ?1 AND ?2
         ORDER BY t.transaction_date, t.id",
    )?;
    let rows = stmt.query_map(params![from, to], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, f64>(3)?,
            r.get::<_, String>(4)?,
            r.get::<_, f64>(5)?,
            r.get::<_, String>(6)?,
        ))
    })?;
    let mut movements = Vec::new();
    for row in rows {
        let (date, account, typ, amount, ccy, total, notes) = row?;
        movements.push(vec![
            json!(date),
            json!(account),
            json!(typ),
            money(amount),
            json!(ccy),
            money(total),
            json!(notes),
        ]);
    }

    let sections = vec![
        summary_section(vec![
            ("Deposits", money_text(deposits)?),
            ("Withdrawals", money_text(withdrawals)?),
            ("Net movement", fmt_amount(net)),
            ("Balance of active accounts", money_text(balance_total)?),
        ]),
        Section::table(
            "Balances",
            &["Account", "Code", "Type", "Initial", "Current"],
            balances,
        ),
        Section::table(
            "Transactions",
            &["Date", "Account", "Type", "Amount", "Currency", "Total", "Notes"],
            movements,
        ),
    ];
    new_report(conn, "Accounts report", range, sections)
}
