// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::Connection;

const TOLERANCE: f64 = 0.005;

#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub kind: &'static str,
    pub detail: String,
}

pub fn handle(conn: &Connection) -> Result<()> {
    let issues = check(conn)?;
    if issues.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        let rows = issues.into_iter().map(|i| vec![i.kind.to_string(), i.detail]).collect();
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

pub fn check(conn: &Connection) -> Result<Vec<Issue>> {
    let mut issues = Vec::new();

    // 1) Stored order totals that no longer match their items
    for (table, items, fk, kind) in [
        ("sales", "sale_items", "sale_id", "sale_total_mismatch"),
        ("purchases", "purchase_items", "purchase_id", "purchase_total_mismatch"),
    ] {
        let mut stmt = conn.prepare(&format!(
            "SELECT o.id, o.total_amount, IFNULL((SELECT SUM(i.total) FROM {items} i WHERE i.{fk}=o.id),0)
             FROM {table} o ORDER BY o.id",
            items = items,
            fk = fk,
            table = table
        ))?;
        let mut cur = stmt.query([])?;
        while let Some(r) = cur.next()? {
            let (id, stored, sum): (i64, f64, f64) = (r.get(0)?, r.get(1)?, r.get(2)?);
            if (stored - sum).abs() > TOLERANCE {
                issues.push(Issue {
                    kind,
                    detail: format!("#{} stored {:.2}, items {:.2}", id, stored, sum),
                });
            }
        }
    }

    // 2) Account balances that drifted from their transaction history
    let mut stmt = conn.prepare(
        "SELECT a.id, a.name, a.current_balance,
                a.initial_balance + IFNULL(SUM(CASE t.transaction_type
                    WHEN 'deposit' THEN t.total ELSE -t.total END), 0)
         FROM accounts a
         LEFT JOIN account_transactions t ON t.account_id = a.id
         GROUP BY a.id ORDER BY a.id",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let (id, name, stored, expected): (i64, String, f64, f64) =
            (r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?);
        if (stored - expected).abs() > TOLERANCE {
            issues.push(Issue {
                kind: "account_balance_mismatch",
                detail: format!(
                    "#{} {} stored {:.2}, transactions give {:.2}",
                    id, name, stored, expected
                ),
            });
        }
    }

    // 3) Sales paid beyond their total
    let mut stmt = conn.prepare(
        "SELECT id, paid_amount, total_amount + additional_cost FROM sales
         WHERE paid_amount > total_amount + additional_cost + 0.005 ORDER BY id",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let (id, paid, due): (i64, f64, f64) = (r.get(0)?, r.get(1)?, r.get(2)?);
        issues.push(Issue {
            kind: "sale_overpaid",
            detail: format!("#{} paid {:.2} of {:.2}", id, paid, due),
        });
    }

    Ok(issues)
}
