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

    let (count, total, extra): (i64, f64, f64) = conn.query_row(
        "SELECT COUNT(*), IFNULL(SUM(total_amount),0.0), IFNULL(SUM(additional_cost),0.0)
         FROM purchases WHERE substr(date,1,10) BETWEEN ?1 AND ?2",
        params![from, to],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
    )?;
    let paid: f64 = conn.query_row(
        "SELECT IFNULL(SUM(pp.total),0.0)
         FROM purchase_payments pp JOIN purchases p ON p.id=pp.purchase_id
         WHERE substr(p.date,1,10) BETWEEN ?1 AND ?2",
        params![from, to],
        |r| r.get(0),
    )?;
    let outstanding = to_decimal(total + extra)? - to_decimal(paid)?;

    let mut stmt = conn.prepare(
        "SELECT p.id, p.date, IFNULL(s.full_name,'(unknown)'), p.total_amount, p.additional_cost,
                IFNULL((SELECT SUM(pp.total) FROM purchase_payments pp WHERE pp.purchase_id=p.id),0.0)
         FROM purchases p LEFT JOIN suppliers s ON s.id=p.supplier_id
         WHERE substr(p.date,1,10) BETWEEN ?1 AND ?2
         ORDER BY p.date, p.id",
    )?;
    let rows = stmt.query_map(params![from, to], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, f64>(3)?,
            r.get::<_, f64>(4)?,
            r.get::<_, f64>(5)?,
        ))
    })?;
    let mut purchase_rows = Vec::new();
    for row in rows {
        let (id, date, supplier, t, x, p) = row?;
        purchase_rows.push(vec![
            json!(id),
            json!(date),
            json!(supplier),
            money(t),
            money(x),
            money(p),
        ]);
    }

    let mut stmt = conn.prepare(
        "SELECT IFNULL(pr.name,'(deleted)'), SUM(i.amount), SUM(i.total)
         FROM purchase_items i
         JOIN purchases p ON p.id=i.purchase_id
         LEFT JOIN products pr ON pr.id=i.product_id
         WHERE substr(p.date,1,10) BETWEEN ?1 AND ?2
         GROUP BY i.product_id ORDER BY SUM(i.total) DESC",
    )?;
    let rows = stmt.query_map(params![from, to], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, f64>(1)?,
            r.get::<_, f64>(2)?,
        ))
    })?;
    let mut item_rows = Vec::new();
    for row in rows {
        let (name, qty, cost) = row?;
        item_rows.push(vec![json!(name), json!(qty), money(cost)]);
    }

    let sections = vec![
        summary_section(vec![
            ("Purchases", count.to_string()),
            ("Total amount", money_text(total)?),
            ("Additional costs", money_text(extra)?),
            ("Paid", money_text(paid)?),
            ("Outstanding", fmt_amount(outstanding)),
        ]),
        Section::table(
            "Purchases",
            &["ID", "Date", "Supplier", "Total", "Additional cost", "Paid"],
            purchase_rows,
        ),
        Section::table("Purchased products", &["Product", "Quantity", "Cost"], item_rows),
    ];
    new_report(conn, "Purchase report", range, sections)
}
