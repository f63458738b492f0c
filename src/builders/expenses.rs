// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{DateRange, money, money_text, new_report, summary_section};
use crate::report::{ChartData, ChartSeries, Report, Section};
use anyhow::Result;
use rusqlite::{Connection, params};
use serde_json::json;

pub fn build(conn: &Connection, range: &DateRange) -> Result<Report> {
    let (from, to) = range.bounds();

    let (count, total): (i64, f64) = conn.query_row(
        "SELECT COUNT(*), IFNULL(SUM(total),0.0)
         FROM expenses WHERE substr(date,1,10) BETWEEN ?1 AND ?2",
        params![from, to],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;

    let mut stmt = conn.prepare(
        "SELECT IFNULL(t.name,'(uncategorized)'), COUNT(*), SUM(e.total)
         FROM expenses e LEFT JOIN expense_types t ON t.id=e.expense_type_id
         WHERE substr(e.date,1,10) BETWEEN ?1 AND ?2
         GROUP BY e.expense_type_id ORDER BY SUM(e.total) DESC",
    )?;
    let rows = stmt.query_map(params![from, to], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, i64>(1)?,
            r.get::<_, f64>(2)?,
        ))
    })?;
    let mut by_type = Vec::new();
    let mut labels = Vec::new();
    let mut values = Vec::new();
    for row in rows {
        let (name, n, t) = row?;
        labels.push(name.clone());
        values.push((t * 100.0).round() / 100.0);
        by_type.push(vec![json!(name), json!(n), money(t)]);
    }

    let mut stmt = conn.prepare(
        "SELECT e.date, IFNULL(t.name,'(uncategorized)'), e.amount, e.currency, e.rate, e.total,
                IFNULL(e.bill_no,''), IFNULL(e.description,'')
         FROM expenses e LEFT JOIN expense_types t ON t.id=e.expense_type_id
         WHERE substr(e.date,1,10) BETWEEN ?1 AND ?2
         ORDER BY e.date, e.id",
    )?;
    let rows = stmt.query_map(params![from, to], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, f64>(2)?,
            r.get::<_, String>(3)?,
            r.get::<_, f64>(4)?,
            r.get::<_, f64>(5)?,
            r.get::<_, String>(6)?,
            r.get::<_, String>(7)?,
        ))
    })?;
    let mut detail = Vec::new();
    for row in rows {
        let (date, kind, amount, ccy, rate, t, bill, desc) = row?;
        detail.push(vec![
            json!(date),
            json!(kind),
            money(amount),
            json!(ccy),
            json!(rate),
            money(t),
            json!(bill),
            json!(desc),
        ]);
    }

    let sections = vec![
        summary_section(vec![
            ("Expenses", count.to_string()),
            ("Total", money_text(total)?),
        ]),
        Section::table("By type", &["Type", "Count", "Total"], by_type),
        Section::chart(
            "Share by type",
            ChartData {
                kind: "pie".to_string(),
                categories: Vec::new(),
                series: ChartSeries::Values(values),
                labels,
            },
        ),
        Section::table(
            "Expenses",
            &[
                "Date",
                "Type",
                "Amount",
                "Currency",
                "Rate",
                "Total",
                "Bill no",
                "Description",
            ],
            detail,
        ),
    ];
    new_report(conn, "Expense report", range, sections)
}
