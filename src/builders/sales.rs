// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{DateRange, money, money_text, new_report, summary_section};
use crate::report::{ChartData, ChartSeries, NamedSeries, Report, Section};
use crate::utils::{fmt_amount, to_decimal};
use anyhow::Result;
use rusqlite::{Connection, params};
use serde_json::json;

pub fn build(conn: &Connection, range: &DateRange) -> Result<Report> {
    let (from, to) = range.bounds();

    let (count, total, paid, extra): (i64, f64, f64, f64) = conn.query_row(
        "SELECT COUNT(*), IFNULL(SUM(total_amount),0.0), IFNULL(SUM(paid_amount),0.0),
                IFNULL(SUM(additional_cost),0.0)
         FROM sales WHERE substr(date,1,10) BETWEEN ?1 AND ?2",
        params![from, to],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
    )?;
    let outstanding = to_decimal(total + extra)? - to_decimal(paid)?;

    let mut stmt = conn.prepare(
        "SELECT s.id, s.date, IFNULL(c.full_name,'(unknown)'), s.total_amount, s.paid_amount,
                s.additional_cost
         FROM sales s LEFT JOIN customers c ON c.id=s.customer_id
         WHERE substr(s.date,1,10) BETWEEN ?1 AND ?2
         ORDER BY s.date, s.id",
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
    let mut sale_rows = Vec::new();
    for row in rows {
        let (id, date, customer, t, p, extra) = row?;
        sale_rows.push(vec![
            json!(id),
            json!(date),
            json!(customer),
            money(t),
            money(p),
            money(t + extra - p),
        ]);
    }

    let mut stmt = conn.prepare(
        "SELECT IFNULL(p.name,'(deleted)'), SUM(i.amount), SUM(i.total)
         FROM sale_items i
         JOIN sales s ON s.id=i.sale_id
         LEFT JOIN products p ON p.id=i.product_id
         WHERE substr(s.date,1,10) BETWEEN ?1 AND ?2
         GROUP BY i.product_id ORDER BY SUM(i.total) DESC LIMIT 10",
    )?;
    let rows = stmt.query_map(params![from, to], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, f64>(1)?,
            r.get::<_, f64>(2)?,
        ))
    })?;
    let mut product_rows = Vec::new();
    for row in rows {
        let (name, qty, revenue) = row?;
        product_rows.push(vec![json!(name), json!(qty), money(revenue)]);
    }

    let mut stmt = conn.prepare(
        "SELECT substr(date,1,10) AS day, SUM(total_amount)
         FROM sales WHERE substr(date,1,10) BETWEEN ?1 AND ?2
         GROUP BY day ORDER BY day",
    )?;
    let rows = stmt.query_map(params![from, to], |r| {
        Ok((r.get::<_, String>(0)?, r.get::<_, f64>(1)?))
    })?;
    let mut days = Vec::new();
    let mut totals = Vec::new();
    for row in rows {
        let (d, t) = row?;
        days.push(d);
        totals.push((t * 100.0).round() / 100.0);
    }

    let sections = vec![
        summary_section(vec![
            ("Sales", count.to_string()),
            ("Total amount", money_text(total)?),
            ("Paid", money_text(paid)?),
            ("Outstanding", fmt_amount(outstanding)),
            ("Additional costs", money_text(extra)?),
        ]),
        Section::table(
            "Sales",
            &["ID", "Date", "Customer", "Total", "Paid", "Remaining"],
            sale_rows,
        ),
        Section::table("Top products", &["Product", "Quantity", "Revenue"], product_rows),
        Section::chart(
            "Daily sales",
            ChartData {
                kind: "bar".to_string(),
                categories: days,
                series: ChartSeries::Named(vec![NamedSeries {
                    name: "Total".to_string(),
                    data: totals,
                }]),
                labels: Vec::new(),
            },
        ),
    ];
    new_report(conn, "Sales report", range, sections)
}
