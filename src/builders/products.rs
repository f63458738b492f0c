// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::{DateRange, money, money_text, new_report, summary_section};
use crate::report::{Report, Section};
use anyhow::Result;
use rusqlite::{Connection, params};
use serde_json::json;

pub fn build(conn: &Connection, range: &DateRange) -> Result<Report> {
    let (from, to) = range.bounds();

    let (count, stock_value): (i64, f64) = conn.query_row(
        "SELECT COUNT(*), IFNULL(SUM(IFNULL(price,0.0) * IFNULL(stock_quantity,0.0)),0.0)
         FROM products",
        [],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    let sold: f64 = conn.query_row(
        "SELECT IFNULL(SUM(i.amount),0.0)
         FROM sale_items i JOIN sales s ON s.id=i.sale_id
         WHERE substr(s.date,1,10) BETWEEN ?1 AND ?2",
        params![from, to],
        |r| r.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT p.id, p.name, IFNULL(p.unit,''), IFNULL(p.stock_quantity,0.0),
                IFNULL(p.price,0.0), IFNULL(s.full_name,'')
         FROM products p LEFT JOIN suppliers s ON s.id=p.supplier_id
         ORDER BY p.name",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, f64>(3)?,
            r.get::<_, f64>(4)?,
            r.get::<_, String>(5)?,
        ))
    })?;
    let mut stock = Vec::new();
    for row in rows {
        let (id, name, unit, qty, price, supplier) = row?;
        stock.push(vec![
            json!(id),
            json!(name),
            json!(unit),
            json!(qty),
            money(price),
            json!(supplier),
        ]);
    }

    let mut stmt = conn.prepare(
        "SELECT p.name, SUM(i.amount), SUM(i.total)
         FROM sale_items i
         JOIN sales s ON s.id=i.sale_id
         JOIN products p ON p.id=i.product_id
         WHERE substr(s.date,1,10) BETWEEN ?1 AND ?2
         GROUP BY p.id ORDER BY SUM(i.amount) DESC LIMIT 10",
    )?;
    let rows = stmt.query_map(params![from, to], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, f64>(1)?,
            r.get::<_, f64>(2)?,
        ))
    })?;
    let mut best = Vec::new();
    for row in rows {
        let (name, qty, revenue) = row?;
        best.push(vec![json!(name), json!(qty), money(revenue)]);
    }

    let sections = vec![
        summary_section(vec![
            ("Products", count.to_string()),
            ("Stock value", money_text(stock_value)?),
            ("Units sold", format!("{}", sold)),
        ]),
        Section::table(
            "Stock",
            &["ID", "Product", "Unit", "In stock", "Price", "Supplier"],
            stock,
        ),
        Section::table("Best sellers", &["Product", "Sold", "Revenue"], best),
    ];
    new_report(conn, "Product report", range, sections)
}
