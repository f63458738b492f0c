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

type PartyRow = (String, String, i64, f64, f64);

fn collect(conn: &Connection, sql: &str, range: &DateRange) -> Result<Vec<PartyRow>> {
    let (from, to) = range.bounds();
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![from, to], |r| {
        Ok((
            r.get::<_, String>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, i64>(2)?,
            r.get::<_, f64>(3)?,
            r.get::<_, f64>(4)?,
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn assemble(
    conn: &Connection,
    name: &str,
    party: &str,
    count_label: &str,
    range: &DateRange,
    data: Vec<PartyRow>,
) -> Result<Report> {
    let active = data.iter().filter(|r| r.2 > 0).count();
    let total: f64 = data.iter().map(|r| r.3).sum();
    let paid: f64 = data.iter().map(|r| r.4).sum();
    let rows = data
        .into_iter()
        .map(|(n, phone, cnt, t, p)| {
            vec![json!(n), json!(phone), json!(cnt), money(t), money(p), money(t - p)]
        })
        .collect();
    let sections = vec![
        summary_section(vec![
            (party, active.to_string()),
            ("Total", money_text(total)?),
            ("Paid", money_text(paid)?),
            ("Balance", money_text(total - paid)?),
        ]),
        Section::table(
            name,
            &["Name", "Phone", count_label, "Total", "Paid", "Balance"],
            rows,
        ),
    ];
    new_report(conn, &format!("{} report", name), range, sections)
}

pub fn build_customers(conn: &Connection, range: &DateRange) -> Result<Report> {
    let data = collect(
        conn,
        "SELECT c.full_name, c.phone, COUNT(s.id),
                IFNULL(SUM(s.total_amount + s.additional_cost),0.0), IFNULL(SUM(s.paid_amount),0.0)
         FROM customers c
         LEFT JOIN sales s ON s.customer_id=c.id AND substr(s.date,1,10) BETWEEN ?1 AND ?2
         GROUP BY c.id
         ORDER BY IFNULL(SUM(s.total_amount + s.additional_cost),0.0) DESC, c.full_name",
        range,
    )?;
    assemble(
        conn,
        "Customers",
        "Customers with sales",
        "Sales",
        range,
        data,
    )
}

pub fn build_suppliers(conn: &Connection, range: &DateRange) -> Result<Report> {
    let data = collect(
        conn,
        "SELECT s.full_name, s.phone, COUNT(p.id),
                IFNULL(SUM(p.total_amount + p.additional_cost),0.0),
                IFNULL(SUM((SELECT IFNULL(SUM(pp.total),0.0) FROM purchase_payments pp
                            WHERE pp.purchase_id=p.id)),0.0)
         FROM suppliers s
         LEFT JOIN purchases p ON p.supplier_id=s.id AND substr(p.date,1,10) BETWEEN ?1 AND ?2
         GROUP BY s.id
         ORDER BY IFNULL(SUM(p.total_amount + p.additional_cost),0.0) DESC, s.full_name",
        range,
    )?;
    assemble(
        conn,
        "Suppliers",
        "Suppliers with purchases",
        "Purchases",
        range,
        data,
    )
}
