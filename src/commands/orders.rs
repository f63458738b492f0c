// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Sales and purchases. Both carry line items whose totals are summed here,
//! so the stored `total_amount` always equals the sum of its items.

use crate::commands::accounts::{Movement, record_movement};
use crate::db::{Table, prepare_tables};
use crate::models::{LineItem, Purchase, Sale};
use crate::utils::{
    maybe_print_json, parse_date, parse_non_negative, parse_positive, pretty_table, require_row,
    require_text,
};
use anyhow::{Context, Result, bail};
use log::debug;
use rusqlite::{Connection, Transaction, params};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderKind {
    Sale,
    Purchase,
}

impl OrderKind {
    fn label(self) -> &'static str {
        match self {
            OrderKind::Sale => "sale",
            OrderKind::Purchase => "purchase",
        }
    }

    fn party_arg(self) -> &'static str {
        match self {
            OrderKind::Sale => "customer",
            OrderKind::Purchase => "supplier",
        }
    }

    fn party_table(self) -> &'static str {
        match self {
            OrderKind::Sale => "customers",
            OrderKind::Purchase => "suppliers",
        }
    }

    /// Order table, item table and the item foreign key column.
    fn tables(self) -> (&'static str, &'static str, &'static str) {
        match self {
            OrderKind::Sale => ("sales", "sale_items", "sale_id"),
            OrderKind::Purchase => ("purchases", "purchase_items", "purchase_id"),
        }
    }

    fn party_column(self) -> &'static str {
        match self {
            OrderKind::Sale => "customer_id",
            OrderKind::Purchase => "supplier_id",
        }
    }

    /// Sign applied to product stock per unit on the line.
    fn stock_sign(self) -> f64 {
        match self {
            OrderKind::Sale => -1.0,
            OrderKind::Purchase => 1.0,
        }
    }
}

pub fn handle(conn: &mut Connection, kind: OrderKind, m: &clap::ArgMatches) -> Result<()> {
    prepare_tables(
        conn,
        &[
            Table::Customers,
            Table::Suppliers,
            Table::Products,
            Table::Accounts,
            Table::Sales,
            Table::Purchases,
        ],
    );
    match m.subcommand() {
        Some(("add", sub)) => {
            let id = add(conn, kind, sub)?;
            println!("Recorded {} #{}", kind.label(), id);
        }
        Some(("edit", sub)) => {
            let id = edit(conn, kind, sub)?;
            println!("Updated {} #{}", kind.label(), id);
        }
        Some(("list", sub)) => list_cmd(conn, kind, sub)?,
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            remove(conn, kind, id)?;
            println!("Removed {} #{}", kind.label(), id);
        }
        _ => {}
    }
    Ok(())
}

/// Parse `PRODUCT_ID:QTY:PRICE`.
pub fn parse_item(s: &str) -> Result<LineItem> {
    let parts: Vec<&str> = s.split(':').map(str::trim).collect();
    if parts.len() != 3 {
        bail!("Invalid item '{}', expected PRODUCT_ID:QTY:PRICE", s);
    }
    let product_id: i64 = parts[0]
        .parse()
        .with_context(|| format!("Invalid product id '{}'", parts[0]))?;
    Ok(LineItem {
        product_id,
        amount: parse_positive(parts[1], "quantity")?,
        per_price: parse_positive(parts[2], "price")?,
    })
}

/// Parse `NAME:AMOUNT` for a named sale cost such as transport.
pub fn parse_cost(s: &str) -> Result<(String, f64)> {
    let Some((name, amount)) = s.rsplit_once(':') else {
        bail!("Invalid cost '{}', expected NAME:AMOUNT", s);
    };
    let name = require_text(name, "Cost name")?;
    Ok((name.to_string(), parse_non_negative(amount, "cost amount")?))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn parse_items(sub: &clap::ArgMatches) -> Result<Option<Vec<LineItem>>> {
    sub.get_many::<String>("item")
        .map(|vals| vals.map(|s| parse_item(s)).collect::<Result<Vec<_>>>())
        .transpose()
}

fn parse_costs(sub: &clap::ArgMatches) -> Result<Vec<(String, f64)>> {
    match sub.try_get_many::<String>("cost") {
        Ok(Some(vals)) => vals.map(|s| parse_cost(s)).collect(),
        _ => Ok(Vec::new()),
    }
}

fn parse_extra(sub: &clap::ArgMatches) -> Result<Option<f64>> {
    sub.get_one::<String>("additional-cost")
        .map(|s| parse_non_negative(s, "additional cost"))
        .transpose()
}

fn check_paid(kind: OrderKind, paid: f64, total: f64, extra: f64) -> Result<()> {
    if paid > total + extra + 1e-9 {
        bail!(
            "Paid amount {:.2} exceeds the {} total {:.2}",
            paid,
            kind.label(),
            total + extra
        );
    }
    Ok(())
}

fn insert_items(tx: &Transaction, kind: OrderKind, id: i64, items: &[LineItem]) -> Result<()> {
    let (_, items_table, fk) = kind.tables();
    for it in items {
        tx.execute(
            &format!(
                "INSERT INTO {}({}, product_id, per_price, amount, total) VALUES (?1, ?2, ?3, ?4, ?5)",
                items_table, fk
            ),
            params![id, it.product_id, it.per_price, it.amount, round2(it.total())],
        )?;
        tx.execute(
            "UPDATE products SET stock_quantity = IFNULL(stock_quantity,0) + ?1,
                                 updated_at = datetime('now')
             WHERE id=?2",
            params![kind.stock_sign() * it.amount, it.product_id],
        )?;
    }
    Ok(())
}

/// Undo the stock effect of the stored items and delete them.
fn clear_items(tx: &Transaction, kind: OrderKind, id: i64) -> Result<()> {
    let (_, items_table, fk) = kind.tables();
    tx.execute(
        &format!(
            "UPDATE products SET stock_quantity = IFNULL(stock_quantity,0) - ?1 *
                (SELECT IFNULL(SUM(i.amount),0) FROM {items} i WHERE i.{fk}=?2 AND i.product_id=products.id)
             WHERE id IN (SELECT product_id FROM {items} WHERE {fk}=?2)",
            items = items_table,
            fk = fk
        ),
        params![kind.stock_sign(), id],
    )?;
    tx.execute(&format!("DELETE FROM {} WHERE {}=?1", items_table, fk), params![id])?;
    Ok(())
}

fn insert_costs(tx: &Transaction, sale_id: i64, costs: &[(String, f64)]) -> Result<()> {
    for (name, amount) in costs {
        tx.execute(
            "INSERT INTO sale_additional_costs(sale_id, name, amount) VALUES (?1, ?2, ?3)",
            params![sale_id, name, amount],
        )?;
    }
    Ok(())
}

/// Amount already paid against the order.
fn paid_so_far(conn: &Connection, kind: OrderKind, id: i64) -> Result<f64> {
    let sql = match kind {
        OrderKind::Sale => "SELECT paid_amount FROM sales WHERE id=?1",
        OrderKind::Purchase => {
            "SELECT IFNULL(SUM(total),0.0) FROM purchase_payments WHERE purchase_id=?1"
        }
    };
    Ok(conn.query_row(sql, params![id], |r| r.get(0))?)
}

pub fn add(conn: &mut Connection, kind: OrderKind, sub: &clap::ArgMatches) -> Result<i64> {
    let party_id = *sub.get_one::<i64>(kind.party_arg()).unwrap();
    let date = parse_date(sub.get_one::<String>("date").unwrap())?.to_string();
    let items = parse_items(sub)?.unwrap_or_default();
    let paid = sub
        .get_one::<String>("paid")
        .map(|s| parse_non_negative(s, "paid amount"))
        .transpose()?
        .unwrap_or(0.0);
    let costs = parse_costs(sub)?;
    let extra = round2(parse_extra(sub)?.unwrap_or(0.0) + costs.iter().map(|c| c.1).sum::<f64>());
    let account = sub.get_one::<i64>("account").copied();
    let notes = sub.get_one::<String>("notes");

    let total = round2(items.iter().map(LineItem::total).sum());
    check_paid(kind, paid, total, extra)?;
    require_row(conn, kind.party_table(), party_id, kind.party_arg())?;
    for it in &items {
        require_row(conn, "products", it.product_id, "product")?;
    }
    if let Some(a) = account {
        require_row(conn, "accounts", a, "account")?;
    }

    let tx = conn.transaction()?;
    let id = match kind {
        OrderKind::Sale => {
            tx.execute(
                "INSERT INTO sales(customer_id, date, notes, total_amount, base_amount, paid_amount, additional_cost)
                 VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6)",
                params![party_id, date, notes, total, paid, extra],
            )?;
            let id = tx.last_insert_rowid();
            insert_costs(&tx, id, &costs)?;
            if paid > 0.0 {
                tx.execute(
                    "INSERT INTO sale_payments(sale_id, account_id, amount, base_amount, date)
                     VALUES (?1, ?2, ?3, ?3, ?4)",
                    params![id, account, paid, date],
                )?;
            }
            id
        }
        OrderKind::Purchase => {
            tx.execute(
                "INSERT INTO purchases(supplier_id, date, notes, total_amount, additional_cost)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![party_id, date, notes, total, extra],
            )?;
            let id = tx.last_insert_rowid();
            if paid > 0.0 {
                tx.execute(
                    "INSERT INTO purchase_payments(purchase_id, account_id, amount, currency, rate, total, date)
                     VALUES (?1, ?2, ?3, 'AFN', 1.0, ?3, ?4)",
                    params![id, account, paid, date],
                )?;
            }
            id
        }
    };
    insert_items(&tx, kind, id, &items)?;
    if let (Some(a), true) = (account, paid > 0.0) {
        let movement = match kind {
            OrderKind::Sale => Movement::Deposit,
            OrderKind::Purchase => Movement::Withdraw,
        };
        let note = format!("{} #{}", kind.label(), id);
        record_movement(&tx, a, movement, paid, "AFN", 1.0, &date, Some(note.as_str()))?;
    }
    tx.commit()?;
    Ok(id)
}

/// Change an existing order. Items given with `--item` replace the stored
/// lines; stock and `total_amount` follow the new lines. Payments are left as
/// recorded, so the new total must still cover them.
pub fn edit(conn: &mut Connection, kind: OrderKind, sub: &clap::ArgMatches) -> Result<i64> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let (table, _, _) = kind.tables();
    require_row(conn, table, id, kind.label())?;

    let party = sub.get_one::<i64>(kind.party_arg()).copied();
    if let Some(pid) = party {
        require_row(conn, kind.party_table(), pid, kind.party_arg())?;
    }
    let date = sub
        .get_one::<String>("date")
        .map(|s| parse_date(s).map(|d| d.to_string()))
        .transpose()?;
    let notes = sub.get_one::<String>("notes");
    let items = parse_items(sub)?;
    if let Some(items) = &items {
        for it in items {
            require_row(conn, "products", it.product_id, "product")?;
        }
    }
    let costs = parse_costs(sub)?;
    let bare_extra = parse_extra(sub)?;

    let (old_total, old_extra): (f64, f64) = conn.query_row(
        &format!("SELECT total_amount, additional_cost FROM {} WHERE id=?1", table),
        params![id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    let total = items
        .as_ref()
        .map(|v| round2(v.iter().map(LineItem::total).sum()))
        .unwrap_or(old_total);
    let extra_changed = bare_extra.is_some() || !costs.is_empty();
    let extra = if extra_changed {
        round2(bare_extra.unwrap_or(0.0) + costs.iter().map(|c| c.1).sum::<f64>())
    } else {
        old_extra
    };
    check_paid(kind, paid_so_far(conn, kind, id)?, total, extra)?;

    let tx = conn.transaction()?;
    if let Some(items) = &items {
        clear_items(&tx, kind, id)?;
        insert_items(&tx, kind, id, items)?;
    }
    if extra_changed && kind == OrderKind::Sale {
        tx.execute("DELETE FROM sale_additional_costs WHERE sale_id=?1", params![id])?;
        insert_costs(&tx, id, &costs)?;
    }
    tx.execute(
        &format!(
            "UPDATE {table} SET {party} = IFNULL(?1, {party}), date = IFNULL(?2, date),
                    notes = IFNULL(?3, notes), total_amount = ?4, additional_cost = ?5,
                    updated_at = datetime('now')
             WHERE id=?6",
            table = table,
            party = kind.party_column()
        ),
        params![party, date, notes, total, extra, id],
    )?;
    if kind == OrderKind::Sale {
        tx.execute("UPDATE sales SET base_amount = total_amount WHERE id=?1", params![id])?;
    }
    tx.commit()?;
    debug!("{} #{} now totals {:.2} + {:.2}", kind.label(), id, total, extra);
    Ok(id)
}

fn remove(conn: &mut Connection, kind: OrderKind, id: i64) -> Result<()> {
    let (table, _, _) = kind.tables();
    require_row(conn, table, id, kind.label())?;
    let tx = conn.transaction()?;
    // undo the stock movement before the items go
    clear_items(&tx, kind, id)?;
    tx.execute(&format!("DELETE FROM {} WHERE id=?1", table), params![id])?;
    tx.commit()?;
    Ok(())
}

pub fn list_sales(conn: &Connection, from: Option<&str>, to: Option<&str>) -> Result<Vec<Sale>> {
    let mut stmt = conn.prepare(
        "SELECT id, customer_id, date, notes, total_amount, paid_amount, additional_cost
         FROM sales
         WHERE (?1 IS NULL OR substr(date,1,10) >= ?1) AND (?2 IS NULL OR substr(date,1,10) <= ?2)
         ORDER BY date DESC, id DESC",
    )?;
    let rows = stmt.query_map(params![from, to], |r| {
        Ok(Sale {
            id: r.get(0)?,
            customer_id: r.get(1)?,
            date: r.get(2)?,
            notes: r.get(3)?,
            total_amount: r.get(4)?,
            paid_amount: r.get(5)?,
            additional_cost: r.get(6)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn list_purchases(
    conn: &Connection,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Vec<Purchase>> {
    let mut stmt = conn.prepare(
        "SELECT id, supplier_id, date, notes, total_amount, additional_cost
         FROM purchases
         WHERE (?1 IS NULL OR substr(date,1,10) >= ?1) AND (?2 IS NULL OR substr(date,1,10) <= ?2)
         ORDER BY date DESC, id DESC",
    )?;
    let rows = stmt.query_map(params![from, to], |r| {
        Ok(Purchase {
            id: r.get(0)?,
            supplier_id: r.get(1)?,
            date: r.get(2)?,
            notes: r.get(3)?,
            total_amount: r.get(4)?,
            additional_cost: r.get(5)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn list_cmd(conn: &Connection, kind: OrderKind, sub: &clap::ArgMatches) -> Result<()> {
    let from = sub
        .get_one::<String>("from")
        .map(|s| parse_date(s).map(|d| d.to_string()))
        .transpose()?;
    let to = sub
        .get_one::<String>("to")
        .map(|s| parse_date(s).map(|d| d.to_string()))
        .transpose()?;
    let (json_flag, jsonl_flag) = (sub.get_flag("json"), sub.get_flag("jsonl"));
    match kind {
        OrderKind::Sale => {
            let data = list_sales(conn, from.as_deref(), to.as_deref())?;
            if !maybe_print_json(json_flag, jsonl_flag, &data)? {
                let rows = data
                    .into_iter()
                    .map(|s| {
                        vec![
                            s.id.to_string(),
                            s.date,
                            s.customer_id.to_string(),
                            format!("{:.2}", s.total_amount),
                            format!("{:.2}", s.paid_amount),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "Date", "Customer", "Total", "Paid"], rows)
                );
            }
        }
        OrderKind::Purchase => {
            let data = list_purchases(conn, from.as_deref(), to.as_deref())?;
            if !maybe_print_json(json_flag, jsonl_flag, &data)? {
                let rows = data
                    .into_iter()
                    .map(|p| {
                        vec![
                            p.id.to_string(),
                            p.date,
                            p.supplier_id.to_string(),
                            format!("{:.2}", p.total_amount),
                            format!("{:.2}", p.additional_cost),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(
                        &["ID", "Date", "Supplier", "Total", "Additional cost"],
                        rows
                    )
                );
            }
        }
    }
    Ok(())
}
