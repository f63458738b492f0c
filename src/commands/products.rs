// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db::{Table, prepare_tables};
use crate::models::Product;
use crate::utils::{
    maybe_print_json, optional_text, parse_non_negative, pretty_table, require_row, require_text,
};
use anyhow::{Result, bail};
use rusqlite::{Connection, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    prepare_tables(conn, &[Table::Suppliers, Table::Products]);
    match m.subcommand() {
        Some(("add", sub)) => {
            let id = add(conn, sub)?;
            println!("Added product #{}", id);
        }
        Some(("edit", sub)) => {
            let id = edit(conn, sub)?;
            println!("Updated product #{}", id);
        }
        Some(("list", sub)) => {
            let data = list(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|p| {
                        vec![
                            p.id.to_string(),
                            p.name,
                            p.unit.unwrap_or_default(),
                            p.stock_quantity.map(|q| q.to_string()).unwrap_or_default(),
                            p.price.map(|v| format!("{:.2}", v)).unwrap_or_default(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "Name", "Unit", "Stock", "Price"], rows)
                );
            }
        }
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let n = conn.execute("DELETE FROM products WHERE id=?1", params![id])?;
            if n == 0 {
                bail!("product #{} not found", id);
            }
            println!("Removed product #{}", id);
        }
        _ => {}
    }
    Ok(())
}

pub fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<i64> {
    let name = require_text(sub.get_one::<String>("name").unwrap(), "Name")?;
    let price = sub
        .get_one::<String>("price")
        .map(|s| parse_non_negative(s, "price"))
        .transpose()?;
    let stock = sub
        .get_one::<String>("stock")
        .map(|s| parse_non_negative(s, "stock"))
        .transpose()?;
    let supplier = sub.get_one::<i64>("supplier").copied();
    if let Some(sid) = supplier {
        require_row(conn, "suppliers", sid, "supplier")?;
    }
    conn.execute(
        "INSERT INTO products(name, description, price, supplier_id, stock_quantity, unit, bar_code)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            name,
            sub.get_one::<String>("description"),
            price,
            supplier,
            stock,
            sub.get_one::<String>("unit"),
            sub.get_one::<String>("barcode"),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Stock can be corrected here; sales and purchases keep moving it after.
pub fn edit(conn: &Connection, sub: &clap::ArgMatches) -> Result<i64> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let name = optional_text(sub, "name", "Name")?;
    let price = sub
        .get_one::<String>("price")
        .map(|s| parse_non_negative(s, "price"))
        .transpose()?;
    let stock = sub
        .get_one::<String>("stock")
        .map(|s| parse_non_negative(s, "stock"))
        .transpose()?;
    let supplier = sub.get_one::<i64>("supplier").copied();
    require_row(conn, "products", id, "product")?;
    if let Some(sid) = supplier {
        require_row(conn, "suppliers", sid, "supplier")?;
    }
    conn.execute(
        "UPDATE products SET name = IFNULL(?1, name), price = IFNULL(?2, price),
                stock_quantity = IFNULL(?3, stock_quantity), unit = IFNULL(?4, unit),
                supplier_id = IFNULL(?5, supplier_id), bar_code = IFNULL(?6, bar_code),
                description = IFNULL(?7, description), updated_at = datetime('now')
         WHERE id=?8",
        params![
            name,
            price,
            stock,
            sub.get_one::<String>("unit"),
            supplier,
            sub.get_one::<String>("barcode"),
            sub.get_one::<String>("description"),
            id
        ],
    )?;
    Ok(id)
}

pub fn list(conn: &Connection) -> Result<Vec<Product>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, price, supplier_id, stock_quantity, unit, bar_code
         FROM products ORDER BY name",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(Product {
            id: r.get(0)?,
            name: r.get(1)?,
            description: r.get(2)?,
            price: r.get(3)?,
            supplier_id: r.get(4)?,
            stock_quantity: r.get(5)?,
            unit: r.get(6)?,
            bar_code: r.get(7)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
