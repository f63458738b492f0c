// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Customers and suppliers: same columns, different tables.

use crate::db::{Table, prepare_tables};
use crate::models::Party;
use crate::utils::{maybe_print_json, optional_text, pretty_table, require_row, require_text};
use anyhow::{Result, bail};
use rusqlite::{Connection, params};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyKind {
    Customer,
    Supplier,
}

impl PartyKind {
    fn table(self) -> Table {
        match self {
            PartyKind::Customer => Table::Customers,
            PartyKind::Supplier => Table::Suppliers,
        }
    }

    fn label(self) -> &'static str {
        match self {
            PartyKind::Customer => "customer",
            PartyKind::Supplier => "supplier",
        }
    }
}

pub fn handle(conn: &Connection, kind: PartyKind, m: &clap::ArgMatches) -> Result<()> {
    prepare_tables(conn, &[kind.table()]);
    match m.subcommand() {
        Some(("add", sub)) => {
            let id = add(conn, kind, sub)?;
            println!("Added {} #{}", kind.label(), id);
        }
        Some(("edit", sub)) => {
            let id = edit(conn, kind, sub)?;
            println!("Updated {} #{}", kind.label(), id);
        }
        Some(("list", sub)) => {
            let data = list(conn, kind)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|p| {
                        vec![
                            p.id.to_string(),
                            p.full_name,
                            p.phone,
                            p.address,
                            p.email.unwrap_or_default(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "Name", "Phone", "Address", "Email"], rows)
                );
            }
        }
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            remove(conn, kind, id)?;
            println!("Removed {} #{}", kind.label(), id);
        }
        _ => {}
    }
    Ok(())
}

pub fn add(conn: &Connection, kind: PartyKind, sub: &clap::ArgMatches) -> Result<i64> {
    let name = require_text(sub.get_one::<String>("name").unwrap(), "Name")?;
    let phone = require_text(sub.get_one::<String>("phone").unwrap(), "Phone")?;
    let address = require_text(sub.get_one::<String>("address").unwrap(), "Address")?;
    let email = sub.get_one::<String>("email");
    let notes = sub.get_one::<String>("notes");
    conn.execute(
        &format!(
            "INSERT INTO {}(full_name, phone, address, email, notes) VALUES (?1, ?2, ?3, ?4, ?5)",
            kind.table().name()
        ),
        params![name, phone, address, email, notes],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Overwrite the fields given on the command line and keep the rest.
pub fn edit(conn: &Connection, kind: PartyKind, sub: &clap::ArgMatches) -> Result<i64> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let name = optional_text(sub, "name", "Name")?;
    let phone = optional_text(sub, "phone", "Phone")?;
    let address = optional_text(sub, "address", "Address")?;
    require_row(conn, kind.table().name(), id, kind.label())?;
    conn.execute(
        &format!(
            "UPDATE {} SET full_name = IFNULL(?1, full_name), phone = IFNULL(?2, phone),
                    address = IFNULL(?3, address), email = IFNULL(?4, email),
                    notes = IFNULL(?5, notes), updated_at = datetime('now')
             WHERE id=?6",
            kind.table().name()
        ),
        params![
            name,
            phone,
            address,
            sub.get_one::<String>("email"),
            sub.get_one::<String>("notes"),
            id
        ],
    )?;
    Ok(id)
}

pub fn list(conn: &Connection, kind: PartyKind) -> Result<Vec<Party>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, full_name, phone, address, email, notes FROM {} ORDER BY full_name",
        kind.table().name()
    ))?;
    let rows = stmt.query_map([], |r| {
        Ok(Party {
            id: r.get(0)?,
            full_name: r.get(1)?,
            phone: r.get(2)?,
            address: r.get(3)?,
            email: r.get(4)?,
            notes: r.get(5)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn remove(conn: &Connection, kind: PartyKind, id: i64) -> Result<()> {
    let n = conn.execute(
        &format!("DELETE FROM {} WHERE id=?1", kind.table().name()),
        params![id],
    )?;
    if n == 0 {
        bail!("{} #{} not found", kind.label(), id);
    }
    Ok(())
}
