// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Units of measure and currencies. Both are a unique name with a factor
//! relative to a single base entry.

use crate::db::{Table, prepare_tables};
use crate::models::CatalogEntry;
use crate::utils::{maybe_print_json, parse_positive, pretty_table, require_text};
use anyhow::{Result, bail};
use rusqlite::{Connection, OptionalExtension, params};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    Unit,
    Currency,
}

impl CatalogKind {
    fn table(self) -> Table {
        match self {
            CatalogKind::Unit => Table::Units,
            CatalogKind::Currency => Table::Currencies,
        }
    }

    fn label(self) -> &'static str {
        match self {
            CatalogKind::Unit => "unit",
            CatalogKind::Currency => "currency",
        }
    }

    /// Name of the factor column and CLI argument.
    fn factor(self) -> &'static str {
        match self {
            CatalogKind::Unit => "ratio",
            CatalogKind::Currency => "rate",
        }
    }

    fn base_column(self) -> &'static str {
        match self {
            CatalogKind::Unit => "is_base",
            CatalogKind::Currency => "base",
        }
    }
}

pub fn handle(conn: &Connection, kind: CatalogKind, m: &clap::ArgMatches) -> Result<()> {
    prepare_tables(conn, &[kind.table()]);
    match m.subcommand() {
        Some(("add", sub)) => {
            let id = add(conn, kind, sub)?;
            println!("Added {} #{}", kind.label(), id);
        }
        Some(("list", sub)) => {
            let data = list(conn, kind)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|e| {
                        vec![
                            e.id.to_string(),
                            e.name,
                            e.factor.to_string(),
                            if e.is_base { "yes" } else { "" }.to_string(),
                        ]
                    })
                    .collect();
                let factor = match kind {
                    CatalogKind::Unit => "Ratio",
                    CatalogKind::Currency => "Rate",
                };
                println!("{}", pretty_table(&["ID", "Name", factor, "Base"], rows));
            }
        }
        _ => {}
    }
    Ok(())
}

/// Insert a new entry. Marking it as base clears the flag on every other
/// entry of the same kind.
pub fn add(conn: &Connection, kind: CatalogKind, sub: &clap::ArgMatches) -> Result<i64> {
    let name = require_text(sub.get_one::<String>("name").unwrap(), "Name")?;
    let factor = parse_positive(sub.get_one::<String>(kind.factor()).unwrap(), kind.factor())?;
    let base = sub.get_flag("base");
    let table = kind.table().name();

    let clash: Option<i64> = conn
        .query_row(
            &format!("SELECT id FROM {} WHERE name=?1", table),
            params![name],
            |r| r.get(0),
        )
        .optional()?;
    if let Some(id) = clash {
        bail!("{} '{}' already exists as #{}", kind.label(), name, id);
    }

    let tx = conn.unchecked_transaction()?;
    if base {
        tx.execute(
            &format!("UPDATE {} SET {} = 0", table, kind.base_column()),
            [],
        )?;
    }
    tx.execute(
        &format!(
            "INSERT INTO {}(name, {}, {}) VALUES (?1, ?2, ?3)",
            table,
            kind.factor(),
            kind.base_column()
        ),
        params![name, factor, base as i64],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;
    Ok(id)
}

pub fn list(conn: &Connection, kind: CatalogKind) -> Result<Vec<CatalogEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, name, {factor}, {base} FROM {table} ORDER BY {base} DESC, name",
        factor = kind.factor(),
        base = kind.base_column(),
        table = kind.table().name()
    ))?;
    let rows = stmt.query_map([], |r| {
        Ok(CatalogEntry {
            id: r.get(0)?,
            name: r.get(1)?,
            factor: r.get(2)?,
            is_base: r.get::<_, i64>(3)? != 0,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
