// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::db::{Table, prepare_tables};
use crate::models::CompanySettings;
use crate::utils::{pretty_table, require_text};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    prepare_tables(conn, &[Table::CompanySettings]);
    match m.subcommand() {
        Some(("set", sub)) => {
            let settings = CompanySettings {
                name: require_text(sub.get_one::<String>("name").unwrap(), "Name")?.to_string(),
                phone: sub.get_one::<String>("phone").cloned(),
                address: sub.get_one::<String>("address").cloned(),
                email: sub.get_one::<String>("email").cloned(),
            };
            save(conn, &settings)?;
            println!("Company details saved");
        }
        Some(("show", _)) => match load(conn)? {
            Some(c) => {
                let rows = vec![
                    vec!["Name".to_string(), c.name],
                    vec!["Phone".to_string(), c.phone.unwrap_or_default()],
                    vec!["Address".to_string(), c.address.unwrap_or_default()],
                    vec!["Email".to_string(), c.email.unwrap_or_default()],
                ];
                println!("{}", pretty_table(&["Field", "Value"], rows));
            }
            None => println!("No company details set"),
        },
        _ => {}
    }
    Ok(())
}

/// Single-row table: update the first row, insert if there is none.
pub fn save(conn: &Connection, c: &CompanySettings) -> Result<()> {
    let updated = conn.execute(
        "UPDATE company_settings SET name=?1, phone=?2, address=?3, email=?4, updated_at=datetime('now')
         WHERE id = (SELECT id FROM company_settings ORDER BY id LIMIT 1)",
        params![c.name, c.phone, c.address, c.email],
    )?;
    if updated == 0 {
        conn.execute(
            "INSERT INTO company_settings(name, phone, address, email) VALUES (?1, ?2, ?3, ?4)",
            params![c.name, c.phone, c.address, c.email],
        )?;
    }
    Ok(())
}

pub fn load(conn: &Connection) -> Result<Option<CompanySettings>> {
    let c = conn
        .query_row(
            "SELECT name, phone, address, email FROM company_settings ORDER BY id LIMIT 1",
            [],
            |r| {
                Ok(CompanySettings {
                    name: r.get(0)?,
                    phone: r.get(1)?,
                    address: r.get(2)?,
                    email: r.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(c)
}
