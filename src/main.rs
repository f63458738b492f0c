// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;

use daftar::commands::catalog::CatalogKind;
use daftar::commands::orders::OrderKind;
use daftar::commands::parties::PartyKind;
use daftar::{cli, commands, db};

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    // RUST_LOG, when set, wins over -v
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches();
    init_logging(matches.get_count("verbose"));

    let mut conn = db::open_or_init()?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", db::db_path()?.display());
        }
        Some(("config", sub)) => commands::config_cmd::handle(&conn, sub)?,
        Some(("customer", sub)) => commands::parties::handle(&conn, PartyKind::Customer, sub)?,
        Some(("supplier", sub)) => commands::parties::handle(&conn, PartyKind::Supplier, sub)?,
        Some(("product", sub)) => commands::products::handle(&conn, sub)?,
        Some(("sale", sub)) => commands::orders::handle(&mut conn, OrderKind::Sale, sub)?,
        Some(("purchase", sub)) => commands::orders::handle(&mut conn, OrderKind::Purchase, sub)?,
        Some(("expense", sub)) => commands::expenses::handle(&conn, sub)?,
        Some(("account", sub)) => commands::accounts::handle(&conn, sub)?,
        Some(("employee", sub)) => commands::payroll::handle_employee(&conn, sub)?,
        Some(("salary", sub)) => commands::payroll::handle_salary(&conn, sub)?,
        Some(("deduction", sub)) => commands::payroll::handle_deduction(&conn, sub)?,
        Some(("unit", sub)) => commands::catalog::handle(&conn, CatalogKind::Unit, sub)?,
        Some(("currency", sub)) => commands::catalog::handle(&conn, CatalogKind::Currency, sub)?,
        Some(("company", sub)) => commands::company::handle(&conn, sub)?,
        Some(("report", sub)) => commands::reports::handle(&conn, sub)?,
        Some(("query", sub)) => commands::query::handle(&conn, sub)?,
        Some(("ai", sub)) => commands::ai::handle(&conn, sub)?,
        Some(("doctor", _)) => commands::doctor::handle(&conn)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
