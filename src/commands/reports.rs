// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::builders::{self, DateRange, ReportKind};
use crate::export::{render_text, write_csv_workbook, write_json};
use crate::report::Report;
use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let kind = ReportKind::parse(m.get_one::<String>("kind").unwrap())?;
    let range = DateRange::parse(
        m.get_one::<String>("from").unwrap(),
        m.get_one::<String>("to").unwrap(),
    )?;
    let report = builders::build(conn, kind, &range)?;
    emit(&report, m)
}

/// Print the report and write any requested export files. Shared by the
/// deterministic and the AI report commands.
pub fn emit(report: &Report, m: &clap::ArgMatches) -> Result<()> {
    if m.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", render_text(report));
    }
    if let Some(dir) = m.get_one::<String>("export") {
        let files = write_csv_workbook(report, Path::new(dir))?;
        eprintln!("Wrote {} files to {}", files.len(), dir);
    }
    if let Some(path) = m.get_one::<String>("json-out") {
        write_json(report, Path::new(path))?;
        eprintln!("Wrote {}", path);
    }
    Ok(())
}
