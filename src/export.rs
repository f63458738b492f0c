// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::report::{RenderedReport, Report};
use crate::utils::pretty_table;
use anyhow::{Context, Result};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

static NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

pub fn slug(title: &str) -> String {
    let lower = title.to_lowercase();
    let s = NON_SLUG.replace_all(&lower, "-");
    let s = s.trim_matches('-');
    if s.is_empty() {
        "section".to_string()
    } else {
        s.to_string()
    }
}

/// Terminal rendering: title, optional summary, then one table per section.
pub fn render_text(report: &Report) -> String {
    let rendered = RenderedReport::from(report);
    let mut out = String::new();
    out.push_str(&rendered.title);
    out.push('\n');
    if let Some(s) = &rendered.summary {
        out.push_str(s);
        out.push('\n');
    }
    for section in &rendered.sections {
        let (header, rows) = section.grid();
        let header: Vec<&str> = header.iter().map(String::as_str).collect();
        out.push('\n');
        out.push_str(section.title());
        out.push('\n');
        out.push_str(&pretty_table(&header, rows).to_string());
        out.push('\n');
    }
    out
}

/// Spreadsheet-style export: one CSV per section, header row then data rows.
pub fn write_csv_workbook(report: &Report, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("Create export dir {}", dir.display()))?;
    let rendered = RenderedReport::from(report);
    let mut written = Vec::new();
    for (i, section) in rendered.sections.iter().enumerate() {
        let path = dir.join(format!("{:02}-{}.csv", i + 1, slug(section.title())));
        let (header, rows) = section.grid();
        let mut wtr = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(&path)
            .with_context(|| format!("Create {}", path.display()))?;
        wtr.write_record(&header)?;
        for r in rows {
            wtr.write_record(&r)?;
        }
        wtr.flush()?;
        written.push(path);
    }
    info!("exported {} sections to {}", written.len(), dir.display());
    Ok(written)
}

pub fn write_json(report: &Report, path: &Path) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(report)?)
        .with_context(|| format!("Write {}", path.display()))?;
    Ok(())
}
