// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use daftar::export::{render_text, write_csv_workbook, write_json};
use daftar::report::{
    ChartData, ChartSeries, NamedSeries, RenderedReport, Report, Section, parse_report,
};
use serde_json::json;
use std::fs;
use tempfile::tempdir;

fn sample() -> Report {
    Report {
        title: "Monthly income".to_string(),
        summary: Some("First quarter".to_string()),
        sections: vec![
            Section::table(
                "Income / month",
                &["Month", "Total"],
                vec![vec![json!("01"), json!(120.5)], vec![json!("02"), json!(80)]],
            ),
            Section::table("Refunds", &["Date", "Amount"], Vec::new()),
            Section::chart(
                "Trend",
                ChartData {
                    kind: "line".to_string(),
                    categories: vec!["01".into(), "02".into(), "03".into()],
                    series: ChartSeries::Named(vec![NamedSeries {
                        name: "Income".into(),
                        data: vec![120.5, 80.0],
                    }]),
                    labels: Vec::new(),
                },
            ),
        ],
    }
}

#[test]
fn workbook_has_one_csv_per_section() {
    let dir = tempdir().unwrap();
    let files = write_csv_workbook(&sample(), dir.path()).unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["01-income-month.csv", "02-refunds.csv", "03-trend.csv"]);

    let income = fs::read_to_string(&files[0]).unwrap();
    assert_eq!(income, "Month,Total\n01,120.50\n02,80\n");

    let refunds = fs::read_to_string(&files[1]).unwrap();
    assert_eq!(refunds, "Date,Amount\nNo data,\n");

    // categories run one longer than the series; the extra point is dropped
    let trend = fs::read_to_string(&files[2]).unwrap();
    assert_eq!(trend, "Category,Income\n01,120.50\n02,80\n");
}

#[test]
fn json_export_parses_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("report.json");
    let report = sample();
    write_json(&report, &path).unwrap();
    let back = parse_report(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(back, report);
}

#[test]
fn rendered_view_converts_back_with_truncated_charts() {
    let report = sample();
    let back = RenderedReport::from(&report).into_report();
    assert_eq!(back.title, report.title);
    assert_eq!(back.sections[0], report.sections[0]);
    let chart = back.sections[2].chart.as_ref().unwrap();
    assert_eq!(chart.categories, vec!["01".to_string(), "02".to_string()]);
}

#[test]
fn text_rendering_shows_every_section() {
    let text = render_text(&sample());
    assert!(text.starts_with("Monthly income\nFirst quarter\n"));
    for title in ["Income / month", "Refunds", "Trend", "No data", "120.50"] {
        assert!(text.contains(title), "missing {}", title);
    }
}
