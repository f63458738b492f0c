// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The report document shared by the builders, the AI relay, the terminal
//! renderer and the exporters.

use crate::error::RelayError;
use crate::utils::truncate_chars;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const NO_DATA: &str = "No data";

static WHOLE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)\s*```\s*$").expect("valid regex")
});
static INNER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json|JSON)?[ \t]*\r?\n(.*?)```").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Table,
    Chart,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "type")]
    pub kind: SectionKind,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<TableData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartData>,
}

impl Section {
    pub fn table(title: impl Into<String>, columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Section {
            kind: SectionKind::Table,
            title: title.into(),
            table: Some(TableData {
                columns: columns.iter().map(|c| c.to_string()).collect(),
                rows,
            }),
            chart: None,
        }
    }

    pub fn chart(title: impl Into<String>, chart: ChartData) -> Self {
        Section {
            kind: SectionKind::Chart,
            title: title.into(),
            table: None,
            chart: Some(chart),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedSeries {
    pub name: String,
    pub data: Vec<f64>,
}

/// Bar/line charts carry named series; pie charts carry one flat list of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartSeries {
    Named(Vec<NamedSeries>),
    Values(Vec<f64>),
}

impl Default for ChartSeries {
    fn default() -> Self {
        ChartSeries::Named(Vec::new())
    }
}

impl ChartSeries {
    pub fn is_empty(&self) -> bool {
        match self {
            ChartSeries::Named(s) => s.is_empty(),
            ChartSeries::Values(v) => v.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "ChartSeries::is_empty")]
    pub series: ChartSeries,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

impl ChartData {
    /// Cut categories, labels and every series to their shortest common length.
    pub fn truncated(&self) -> ChartData {
        let mut lens: Vec<usize> = Vec::new();
        if !self.categories.is_empty() {
            lens.push(self.categories.len());
        }
        if !self.labels.is_empty() {
            lens.push(self.labels.len());
        }
        match &self.series {
            ChartSeries::Named(s) => lens.extend(s.iter().map(|x| x.data.len())),
            ChartSeries::Values(v) => lens.push(v.len()),
        }
        let n = lens.iter().copied().min().unwrap_or(0);
        let mut out = self.clone();
        if lens.iter().any(|l| *l != n) {
            debug!("chart '{}' truncated to {} points", self.kind, n);
        }
        out.categories.truncate(n);
        out.labels.truncate(n);
        match &mut out.series {
            ChartSeries::Named(s) => s.iter_mut().for_each(|x| x.data.truncate(n)),
            ChartSeries::Values(v) => v.truncate(n),
        }
        out
    }

    /// Point labels: categories when present, otherwise labels, otherwise 1..n.
    fn axis(&self, n: usize) -> Vec<String> {
        if !self.categories.is_empty() {
            self.categories.clone()
        } else if !self.labels.is_empty() {
            self.labels.clone()
        } else {
            (1..=n).map(|i| i.to_string()).collect()
        }
    }
}

/// Strip a markdown code fence around the model's answer, if any.
pub fn extract_json(raw: &str) -> &str {
    if let Some(c) = WHOLE_FENCE.captures(raw) {
        if let Some(m) = c.get(1) {
            return m.as_str().trim();
        }
    }
    if let Some(c) = INNER_FENCE.captures(raw) {
        if let Some(m) = c.get(1) {
            return m.as_str().trim();
        }
    }
    raw.trim()
}

/// Parse the model's final answer into a validated report.
pub fn parse_report(raw: &str) -> Result<Report, RelayError> {
    let body = extract_json(raw);
    let value: Value = serde_json::from_str(body).map_err(|e| RelayError::InvalidJson {
        reason: e.to_string(),
        prefix: truncate_chars(raw.trim(), 200),
    })?;
    validate_value(&value)?;
    let report: Report = serde_json::from_value(value)
        .map_err(|e| RelayError::MalformedReport(e.to_string()))?;
    validate_sections(&report)?;
    Ok(report)
}

fn validate_value(v: &Value) -> Result<(), RelayError> {
    let obj = v
        .as_object()
        .ok_or_else(|| RelayError::MalformedReport("top level is not an object".into()))?;
    if !obj.get("title").is_some_and(Value::is_string) {
        return Err(RelayError::MalformedReport("missing string 'title'".into()));
    }
    if !obj.get("sections").is_some_and(Value::is_array) {
        return Err(RelayError::MalformedReport("missing array 'sections'".into()));
    }
    Ok(())
}

pub fn validate_sections(report: &Report) -> Result<(), RelayError> {
    for (i, s) in report.sections.iter().enumerate() {
        let ok = match s.kind {
            SectionKind::Table => s.table.is_some(),
            SectionKind::Chart => s.chart.is_some(),
        };
        if !ok {
            return Err(RelayError::MalformedReport(format!(
                "section {} of type {:?} has no payload",
                i + 1,
                s.kind
            )));
        }
    }
    Ok(())
}

/// Normalised, render-ready view of a report.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedReport {
    pub title: String,
    pub summary: Option<String>,
    pub sections: Vec<RenderedSection>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderedSection {
    Table {
        title: String,
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    Chart {
        title: String,
        chart: ChartData,
    },
}

impl RenderedSection {
    pub fn title(&self) -> &str {
        match self {
            RenderedSection::Table { title, .. } | RenderedSection::Chart { title, .. } => title,
        }
    }

    /// Header plus display rows. Empty tables get a single "No data" row.
    pub fn grid(&self) -> (Vec<String>, Vec<Vec<String>>) {
        match self {
            RenderedSection::Table { columns, rows, .. } => {
                if rows.is_empty() {
                    let mut row = vec![String::new(); columns.len().max(1)];
                    row[0] = NO_DATA.to_string();
                    return (columns.clone(), vec![row]);
                }
                let body = rows
                    .iter()
                    .map(|r| r.iter().map(format_cell).collect())
                    .collect();
                (columns.clone(), body)
            }
            RenderedSection::Chart { chart, .. } => chart_grid(chart),
        }
    }
}

fn chart_grid(chart: &ChartData) -> (Vec<String>, Vec<Vec<String>>) {
    match &chart.series {
        ChartSeries::Named(series) => {
            let n = series.first().map(|s| s.data.len()).unwrap_or(0);
            let axis = chart.axis(n);
            let mut header = vec!["Category".to_string()];
            header.extend(series.iter().map(|s| s.name.clone()));
            let mut rows = Vec::new();
            for (i, label) in axis.iter().enumerate().take(n) {
                let mut row = vec![label.clone()];
                row.extend(
                    series
                        .iter()
                        .map(|s| s.data.get(i).map(|v| format_number(*v)).unwrap_or_default()),
                );
                rows.push(row);
            }
            if rows.is_empty() {
                rows.push(vec![NO_DATA.to_string()]);
            }
            (header, rows)
        }
        ChartSeries::Values(values) => {
            let axis = chart.axis(values.len());
            let mut rows: Vec<Vec<String>> = axis
                .iter()
                .zip(values.iter())
                .map(|(l, v)| vec![l.clone(), format_number(*v)])
                .collect();
            if rows.is_empty() {
                rows.push(vec![NO_DATA.to_string(), String::new()]);
            }
            (vec!["Label".to_string(), "Value".to_string()], rows)
        }
    }
}

pub fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

pub fn format_cell(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => format_number(n.as_f64().unwrap_or(0.0)),
        },
        other => other.to_string(),
    }
}

impl From<&Report> for RenderedReport {
    fn from(r: &Report) -> Self {
        let sections = r
            .sections
            .iter()
            .filter_map(|s| match s.kind {
                SectionKind::Table => s.table.as_ref().map(|t| RenderedSection::Table {
                    title: s.title.clone(),
                    columns: t.columns.clone(),
                    rows: t.rows.clone(),
                }),
                SectionKind::Chart => s.chart.as_ref().map(|c| RenderedSection::Chart {
                    title: s.title.clone(),
                    chart: c.truncated(),
                }),
            })
            .collect();
        RenderedReport {
            title: r.title.clone(),
            summary: r.summary.clone(),
            sections,
        }
    }
}

impl RenderedReport {
    pub fn into_report(self) -> Report {
        let sections = self
            .sections
            .into_iter()
            .map(|s| match s {
                RenderedSection::Table {
                    title,
                    columns,
                    rows,
                } => Section {
                    kind: SectionKind::Table,
                    title,
                    table: Some(TableData { columns, rows }),
                    chart: None,
                },
                RenderedSection::Chart { title, chart } => Section::chart(title, chart),
            })
            .collect();
        Report {
            title: self.title,
            summary: self.summary,
            sections,
        }
    }
}
