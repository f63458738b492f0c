// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use daftar::builders::{self, DateRange, ReportKind};
use daftar::db;
use daftar::report::{ChartSeries, RenderedReport, Report, Section, SectionKind};
use rusqlite::Connection;
use serde_json::json;

fn seeded() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn.execute_batch(
        r#"
        INSERT INTO customers(id, full_name, phone, address) VALUES
            (1,'Ahmad','0700','Kabul'),(2,'Zahra','0701','Mazar');
        INSERT INTO suppliers(id, full_name, phone, address) VALUES (1,'Karimi','0799','Herat');
        INSERT INTO products(id, name, price, stock_quantity, unit, supplier_id) VALUES
            (1,'Rice',25,10,'kg',1),(2,'Oil',90,4,'l',1);
        INSERT INTO sales(id, customer_id, date, total_amount, paid_amount, additional_cost) VALUES
            (1,1,'2025-01-10',75,50,5),(2,1,'2025-01-10',90,90,0),(3,2,'2025-02-15',25,0,0);
        INSERT INTO sale_items(sale_id, product_id, per_price, amount, total) VALUES
            (1,1,25,3,75),(2,2,90,1,90),(3,1,25,1,25);
        INSERT INTO purchases(id, supplier_id, date, total_amount, additional_cost) VALUES
            (1,1,'2025-01-02',200,10);
        INSERT INTO purchase_items(purchase_id, product_id, per_price, amount, total) VALUES (1,1,20,10,200);
        INSERT INTO purchase_payments(purchase_id, amount, currency, rate, total, date) VALUES
            (1,150,'AFN',1,150,'2025-01-02');
        INSERT INTO expense_types(id, name) VALUES (1,'Rent'),(2,'Fuel');
        INSERT INTO expenses(expense_type_id, amount, currency, rate, total, date) VALUES
            (1,300,'AFN',1,300,'2025-01-01'),(2,10,'USD',70,700,'2025-01-20'),(2,50,'AFN',1,50,'2025-03-01');
        INSERT INTO accounts(id, name, initial_balance, current_balance) VALUES (1,'Cash',100,240);
        INSERT INTO account_transactions(account_id, transaction_type, amount, currency, total, transaction_date) VALUES
            (1,'deposit',140,'AFN',140,'2025-01-10'),(1,'withdraw',0,'AFN',0,'2025-01-11');
        "#,
    )
    .unwrap();
    conn
}

fn january() -> DateRange {
    DateRange::parse("2025-01-01", "2025-01-31").unwrap()
}

fn section<'a>(r: &'a Report, title: &str) -> &'a Section {
    r.sections
        .iter()
        .find(|s| s.title == title)
        .unwrap_or_else(|| panic!("no section '{}'", title))
}

fn summary_value(r: &Report, metric: &str) -> String {
    let t = section(r, "Summary").table.as_ref().unwrap();
    t.rows
        .iter()
        .find(|row| row[0] == json!(metric))
        .map(|row| row[1].as_str().unwrap().to_string())
        .unwrap_or_else(|| panic!("no metric '{}'", metric))
}

#[test]
fn sales_report_filters_by_range() {
    let conn = seeded();
    let r = builders::build(&conn, ReportKind::Sales, &january()).unwrap();
    assert_eq!(r.title, "Sales report");
    assert_eq!(r.summary.as_deref(), Some("Period 2025-01-01 to 2025-01-31"));
    assert_eq!(summary_value(&r, "Sales"), "2");
    assert_eq!(summary_value(&r, "Total amount"), "165.00");
    assert_eq!(summary_value(&r, "Outstanding"), "30.00");

    let sales = section(&r, "Sales").table.as_ref().unwrap();
    assert_eq!(sales.rows.len(), 2);
    assert_eq!(sales.rows[0][5], json!(30.0));

    let top = section(&r, "Top products").table.as_ref().unwrap();
    assert_eq!(top.rows[0][0], json!("Oil"));

    let chart = section(&r, "Daily sales").chart.as_ref().unwrap();
    assert_eq!(chart.kind, "bar");
    assert_eq!(chart.categories, vec!["2025-01-10".to_string()]);
    match &chart.series {
        ChartSeries::Named(s) => assert_eq!(s[0].data, vec![165.0]),
        other => panic!("unexpected series {:?}", other),
    }
}

#[test]
fn company_name_prefixes_title() {
    let conn = seeded();
    conn.execute("INSERT INTO company_settings(name) VALUES ('Daftar Co')", [])
        .unwrap();
    let r = builders::build(&conn, ReportKind::Products, &january()).unwrap();
    assert_eq!(r.title, "Daftar Co: Product report");
}

#[test]
fn empty_period_renders_no_data_rows() {
    let conn = seeded();
    let range = DateRange::parse("2024-01-01", "2024-01-31").unwrap();
    let r = builders::build(&conn, ReportKind::Sales, &range).unwrap();
    assert_eq!(summary_value(&r, "Sales"), "0");
    assert!(section(&r, "Sales").table.as_ref().unwrap().rows.is_empty());

    let rendered = RenderedReport::from(&r);
    let sales = rendered.sections.iter().find(|s| s.title() == "Sales").unwrap();
    let (header, rows) = sales.grid();
    assert_eq!(header.len(), 6);
    assert_eq!(rows, vec![vec!["No data".to_string(), "".into(), "".into(), "".into(), "".into(), "".into()]]);
}

#[test]
fn purchases_include_additional_cost_in_outstanding() {
    let conn = seeded();
    let r = builders::build(&conn, ReportKind::Purchases, &january()).unwrap();
    assert_eq!(summary_value(&r, "Paid"), "150.00");
    assert_eq!(summary_value(&r, "Outstanding"), "60.00");
}

#[test]
fn expenses_have_pie_share() {
    let conn = seeded();
    let r = builders::build(&conn, ReportKind::Expenses, &january()).unwrap();
    assert_eq!(summary_value(&r, "Total"), "1000.00");
    let pie = section(&r, "Share by type");
    assert_eq!(pie.kind, SectionKind::Chart);
    let chart = pie.chart.as_ref().unwrap();
    assert_eq!(chart.kind, "pie");
    assert_eq!(chart.labels, vec!["Fuel".to_string(), "Rent".to_string()]);
    assert_eq!(chart.series, ChartSeries::Values(vec![700.0, 300.0]));
}

#[test]
fn accounts_and_parties() {
    let conn = seeded();
    let r = builders::build(&conn, ReportKind::Accounts, &january()).unwrap();
    assert_eq!(summary_value(&r, "Deposits"), "140.00");
    assert_eq!(summary_value(&r, "Balance of active accounts"), "240.00");
    assert_eq!(section(&r, "Transactions").table.as_ref().unwrap().rows.len(), 2);

    let r = builders::build(&conn, ReportKind::Customers, &january()).unwrap();
    assert_eq!(summary_value(&r, "Customers with sales"), "1");
    let rows = &section(&r, "Customers").table.as_ref().unwrap().rows;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][0], json!("Ahmad"));
    assert_eq!(rows[0][3], json!(170.0));
    assert_eq!(rows[0][5], json!(30.0));
    assert_eq!(rows[1][2], json!(0));

    let r = builders::build(&conn, ReportKind::Suppliers, &january()).unwrap();
    let rows = &section(&r, "Suppliers").table.as_ref().unwrap().rows;
    assert_eq!(rows[0][3], json!(210.0));
    assert_eq!(rows[0][5], json!(60.0));
}

#[test]
fn range_and_kind_are_validated() {
    assert!(DateRange::parse("2025-02-01", "2025-01-01").is_err());
    assert!(DateRange::parse("2025-13-01", "2025-12-31").is_err());
    assert_eq!(ReportKind::parse(" Sales ").unwrap(), ReportKind::Sales);
    let err = ReportKind::parse("payroll").unwrap_err();
    assert!(err.to_string().contains("sales|purchases"));
}
