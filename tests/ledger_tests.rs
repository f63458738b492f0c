// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use daftar::builders::{self, DateRange, ReportKind};
use daftar::commands::catalog::{self, CatalogKind};
use daftar::commands::orders::{self, OrderKind};
use daftar::commands::parties::{self, PartyKind};
use daftar::commands::{accounts, company, doctor, expenses, payroll, products};
use daftar::report::Report;
use daftar::{cli, db};
use rusqlite::{Connection, params};
use serde_json::{Value, json};

fn setup() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::init_schema(&conn).unwrap();
    conn
}

/// Parse `args` and hand back the innermost subcommand matches.
fn leaf(args: &[&str]) -> clap::ArgMatches {
    let mut m = cli::build_cli().get_matches_from(std::iter::once("daftar").chain(args.iter().copied()));
    while let Some((_, sub)) = m.subcommand() {
        let sub = sub.clone();
        m = sub;
    }
    m
}

fn seed_parties(conn: &Connection) {
    parties::add(
        conn,
        PartyKind::Customer,
        &leaf(&["customer", "add", "--name", "Ahmad", "--phone", "0700", "--address", "Kabul"]),
    )
    .unwrap();
    parties::add(
        conn,
        PartyKind::Supplier,
        &leaf(&["supplier", "add", "--name", "Karimi", "--phone", "0799", "--address", "Herat"]),
    )
    .unwrap();
    products::add(
        conn,
        &leaf(&["product", "add", "--name", "Rice", "--price", "25", "--stock", "10", "--supplier", "1"]),
    )
    .unwrap();
    accounts::add(conn, &leaf(&["account", "add", "--name", "Cash", "--initial", "100"])).unwrap();
}

fn stock(conn: &Connection, id: i64) -> f64 {
    conn.query_row(
        "SELECT stock_quantity FROM products WHERE id=?1",
        params![id],
        |r| r.get(0),
    )
    .unwrap()
}

fn balance(conn: &Connection, id: i64) -> f64 {
    conn.query_row(
        "SELECT current_balance FROM accounts WHERE id=?1",
        params![id],
        |r| r.get(0),
    )
    .unwrap()
}

#[test]
fn sale_totals_come_from_items() {
    let mut conn = setup();
    seed_parties(&conn);
    let m = leaf(&[
        "sale", "add", "--customer", "1", "--date", "2025-03-01", "--item", "1:3:25", "--item",
        "1:1:10", "--paid", "50", "--account", "1",
    ]);
    let id = orders::add(&mut conn, OrderKind::Sale, &m).unwrap();

    let sales = orders::list_sales(&conn, None, None).unwrap();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0].id, id);
    assert_eq!(sales[0].total_amount, 85.0);
    assert_eq!(sales[0].paid_amount, 50.0);

    let items: i64 = conn
        .query_row("SELECT COUNT(*) FROM sale_items WHERE sale_id=?1", params![id], |r| r.get(0))
        .unwrap();
    assert_eq!(items, 2);
    assert_eq!(stock(&conn, 1), 6.0);
    assert_eq!(balance(&conn, 1), 150.0);
    assert!(doctor::check(&conn).unwrap().is_empty());
}

#[test]
fn invalid_sale_writes_nothing() {
    let mut conn = setup();
    seed_parties(&conn);

    let over = leaf(&[
        "sale", "add", "--customer", "1", "--date", "2025-03-01", "--item", "1:1:10", "--paid", "20",
    ]);
    let err = orders::add(&mut conn, OrderKind::Sale, &over).unwrap_err();
    assert!(err.to_string().contains("exceeds"));

    let missing = leaf(&["sale", "add", "--customer", "1", "--date", "2025-03-01", "--item", "9:1:10"]);
    let err = orders::add(&mut conn, OrderKind::Sale, &missing).unwrap_err();
    assert!(err.to_string().contains("product #9 not found"));

    let bad = leaf(&["sale", "add", "--customer", "1", "--date", "2025-03-01", "--item", "1:0:10"]);
    assert!(orders::add(&mut conn, OrderKind::Sale, &bad).is_err());

    assert!(orders::list_sales(&conn, None, None).unwrap().is_empty());
    assert_eq!(stock(&conn, 1), 10.0);
}

#[test]
fn purchase_adds_stock_and_removal_restores_it() {
    let mut conn = setup();
    seed_parties(&conn);
    let m = leaf(&[
        "purchase", "add", "--supplier", "1", "--date", "2025-02-10", "--item", "1:5:20",
        "--additional-cost", "7", "--paid", "60", "--account", "1",
    ]);
    let id = orders::add(&mut conn, OrderKind::Purchase, &m).unwrap();
    assert_eq!(stock(&conn, 1), 15.0);
    assert_eq!(balance(&conn, 1), 40.0);
    let paid: f64 = conn
        .query_row(
            "SELECT SUM(total) FROM purchase_payments WHERE purchase_id=?1",
            params![id],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(paid, 60.0);

    let purchases = orders::list_purchases(&conn, Some("2025-02-01"), Some("2025-02-28")).unwrap();
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0].total_amount, 100.0);
    assert!(orders::list_purchases(&conn, Some("2025-03-01"), None).unwrap().is_empty());

    orders::handle(&mut conn, OrderKind::Purchase, &sub_of(&["purchase", "rm", "--id", "1"])).unwrap();
    assert_eq!(stock(&conn, 1), 10.0);
    assert!(orders::list_purchases(&conn, None, None).unwrap().is_empty());
}

/// Matches one level below the root, as `main` passes them to handlers.
fn sub_of(args: &[&str]) -> clap::ArgMatches {
    let m = cli::build_cli().get_matches_from(std::iter::once("daftar").chain(args.iter().copied()));
    m.subcommand().unwrap().1.clone()
}

#[test]
fn expense_types_are_created_once() {
    let conn = setup();
    for (amount, date) in [("100", "2025-01-05"), ("40", "2025-01-20")] {
        expenses::add(
            &conn,
            &leaf(&["expense", "add", "--type", "Rent", "--amount", amount, "--date", date]),
        )
        .unwrap();
    }
    expenses::add(
        &conn,
        &leaf(&[
            "expense", "add", "--type", "Fuel", "--amount", "10", "--currency", "usd", "--rate",
            "70", "--date", "2025-02-01",
        ]),
    )
    .unwrap();
    let types: i64 = conn
        .query_row("SELECT COUNT(*) FROM expense_types", [], |r| r.get(0))
        .unwrap();
    assert_eq!(types, 2);

    let jan = expenses::list(&conn, Some("2025-01-01"), Some("2025-01-31")).unwrap();
    assert_eq!(jan.len(), 2);
    let all = expenses::list(&conn, None, None).unwrap();
    assert_eq!(all[0].expense_type, "Fuel");
    assert_eq!(all[0].currency, "USD");
    assert_eq!(all[0].total, 700.0);
}

#[test]
fn blank_required_fields_are_rejected() {
    let conn = setup();
    let m = leaf(&["customer", "add", "--name", "  ", "--phone", "0700", "--address", "Kabul"]);
    let err = parties::add(&conn, PartyKind::Customer, &m).unwrap_err();
    assert_eq!(err.to_string(), "Name is required");
    assert!(parties::list(&conn, PartyKind::Customer).unwrap().is_empty());

    let err = parties::handle(&conn, PartyKind::Supplier, &sub_of(&["supplier", "rm", "--id", "4"]))
        .unwrap_err();
    assert!(err.to_string().contains("supplier #4 not found"));
}

#[test]
fn account_movements_and_doctor() {
    let conn = setup();
    seed_parties(&conn);
    accounts::handle(
        &conn,
        &sub_of(&["account", "withdraw", "--id", "1", "--amount", "30", "--date", "2025-01-02"]),
    )
    .unwrap();
    accounts::handle(
        &conn,
        &sub_of(&[
            "account", "deposit", "--id", "1", "--amount", "2", "--rate", "70", "--currency", "usd",
            "--date", "2025-01-03",
        ]),
    )
    .unwrap();
    let list = accounts::list(&conn).unwrap();
    assert_eq!(list[0].current_balance, 210.0);
    assert!(doctor::check(&conn).unwrap().is_empty());

    conn.execute("UPDATE accounts SET current_balance = 999 WHERE id=1", []).unwrap();
    conn.execute(
        "INSERT INTO sales(customer_id, date, total_amount, paid_amount) VALUES (1,'2025-01-04',50,0)",
        [],
    )
    .unwrap();
    let issues = doctor::check(&conn).unwrap();
    let kinds: Vec<&str> = issues.iter().map(|i| i.kind).collect();
    assert_eq!(kinds, vec!["sale_total_mismatch", "account_balance_mismatch"]);
}

#[test]
fn company_settings_stay_single_row() {
    let conn = setup();
    company::handle(&conn, &sub_of(&["company", "set", "--name", "Daftar Co"])).unwrap();
    company::handle(
        &conn,
        &sub_of(&["company", "set", "--name", "Daftar Trading", "--phone", "0700"]),
    )
    .unwrap();
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM company_settings", [], |r| r.get(0))
        .unwrap();
    assert_eq!(rows, 1);
    let c = company::load(&conn).unwrap().unwrap();
    assert_eq!(c.name, "Daftar Trading");
    assert_eq!(c.phone.as_deref(), Some("0700"));
}

#[test]
fn ensure_table_is_idempotent() {
    let conn = setup();
    let snapshot = |conn: &Connection| -> Vec<(String, String)> {
        let mut stmt = conn
            .prepare("SELECT name, IFNULL(sql,'') FROM sqlite_master ORDER BY name")
            .unwrap();
        stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap()
    };
    let before = snapshot(&conn);
    for t in db::Table::ALL {
        db::ensure_table(&conn, *t).unwrap();
    }
    db::init_schema(&conn).unwrap();
    assert_eq!(before, snapshot(&conn));
    assert!(before.iter().any(|(n, _)| n == "sale_items"));
}

#[test]
fn schema_description_lists_columns() {
    let conn = setup();
    let schema = db::describe_schema(&conn).unwrap();
    assert!(schema.contains("sales(id INTEGER, customer_id INTEGER, date TEXT"));
    assert!(schema.contains("expense_types("));
    assert!(!schema.contains("settings(key"));
}

fn table_rows(r: &Report, title: &str) -> Vec<Vec<Value>> {
    r.sections
        .iter()
        .find(|s| s.title == title)
        .and_then(|s| s.table.clone())
        .map(|t| t.rows)
        .unwrap_or_else(|| panic!("no table '{}'", title))
}

#[test]
fn fully_paid_sale_with_additional_cost_owes_nothing() {
    let mut conn = setup();
    seed_parties(&conn);
    let m = leaf(&[
        "sale", "add", "--customer", "1", "--date", "2025-03-01", "--item", "1:1:100",
        "--additional-cost", "20", "--paid", "120", "--account", "1",
    ]);
    orders::add(&mut conn, OrderKind::Sale, &m).unwrap();
    let march = DateRange::parse("2025-03-01", "2025-03-31").unwrap();

    let r = builders::build(&conn, ReportKind::Sales, &march).unwrap();
    let summary = table_rows(&r, "Summary");
    let outstanding = summary.iter().find(|row| row[0] == json!("Outstanding")).unwrap();
    assert_eq!(outstanding[1], json!("0.00"));
    assert_eq!(table_rows(&r, "Sales")[0][5], json!(0.0));

    let r = builders::build(&conn, ReportKind::Customers, &march).unwrap();
    let customers = table_rows(&r, "Customers");
    assert_eq!(customers[0][3], json!(120.0));
    assert_eq!(customers[0][5], json!(0.0));
    assert!(doctor::check(&conn).unwrap().is_empty());
}

#[test]
fn editing_a_sale_rebuilds_items_and_stock() {
    let mut conn = setup();
    seed_parties(&conn);
    let m = leaf(&[
        "sale", "add", "--customer", "1", "--date", "2025-03-01", "--item", "1:3:25", "--paid",
        "50", "--account", "1",
    ]);
    let id = orders::add(&mut conn, OrderKind::Sale, &m).unwrap();
    assert_eq!(stock(&conn, 1), 7.0);

    orders::handle(
        &mut conn,
        OrderKind::Sale,
        &sub_of(&[
            "sale", "edit", "--id", "1", "--item", "1:2:30", "--date", "2025-03-05", "--notes",
            "corrected",
        ]),
    )
    .unwrap();
    let sale = &orders::list_sales(&conn, None, None).unwrap()[0];
    assert_eq!(sale.total_amount, 60.0);
    assert_eq!(sale.date, "2025-03-05");
    assert_eq!(sale.notes.as_deref(), Some("corrected"));
    assert_eq!(stock(&conn, 1), 8.0);
    let items: i64 = conn
        .query_row("SELECT COUNT(*) FROM sale_items WHERE sale_id=?1", params![id], |r| r.get(0))
        .unwrap();
    assert_eq!(items, 1);
    assert_eq!(balance(&conn, 1), 150.0);
    assert!(doctor::check(&conn).unwrap().is_empty());

    // new lines must still cover what was paid
    let shrink = leaf(&["sale", "edit", "--id", "1", "--item", "1:1:10"]);
    let err = orders::edit(&mut conn, OrderKind::Sale, &shrink).unwrap_err();
    assert!(err.to_string().contains("exceeds"));
    assert_eq!(stock(&conn, 1), 8.0);
    assert_eq!(orders::list_sales(&conn, None, None).unwrap()[0].total_amount, 60.0);

    let missing = leaf(&["sale", "edit", "--id", "9", "--notes", "x"]);
    let err = orders::edit(&mut conn, OrderKind::Sale, &missing).unwrap_err();
    assert!(err.to_string().contains("sale #9 not found"));
}

#[test]
fn editing_a_purchase_moves_stock_by_the_difference() {
    let mut conn = setup();
    seed_parties(&conn);
    let m = leaf(&[
        "purchase", "add", "--supplier", "1", "--date", "2025-02-10", "--item", "1:5:20",
        "--additional-cost", "7", "--paid", "60", "--account", "1",
    ]);
    orders::add(&mut conn, OrderKind::Purchase, &m).unwrap();
    assert_eq!(stock(&conn, 1), 15.0);

    let under = leaf(&["purchase", "edit", "--id", "1", "--item", "1:2:20", "--additional-cost", "0"]);
    assert!(orders::edit(&mut conn, OrderKind::Purchase, &under).is_err());
    assert_eq!(stock(&conn, 1), 15.0);

    let m = leaf(&["purchase", "edit", "--id", "1", "--item", "1:4:20"]);
    orders::edit(&mut conn, OrderKind::Purchase, &m).unwrap();
    let p = &orders::list_purchases(&conn, None, None).unwrap()[0];
    assert_eq!(p.total_amount, 80.0);
    assert_eq!(p.additional_cost, 7.0);
    assert_eq!(stock(&conn, 1), 14.0);
    assert!(doctor::check(&conn).unwrap().is_empty());
}

#[test]
fn named_sale_costs_are_stored_and_summed() {
    let mut conn = setup();
    seed_parties(&conn);
    let m = leaf(&[
        "sale", "add", "--customer", "1", "--date", "2025-03-01", "--item", "1:1:100", "--cost",
        "Transport:15", "--cost", "Packing:5", "--additional-cost", "2",
    ]);
    let id = orders::add(&mut conn, OrderKind::Sale, &m).unwrap();
    assert_eq!(orders::list_sales(&conn, None, None).unwrap()[0].additional_cost, 22.0);
    let costs = |conn: &Connection| -> Vec<(String, f64)> {
        let mut stmt = conn
            .prepare("SELECT name, amount FROM sale_additional_costs WHERE sale_id=?1 ORDER BY id")
            .unwrap();
        stmt.query_map(params![id], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<rusqlite::Result<Vec<_>>>()
            .unwrap()
    };
    assert_eq!(
        costs(&conn),
        vec![("Transport".to_string(), 15.0), ("Packing".to_string(), 5.0)]
    );

    let m = leaf(&["sale", "edit", "--id", "1", "--cost", "Transport:10"]);
    orders::edit(&mut conn, OrderKind::Sale, &m).unwrap();
    assert_eq!(costs(&conn), vec![("Transport".to_string(), 10.0)]);
    assert_eq!(orders::list_sales(&conn, None, None).unwrap()[0].additional_cost, 10.0);

    assert_eq!(
        orders::parse_cost("Delivery: 4.5").unwrap(),
        ("Delivery".to_string(), 4.5)
    );
    assert!(orders::parse_cost("Delivery").is_err());
    assert!(orders::parse_cost("Fuel:-1").is_err());
    assert!(orders::parse_cost(" :3").is_err());
}

#[test]
fn parties_products_and_accounts_can_be_edited() {
    let conn = setup();
    seed_parties(&conn);
    parties::handle(
        &conn,
        PartyKind::Customer,
        &sub_of(&["customer", "edit", "--id", "1", "--phone", "0711", "--email", "a@b.af"]),
    )
    .unwrap();
    let c = &parties::list(&conn, PartyKind::Customer).unwrap()[0];
    assert_eq!((c.full_name.as_str(), c.phone.as_str()), ("Ahmad", "0711"));
    assert_eq!(c.email.as_deref(), Some("a@b.af"));

    let blank = leaf(&["customer", "edit", "--id", "1", "--name", " "]);
    let err = parties::edit(&conn, PartyKind::Customer, &blank).unwrap_err();
    assert_eq!(err.to_string(), "Name is required");
    let missing = leaf(&["supplier", "edit", "--id", "5", "--name", "X"]);
    let err = parties::edit(&conn, PartyKind::Supplier, &missing).unwrap_err();
    assert!(err.to_string().contains("supplier #5 not found"));

    products::edit(&conn, &leaf(&["product", "edit", "--id", "1", "--price", "30", "--stock", "12"]))
        .unwrap();
    let p = &products::list(&conn).unwrap()[0];
    assert_eq!((p.name.as_str(), p.price, p.stock_quantity), ("Rice", Some(30.0), Some(12.0)));
    assert!(products::edit(&conn, &leaf(&["product", "edit", "--id", "1", "--supplier", "8"])).is_err());

    accounts::handle(
        &conn,
        &sub_of(&["account", "edit", "--id", "1", "--name", "Till", "--active", "false"]),
    )
    .unwrap();
    let a = &accounts::list(&conn).unwrap()[0];
    assert_eq!(a.name, "Till");
    assert!(!a.is_active);
    assert_eq!(a.current_balance, 100.0);
}

#[test]
fn salaries_are_unique_per_employee_and_month() {
    let conn = setup();
    payroll::handle_employee(
        &conn,
        &sub_of(&[
            "employee", "add", "--name", "Farid", "--phone", "0790", "--address", "Kabul",
            "--position", "Clerk", "--base-salary", "9000", "--hire-date", "2024-06-01",
        ]),
    )
    .unwrap();
    let employees = payroll::list_employees(&conn).unwrap();
    assert_eq!(employees.len(), 1);
    assert_eq!(employees[0].hire_date.as_deref(), Some("2024-06-01"));

    let salary = |month: &str| {
        leaf(&[
            "salary", "add", "--employee", "1", "--year", "1403", "--month", month, "--amount",
            "9000", "--deductions", "500",
        ])
    };
    payroll::add_salary(&conn, &salary("Hamal")).unwrap();
    let err = payroll::add_salary(&conn, &salary("Hamal")).unwrap_err();
    assert!(err.to_string().contains("already has salary #1"));
    payroll::add_salary(&conn, &salary("Sawr")).unwrap();

    let over = leaf(&[
        "salary", "add", "--employee", "1", "--year", "1403", "--month", "Jawza", "--amount",
        "100", "--deductions", "200",
    ]);
    assert!(payroll::add_salary(&conn, &over).is_err());
    let stranger = leaf(&[
        "salary", "add", "--employee", "9", "--year", "1403", "--month", "Jawza", "--amount", "100",
    ]);
    let err = payroll::add_salary(&conn, &stranger).unwrap_err();
    assert!(err.to_string().contains("employee #9 not found"));

    let list = payroll::list_salaries(&conn, Some(1), Some(1403)).unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].employee, "Farid");
    assert_eq!(list[0].month, "Sawr");
    assert!(payroll::list_salaries(&conn, None, Some(1402)).unwrap().is_empty());

    payroll::add_deduction(
        &conn,
        &leaf(&[
            "deduction", "add", "--employee", "1", "--year", "1403", "--month", "Sawr", "--amount",
            "10", "--currency", "usd", "--rate", "70",
        ]),
    )
    .unwrap();
    let d = &payroll::list_deductions(&conn, Some(1)).unwrap()[0];
    assert_eq!((d.currency.as_str(), d.amount * d.rate), ("USD", 700.0));

    payroll::handle_employee(&conn, &sub_of(&["employee", "rm", "--id", "1"])).unwrap();
    assert!(payroll::list_salaries(&conn, None, None).unwrap().is_empty());
}

#[test]
fn one_base_unit_and_currency() {
    let conn = setup();
    for args in [
        vec!["currency", "add", "--name", "AFN", "--base"],
        vec!["currency", "add", "--name", "USD", "--rate", "70"],
        vec!["currency", "add", "--name", "EUR", "--rate", "75", "--base"],
    ] {
        catalog::handle(&conn, CatalogKind::Currency, &sub_of(&args)).unwrap();
    }
    let names: Vec<(String, bool)> = catalog::list(&conn, CatalogKind::Currency)
        .unwrap()
        .into_iter()
        .map(|c| (c.name, c.is_base))
        .collect();
    assert_eq!(
        names,
        vec![("EUR".to_string(), true), ("AFN".to_string(), false), ("USD".to_string(), false)]
    );
    let dup = leaf(&["currency", "add", "--name", "USD"]);
    let err = catalog::add(&conn, CatalogKind::Currency, &dup).unwrap_err();
    assert!(err.to_string().contains("already exists"));

    catalog::add(&conn, CatalogKind::Unit, &leaf(&["unit", "add", "--name", "kg", "--base"])).unwrap();
    catalog::add(&conn, CatalogKind::Unit, &leaf(&["unit", "add", "--name", "g", "--ratio", "0.001"]))
        .unwrap();
    let units = catalog::list(&conn, CatalogKind::Unit).unwrap();
    assert_eq!(units[0].name, "kg");
    assert_eq!(units[1].factor, 0.001);
    let zero = leaf(&["unit", "add", "--name", "t", "--ratio", "0"]);
    assert!(catalog::add(&conn, CatalogKind::Unit, &zero).is_err());
}

#[test]
fn failed_table_setup_does_not_stop_the_command() {
    let conn = Connection::open_in_memory().unwrap();
    // an older expenses table without a date column breaks the index
    conn.execute_batch("CREATE TABLE expenses(id INTEGER PRIMARY KEY, amount REAL);")
        .unwrap();
    assert!(db::ensure_table(&conn, db::Table::Expenses).is_err());

    db::prepare_tables(&conn, &[db::Table::Expenses, db::Table::Customers]);
    parties::handle(
        &conn,
        PartyKind::Customer,
        &sub_of(&["customer", "add", "--name", "Ahmad", "--phone", "0700", "--address", "Kabul"]),
    )
    .unwrap();
    assert_eq!(parties::list(&conn, PartyKind::Customer).unwrap().len(), 1);

    expenses::handle(&conn, &sub_of(&["expense", "type", "add", "--name", "Rent"])).unwrap();
    let types: i64 = conn
        .query_row("SELECT COUNT(*) FROM expense_types", [], |r| r.get(0))
        .unwrap();
    assert_eq!(types, 1);
}
