// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::QueryResult;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use log::{debug, warn};
use once_cell::sync::Lazy;
use rusqlite::Connection;
use rusqlite::types::{Value, ValueRef};
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("com.alphavelocity", "Daftar", "daftar"));

pub fn db_path() -> Result<PathBuf> {
    if let Ok(p) = std::env::var("DAFTAR_DB") {
        if !p.trim().is_empty() {
            return Ok(PathBuf::from(p));
        }
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("daftar.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    for t in Table::ALL {
        ensure_table(conn, *t)?;
    }
    Ok(())
}

/// One backend table per entity. Child tables (items, payments) are created
/// together with their parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Settings,
    CompanySettings,
    Currencies,
    Units,
    Customers,
    Suppliers,
    Products,
    Accounts,
    Purchases,
    Sales,
    Expenses,
    Employees,
    Salaries,
    Deductions,
}

impl Table {
    pub const ALL: &'static [Table] = &[
        Table::Settings,
        Table::CompanySettings,
        Table::Currencies,
        Table::Units,
        Table::Customers,
        Table::Suppliers,
        Table::Products,
        Table::Accounts,
        Table::Purchases,
        Table::Sales,
        Table::Expenses,
        Table::Employees,
        Table::Salaries,
        Table::Deductions,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::Settings => "settings",
            Table::CompanySettings => "company_settings",
            Table::Currencies => "currencies",
            Table::Units => "units",
            Table::Customers => "customers",
            Table::Suppliers => "suppliers",
            Table::Products => "products",
            Table::Accounts => "accounts",
            Table::Purchases => "purchases",
            Table::Sales => "sales",
            Table::Expenses => "expenses",
            Table::Employees => "employees",
            Table::Salaries => "salaries",
            Table::Deductions => "deductions",
        }
    }

    fn ddl(self) -> &'static str {
        match self {
            Table::Settings => {
                r#"
    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );"#
            }
            Table::CompanySettings => {
                r#"
    CREATE TABLE IF NOT EXISTS company_settings(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        phone TEXT,
        address TEXT,
        email TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );"#
            }
            Table::Currencies => {
                r#"
    CREATE TABLE IF NOT EXISTS currencies(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        base INTEGER NOT NULL DEFAULT 0,
        rate REAL NOT NULL DEFAULT 1.0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );"#
            }
            Table::Units => {
                r#"
    CREATE TABLE IF NOT EXISTS units(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        ratio REAL NOT NULL DEFAULT 1.0,
        is_base INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );"#
            }
            Table::Customers => {
                r#"
    CREATE TABLE IF NOT EXISTS customers(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        full_name TEXT NOT NULL,
        phone TEXT NOT NULL,
        address TEXT NOT NULL,
        email TEXT,
        notes TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );"#
            }
            Table::Suppliers => {
                r#"
    CREATE TABLE IF NOT EXISTS suppliers(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        full_name TEXT NOT NULL,
        phone TEXT NOT NULL,
        address TEXT NOT NULL,
        email TEXT,
        notes TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );"#
            }
            Table::Products => {
                r#"
    CREATE TABLE IF NOT EXISTS products(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT,
        price REAL,
        currency_id INTEGER,
        supplier_id INTEGER,
        stock_quantity REAL,
        unit TEXT,
        bar_code TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(currency_id) REFERENCES currencies(id),
        FOREIGN KEY(supplier_id) REFERENCES suppliers(id)
    );"#
            }
            Table::Accounts => {
                r#"
    CREATE TABLE IF NOT EXISTS accounts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        currency_id INTEGER,
        account_code TEXT UNIQUE,
        account_type TEXT,
        initial_balance REAL NOT NULL DEFAULT 0,
        current_balance REAL NOT NULL DEFAULT 0,
        is_active INTEGER NOT NULL DEFAULT 1,
        notes TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(currency_id) REFERENCES currencies(id)
    );

    -- transaction_type is 'deposit' or 'withdraw'; total = amount * rate
    CREATE TABLE IF NOT EXISTS account_transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        account_id INTEGER NOT NULL,
        transaction_type TEXT NOT NULL CHECK(transaction_type IN ('deposit','withdraw')),
        amount REAL NOT NULL,
        currency TEXT NOT NULL,
        rate REAL NOT NULL DEFAULT 1.0,
        total REAL NOT NULL,
        transaction_date TEXT NOT NULL,
        notes TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(account_id) REFERENCES accounts(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_account_transactions_date ON account_transactions(transaction_date);"#
            }
            Table::Purchases => {
                r#"
    CREATE TABLE IF NOT EXISTS purchases(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        supplier_id INTEGER NOT NULL,
        date TEXT NOT NULL,
        notes TEXT,
        currency_id INTEGER,
        total_amount REAL NOT NULL DEFAULT 0,
        additional_cost REAL NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(supplier_id) REFERENCES suppliers(id),
        FOREIGN KEY(currency_id) REFERENCES currencies(id)
    );
    CREATE INDEX IF NOT EXISTS idx_purchases_date ON purchases(date);

    CREATE TABLE IF NOT EXISTS purchase_items(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        purchase_id INTEGER NOT NULL,
        product_id INTEGER NOT NULL,
        unit_id INTEGER,
        per_price REAL NOT NULL,
        amount REAL NOT NULL,
        total REAL NOT NULL,
        expiry_date TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(purchase_id) REFERENCES purchases(id) ON DELETE CASCADE,
        FOREIGN KEY(product_id) REFERENCES products(id),
        FOREIGN KEY(unit_id) REFERENCES units(id)
    );

    CREATE TABLE IF NOT EXISTS purchase_payments(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        purchase_id INTEGER NOT NULL,
        account_id INTEGER,
        amount REAL NOT NULL,
        currency TEXT NOT NULL,
        rate REAL NOT NULL DEFAULT 1.0,
        total REAL NOT NULL,
        date TEXT NOT NULL,
        notes TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(purchase_id) REFERENCES purchases(id) ON DELETE CASCADE,
        FOREIGN KEY(account_id) REFERENCES accounts(id) ON DELETE SET NULL
    );"#
            }
            Table::Sales => {
                r#"
    CREATE TABLE IF NOT EXISTS sales(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        customer_id INTEGER NOT NULL,
        date TEXT NOT NULL,
        notes TEXT,
        currency_id INTEGER,
        exchange_rate REAL NOT NULL DEFAULT 1,
        total_amount REAL NOT NULL DEFAULT 0,
        base_amount REAL NOT NULL DEFAULT 0,
        paid_amount REAL NOT NULL DEFAULT 0,
        additional_cost REAL NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(customer_id) REFERENCES customers(id),
        FOREIGN KEY(currency_id) REFERENCES currencies(id)
    );
    CREATE INDEX IF NOT EXISTS idx_sales_date ON sales(date);

    CREATE TABLE IF NOT EXISTS sale_items(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sale_id INTEGER NOT NULL,
        product_id INTEGER NOT NULL,
        unit_id INTEGER,
        per_price REAL NOT NULL,
        amount REAL NOT NULL,
        total REAL NOT NULL,
        sale_type TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(sale_id) REFERENCES sales(id) ON DELETE CASCADE,
        FOREIGN KEY(product_id) REFERENCES products(id),
        FOREIGN KEY(unit_id) REFERENCES units(id)
    );

    CREATE TABLE IF NOT EXISTS sale_payments(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sale_id INTEGER NOT NULL,
        account_id INTEGER,
        currency_id INTEGER,
        exchange_rate REAL NOT NULL DEFAULT 1,
        amount REAL NOT NULL,
        base_amount REAL NOT NULL DEFAULT 0,
        date TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(sale_id) REFERENCES sales(id) ON DELETE CASCADE,
        FOREIGN KEY(account_id) REFERENCES accounts(id),
        FOREIGN KEY(currency_id) REFERENCES currencies(id)
    );

    CREATE TABLE IF NOT EXISTS sale_additional_costs(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sale_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        amount REAL NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(sale_id) REFERENCES sales(id) ON DELETE CASCADE
    );"#
            }
            Table::Expenses => {
                r#"
    CREATE TABLE IF NOT EXISTS expense_types(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS expenses(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        expense_type_id INTEGER NOT NULL,
        amount REAL NOT NULL,
        currency TEXT NOT NULL,
        rate REAL NOT NULL DEFAULT 1.0,
        total REAL NOT NULL,
        date TEXT NOT NULL,
        bill_no TEXT,
        description TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(expense_type_id) REFERENCES expense_types(id)
    );
    CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date);"#
            }
            Table::Employees => {
                r#"
    CREATE TABLE IF NOT EXISTS employees(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        full_name TEXT NOT NULL,
        phone TEXT NOT NULL,
        email TEXT,
        address TEXT NOT NULL,
        position TEXT,
        hire_date TEXT,
        base_salary REAL,
        notes TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );"#
            }
            Table::Salaries => {
                r#"
    CREATE TABLE IF NOT EXISTS salaries(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        employee_id INTEGER NOT NULL,
        year INTEGER NOT NULL,
        month TEXT NOT NULL,
        amount REAL NOT NULL,
        deductions REAL NOT NULL DEFAULT 0,
        notes TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(employee_id, year, month),
        FOREIGN KEY(employee_id) REFERENCES employees(id) ON DELETE CASCADE
    );"#
            }
            Table::Deductions => {
                r#"
    CREATE TABLE IF NOT EXISTS deductions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        employee_id INTEGER NOT NULL,
        year INTEGER NOT NULL,
        month TEXT NOT NULL,
        currency TEXT NOT NULL,
        rate REAL NOT NULL DEFAULT 1.0,
        amount REAL NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        updated_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(employee_id) REFERENCES employees(id) ON DELETE CASCADE
    );"#
            }
        }
    }
}

/// Create the table (and its child tables) if missing. Safe to call repeatedly.
pub fn ensure_table(conn: &Connection, table: Table) -> Result<()> {
    conn.execute_batch(table.ddl())
        .with_context(|| format!("Create table {}", table.name()))?;
    Ok(())
}

/// Screen-entry variant of [`ensure_table`]: failures are logged and the
/// caller carries on with whatever schema exists.
pub fn prepare_tables(conn: &Connection, tables: &[Table]) {
    for t in tables {
        if let Err(e) = ensure_table(conn, *t) {
            warn!("init {} table failed: {:#}", t.name(), e);
        }
    }
}

/// Textual `table(column TYPE, ...)` listing of every user table, one per line.
pub fn describe_schema(conn: &Connection) -> Result<String> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != 'settings'
         ORDER BY name",
    )?;
    let tables = stmt
        .query_map([], |r| r.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let mut out = String::new();
    for t in tables {
        let mut cols_stmt = conn.prepare(&format!("PRAGMA table_info(\"{}\")", t))?;
        let cols = cols_stmt
            .query_map([], |r| {
                Ok(format!(
                    "{} {}",
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        out.push_str(&format!("{}({})\n", t, cols.join(", ")));
    }
    Ok(out)
}

/// The read path used by the AI relay and by ad-hoc queries.
pub trait QueryExecutor {
    fn run_select(&self, sql: &str, params: &[serde_json::Value]) -> Result<QueryResult>;
}

impl<T: QueryExecutor + ?Sized> QueryExecutor for &T {
    fn run_select(&self, sql: &str, params: &[serde_json::Value]) -> Result<QueryResult> {
        (**self).run_select(sql, params)
    }
}

impl QueryExecutor for Connection {
    fn run_select(&self, sql: &str, params: &[serde_json::Value]) -> Result<QueryResult> {
        query_database(self, sql, params)
    }
}

fn json_to_sql(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else {
                Value::Real(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::Bool(b) => Value::Integer(i64::from(*b)),
        serde_json::Value::Null => Value::Null,
        other => Value::Text(other.to_string()),
    }
}

fn sql_to_json(v: ValueRef<'_>) -> serde_json::Value {
    match v {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(t) => serde_json::Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => serde_json::Value::String(format!("[BLOB:{} bytes]", b.len())),
    }
}

/// Run a parameterised statement that SQLite itself classifies as read-only.
pub fn query_database(
    conn: &Connection,
    sql: &str,
    params: &[serde_json::Value],
) -> Result<QueryResult> {
    let mut stmt = conn
        .prepare(sql)
        .with_context(|| format!("Prepare query '{}'", sql))?;
    if !stmt.readonly() {
        bail!("Refusing to run a statement that modifies the database");
    }
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let values: Vec<Value> = params.iter().map(json_to_sql).collect();
    let width = columns.len();
    let mut rows = Vec::new();
    let mut cur = stmt.query(rusqlite::params_from_iter(values.iter()))?;
    while let Some(r) = cur.next()? {
        let mut row = Vec::with_capacity(width);
        for i in 0..width {
            row.push(sql_to_json(r.get_ref(i)?));
        }
        rows.push(row);
    }
    debug!("query returned {} rows", rows.len());
    Ok(QueryResult { columns, rows })
}
