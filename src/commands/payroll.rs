// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Employees, their monthly salaries and salary deductions.

use crate::db::{Table, prepare_tables};
use crate::models::{Deduction, Employee, Salary};
use crate::utils::{
    maybe_print_json, parse_date, parse_non_negative, parse_positive, pretty_table, require_row,
    require_text,
};
use anyhow::{Result, bail};
use rusqlite::{Connection, OptionalExtension, params};

const TABLES: &[Table] = &[Table::Employees, Table::Salaries, Table::Deductions];

pub fn handle_employee(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    prepare_tables(conn, TABLES);
    match m.subcommand() {
        Some(("add", sub)) => {
            let id = add_employee(conn, sub)?;
            println!("Added employee #{}", id);
        }
        Some(("list", sub)) => {
            let data = list_employees(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|e| {
                        vec![
                            e.id.to_string(),
                            e.full_name,
                            e.phone,
                            e.position.unwrap_or_default(),
                            e.base_salary.map(|v| format!("{:.2}", v)).unwrap_or_default(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "Name", "Phone", "Position", "Base salary"], rows)
                );
            }
        }
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let n = conn.execute("DELETE FROM employees WHERE id=?1", params![id])?;
            if n == 0 {
                bail!("employee #{} not found", id);
            }
            println!("Removed employee #{}", id);
        }
        _ => {}
    }
    Ok(())
}

pub fn handle_salary(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    prepare_tables(conn, TABLES);
    match m.subcommand() {
        Some(("add", sub)) => {
            let id = add_salary(conn, sub)?;
            println!("Recorded salary #{}", id);
        }
        Some(("list", sub)) => {
            let employee = sub.get_one::<i64>("employee").copied();
            let year = sub.get_one::<i64>("year").copied();
            let data = list_salaries(conn, employee, year)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|s| {
                        vec![
                            s.id.to_string(),
                            s.employee,
                            s.year.to_string(),
                            s.month,
                            format!("{:.2}", s.amount),
                            format!("{:.2}", s.deductions),
                            format!("{:.2}", s.amount - s.deductions),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(
                        &["ID", "Employee", "Year", "Month", "Amount", "Deductions", "Net"],
                        rows
                    )
                );
            }
        }
        _ => {}
    }
    Ok(())
}

pub fn handle_deduction(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    prepare_tables(conn, TABLES);
    match m.subcommand() {
        Some(("add", sub)) => {
            let id = add_deduction(conn, sub)?;
            println!("Recorded deduction #{}", id);
        }
        Some(("list", sub)) => {
            let data = list_deductions(conn, sub.get_one::<i64>("employee").copied())?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|d| {
                        vec![
                            d.id.to_string(),
                            d.employee_id.to_string(),
                            d.year.to_string(),
                            d.month,
                            format!("{:.2} {}", d.amount, d.currency),
                            format!("{:.2}", d.amount * d.rate),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "Employee", "Year", "Month", "Amount", "Total"], rows)
                );
            }
        }
        _ => {}
    }
    Ok(())
}

fn parse_year(sub: &clap::ArgMatches) -> Result<i64> {
    let year = *sub.get_one::<i64>("year").unwrap();
    if year <= 0 {
        bail!("year must be greater than zero, got {}", year);
    }
    Ok(year)
}

pub fn add_employee(conn: &Connection, sub: &clap::ArgMatches) -> Result<i64> {
    let name = require_text(sub.get_one::<String>("name").unwrap(), "Name")?;
    let phone = require_text(sub.get_one::<String>("phone").unwrap(), "Phone")?;
    let address = require_text(sub.get_one::<String>("address").unwrap(), "Address")?;
    let hire_date = sub
        .get_one::<String>("hire-date")
        .map(|s| parse_date(s).map(|d| d.to_string()))
        .transpose()?;
    let base_salary = sub
        .get_one::<String>("base-salary")
        .map(|s| parse_non_negative(s, "base salary"))
        .transpose()?;
    conn.execute(
        "INSERT INTO employees(full_name, phone, email, address, position, hire_date, base_salary, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            name,
            phone,
            sub.get_one::<String>("email"),
            address,
            sub.get_one::<String>("position"),
            hire_date,
            base_salary,
            sub.get_one::<String>("notes"),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_employees(conn: &Connection) -> Result<Vec<Employee>> {
    let mut stmt = conn.prepare(
        "SELECT id, full_name, phone, address, email, position, hire_date, base_salary, notes
         FROM employees ORDER BY full_name",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(Employee {
            id: r.get(0)?,
            full_name: r.get(1)?,
            phone: r.get(2)?,
            address: r.get(3)?,
            email: r.get(4)?,
            position: r.get(5)?,
            hire_date: r.get(6)?,
            base_salary: r.get(7)?,
            notes: r.get(8)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// One salary per employee and month; a second entry for the same month is
/// rejected before the unique index would fire.
pub fn add_salary(conn: &Connection, sub: &clap::ArgMatches) -> Result<i64> {
    let employee = *sub.get_one::<i64>("employee").unwrap();
    let year = parse_year(sub)?;
    let month = require_text(sub.get_one::<String>("month").unwrap(), "Month")?;
    let amount = parse_positive(sub.get_one::<String>("amount").unwrap(), "amount")?;
    let deductions =
        parse_non_negative(sub.get_one::<String>("deductions").unwrap(), "deductions")?;
    if deductions > amount {
        bail!(
            "Deductions {:.2} exceed the salary amount {:.2}",
            deductions,
            amount
        );
    }
    require_row(conn, "employees", employee, "employee")?;
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM salaries WHERE employee_id=?1 AND year=?2 AND month=?3",
            params![employee, year, month],
            |r| r.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        bail!(
            "employee #{} already has salary #{} for {} {}",
            employee,
            id,
            month,
            year
        );
    }
    conn.execute(
        "INSERT INTO salaries(employee_id, year, month, amount, deductions, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            employee,
            year,
            month,
            amount,
            deductions,
            sub.get_one::<String>("notes")
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_salaries(
    conn: &Connection,
    employee: Option<i64>,
    year: Option<i64>,
) -> Result<Vec<Salary>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.employee_id, IFNULL(e.full_name,'(deleted)'), s.year, s.month,
                s.amount, s.deductions, s.notes
         FROM salaries s LEFT JOIN employees e ON e.id=s.employee_id
         WHERE (?1 IS NULL OR s.employee_id=?1) AND (?2 IS NULL OR s.year=?2)
         ORDER BY s.year DESC, s.id DESC",
    )?;
    let rows = stmt.query_map(params![employee, year], |r| {
        Ok(Salary {
            id: r.get(0)?,
            employee_id: r.get(1)?,
            employee: r.get(2)?,
            year: r.get(3)?,
            month: r.get(4)?,
            amount: r.get(5)?,
            deductions: r.get(6)?,
            notes: r.get(7)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn add_deduction(conn: &Connection, sub: &clap::ArgMatches) -> Result<i64> {
    let employee = *sub.get_one::<i64>("employee").unwrap();
    let year = parse_year(sub)?;
    let month = require_text(sub.get_one::<String>("month").unwrap(), "Month")?;
    let amount = parse_positive(sub.get_one::<String>("amount").unwrap(), "amount")?;
    let currency = sub.get_one::<String>("currency").unwrap().trim().to_uppercase();
    let rate = parse_positive(sub.get_one::<String>("rate").unwrap(), "rate")?;
    require_row(conn, "employees", employee, "employee")?;
    conn.execute(
        "INSERT INTO deductions(employee_id, year, month, currency, rate, amount)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![employee, year, month, currency, rate, amount],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_deductions(conn: &Connection, employee: Option<i64>) -> Result<Vec<Deduction>> {
    let mut stmt = conn.prepare(
        "SELECT id, employee_id, year, month, currency, rate, amount FROM deductions
         WHERE (?1 IS NULL OR employee_id=?1)
         ORDER BY year DESC, id DESC",
    )?;
    let rows = stmt.query_map(params![employee], |r| {
        Ok(Deduction {
            id: r.get(0)?,
            employee_id: r.get(1)?,
            year: r.get(2)?,
            month: r.get(3)?,
            currency: r.get(4)?,
            rate: r.get(5)?,
            amount: r.get(6)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
