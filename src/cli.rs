// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};

fn json_args() -> [Arg; 2] {
    [
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print JSON"),
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    ]
}

fn id_arg() -> Arg {
    Arg::new("id")
        .long("id")
        .required(true)
        .value_parser(value_parser!(i64))
}

/// `--id` plus optional replacements for the named text fields.
fn edit_cmd(fields: &[&'static str]) -> Command {
    Command::new("edit")
        .about("Change fields of an existing record")
        .arg(id_arg())
        .args(fields.iter().map(|f| Arg::new(*f).long(*f)))
}

fn range_args(required: bool) -> [Arg; 2] {
    [
        Arg::new("from")
            .long("from")
            .required(required)
            .help("Start date YYYY-MM-DD"),
        Arg::new("to")
            .long("to")
            .required(required)
            .help("End date YYYY-MM-DD"),
    ]
}

fn output_args() -> [Arg; 2] {
    [
        Arg::new("export")
            .long("export")
            .value_name("DIR")
            .help("Write one CSV per section into DIR"),
        Arg::new("json-out")
            .long("json-out")
            .value_name("FILE")
            .help("Write the report document as JSON"),
    ]
}

fn party_cmd(name: &'static str, about: &'static str) -> Command {
    Command::new(name)
        .about(about)
        .subcommand(
            Command::new("add")
                .arg(Arg::new("name").long("name").required(true))
                .arg(Arg::new("phone").long("phone").required(true))
                .arg(Arg::new("address").long("address").required(true))
                .arg(Arg::new("email").long("email"))
                .arg(Arg::new("notes").long("notes")),
        )
        .subcommand(edit_cmd(&["name", "phone", "address", "email", "notes"]))
        .subcommand(Command::new("list").args(json_args()))
        .subcommand(Command::new("rm").arg(id_arg()))
}

fn item_arg(required: bool) -> Arg {
    Arg::new("item")
        .long("item")
        .required(required)
        .action(ArgAction::Append)
        .value_name("PRODUCT_ID:QTY:PRICE")
}

fn cost_arg() -> Arg {
    Arg::new("cost")
        .long("cost")
        .action(ArgAction::Append)
        .value_name("NAME:AMOUNT")
        .help("Named additional cost, added to --additional-cost")
}

fn order_cmd(name: &'static str, about: &'static str, party: &'static str) -> Command {
    let mut add = Command::new("add")
        .arg(
            Arg::new(party)
                .long(party)
                .required(true)
                .value_parser(value_parser!(i64)),
        )
        .arg(Arg::new("date").long("date").required(true))
        .arg(item_arg(true))
        .arg(Arg::new("paid").long("paid").help("Amount paid now"))
        .arg(
            Arg::new("account")
                .long("account")
                .value_parser(value_parser!(i64))
                .help("Account receiving or funding the payment"),
        )
        .arg(Arg::new("additional-cost").long("additional-cost"))
        .arg(Arg::new("notes").long("notes"));
    let mut edit = Command::new("edit")
        .about("Change an order; --item replaces all lines")
        .arg(id_arg())
        .arg(
            Arg::new(party)
                .long(party)
                .value_parser(value_parser!(i64)),
        )
        .arg(Arg::new("date").long("date"))
        .arg(item_arg(false))
        .arg(Arg::new("additional-cost").long("additional-cost"))
        .arg(Arg::new("notes").long("notes"));
    // only sales keep named costs
    if name == "sale" {
        add = add.arg(cost_arg());
        edit = edit.arg(cost_arg());
    }
    Command::new(name)
        .about(about)
        .subcommand(add)
        .subcommand(edit)
        .subcommand(
            Command::new("list")
                .args(range_args(false))
                .args(json_args()),
        )
        .subcommand(Command::new("rm").arg(id_arg()))
}

fn employee_arg(required: bool) -> Arg {
    Arg::new("employee")
        .long("employee")
        .required(required)
        .value_parser(value_parser!(i64))
}

fn year_arg(required: bool) -> Arg {
    Arg::new("year")
        .long("year")
        .required(required)
        .value_parser(value_parser!(i64))
}

/// Units and currencies: a unique name, a factor against the base entry and
/// a base flag.
fn catalog_cmd(name: &'static str, about: &'static str, factor: &'static str) -> Command {
    Command::new(name)
        .about(about)
        .subcommand(
            Command::new("add")
                .arg(Arg::new("name").long("name").required(true))
                .arg(Arg::new(factor).long(factor).default_value("1"))
                .arg(
                    Arg::new("base")
                        .long("base")
                        .action(ArgAction::SetTrue)
                        .help("Mark as the base entry"),
                ),
        )
        .subcommand(Command::new("list").args(json_args()))
}

fn movement_cmd(name: &'static str) -> Command {
    Command::new(name)
        .arg(id_arg())
        .arg(Arg::new("amount").long("amount").required(true))
        .arg(Arg::new("date").long("date").required(true))
        .arg(Arg::new("currency").long("currency").default_value("AFN"))
        .arg(Arg::new("rate").long("rate").default_value("1"))
        .arg(Arg::new("notes").long("notes"))
}

pub fn build_cli() -> Command {
    Command::new("daftar")
        .version(clap::crate_version!())
        .about("Small-business ledger with deterministic and AI-assisted reports")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("More log output (-v info, -vv debug)"),
        )
        .subcommand(Command::new("init").about("Create the database and all tables"))
        .subcommand(
            Command::new("config")
                .about("AI relay settings")
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("key").required(true))
                        .arg(Arg::new("value").required(true)),
                )
                .subcommand(Command::new("get").arg(Arg::new("key").required(true)))
                .subcommand(Command::new("list")),
        )
        .subcommand(party_cmd("customer", "Manage customers"))
        .subcommand(party_cmd("supplier", "Manage suppliers"))
        .subcommand(
            Command::new("product")
                .about("Manage products")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("price").long("price"))
                        .arg(Arg::new("stock").long("stock"))
                        .arg(Arg::new("unit").long("unit"))
                        .arg(
                            Arg::new("supplier")
                                .long("supplier")
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(Arg::new("barcode").long("barcode"))
                        .arg(Arg::new("description").long("description")),
                )
                .subcommand(
                    edit_cmd(&["name", "price", "stock", "unit", "barcode", "description"]).arg(
                        Arg::new("supplier")
                            .long("supplier")
                            .value_parser(value_parser!(i64)),
                    ),
                )
                .subcommand(Command::new("list").args(json_args()))
                .subcommand(Command::new("rm").arg(id_arg())),
        )
        .subcommand(order_cmd("sale", "Record and list sales", "customer"))
        .subcommand(order_cmd("purchase", "Record and list purchases", "supplier"))
        .subcommand(
            Command::new("expense")
                .about("Record and list expenses")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("type").long("type").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("date").long("date").required(true))
                        .arg(Arg::new("currency").long("currency").default_value("AFN"))
                        .arg(Arg::new("rate").long("rate").default_value("1"))
                        .arg(Arg::new("bill").long("bill"))
                        .arg(Arg::new("description").long("description")),
                )
                .subcommand(
                    Command::new("list")
                        .args(range_args(false))
                        .args(json_args()),
                )
                .subcommand(
                    Command::new("type")
                        .subcommand(
                            Command::new("add").arg(Arg::new("name").long("name").required(true)),
                        )
                        .subcommand(Command::new("list")),
                ),
        )
        .subcommand(
            Command::new("account")
                .about("Manage cash and bank accounts")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("code").long("code"))
                        .arg(Arg::new("type").long("type"))
                        .arg(Arg::new("initial").long("initial").default_value("0")),
                )
                .subcommand(
                    edit_cmd(&["name", "code", "type"]).arg(
                        Arg::new("active")
                            .long("active")
                            .value_parser(value_parser!(bool))
                            .help("true or false"),
                    ),
                )
                .subcommand(Command::new("list").args(json_args()))
                .subcommand(movement_cmd("deposit"))
                .subcommand(movement_cmd("withdraw")),
        )
        .subcommand(
            Command::new("employee")
                .about("Manage employees")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("phone").long("phone").required(true))
                        .arg(Arg::new("address").long("address").required(true))
                        .arg(Arg::new("email").long("email"))
                        .arg(Arg::new("position").long("position"))
                        .arg(Arg::new("hire-date").long("hire-date"))
                        .arg(Arg::new("base-salary").long("base-salary"))
                        .arg(Arg::new("notes").long("notes")),
                )
                .subcommand(Command::new("list").args(json_args()))
                .subcommand(Command::new("rm").arg(id_arg())),
        )
        .subcommand(
            Command::new("salary")
                .about("Monthly salaries, one per employee and month")
                .subcommand(
                    Command::new("add")
                        .arg(employee_arg(true))
                        .arg(year_arg(true))
                        .arg(Arg::new("month").long("month").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("deductions").long("deductions").default_value("0"))
                        .arg(Arg::new("notes").long("notes")),
                )
                .subcommand(
                    Command::new("list")
                        .arg(employee_arg(false))
                        .arg(year_arg(false))
                        .args(json_args()),
                ),
        )
        .subcommand(
            Command::new("deduction")
                .about("Salary deductions such as advances")
                .subcommand(
                    Command::new("add")
                        .arg(employee_arg(true))
                        .arg(year_arg(true))
                        .arg(Arg::new("month").long("month").required(true))
                        .arg(Arg::new("amount").long("amount").required(true))
                        .arg(Arg::new("currency").long("currency").default_value("AFN"))
                        .arg(Arg::new("rate").long("rate").default_value("1")),
                )
                .subcommand(
                    Command::new("list")
                        .arg(employee_arg(false))
                        .args(json_args()),
                ),
        )
        .subcommand(catalog_cmd("unit", "Units of measure", "ratio"))
        .subcommand(catalog_cmd("currency", "Currencies and exchange rates", "rate"))
        .subcommand(
            Command::new("company")
                .about("Company details shown on reports")
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("phone").long("phone"))
                        .arg(Arg::new("address").long("address"))
                        .arg(Arg::new("email").long("email")),
                )
                .subcommand(Command::new("show")),
        )
        .subcommand(
            Command::new("report")
                .about("Build a report for a date range")
                .arg(
                    Arg::new("kind")
                        .required(true)
                        .help("sales|purchases|expenses|accounts|products|customers|suppliers"),
                )
                .args(range_args(true))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the report document as JSON"),
                )
                .args(output_args()),
        )
        .subcommand(
            Command::new("query")
                .about("Run a read-only SQL query")
                .arg(Arg::new("sql").required(true))
                .arg(
                    Arg::new("param")
                        .long("param")
                        .action(ArgAction::Append)
                        .help("Bound parameter, parsed as JSON when possible"),
                )
                .args(json_args()),
        )
        .subcommand(
            Command::new("ai")
                .about("Ask a chat model to build a report from read-only queries")
                .subcommand(
                    Command::new("ask")
                        .arg(Arg::new("prompt").required(true))
                        .arg(Arg::new("model").long("model"))
                        .arg(
                            Arg::new("session")
                                .long("session")
                                .value_name("FILE")
                                .help("Save the conversation for later refinement"),
                        )
                        .arg(Arg::new("json").long("json").action(ArgAction::SetTrue))
                        .args(output_args()),
                )
                .subcommand(
                    Command::new("refine")
                        .arg(Arg::new("prompt").required(true))
                        .arg(Arg::new("model").long("model"))
                        .arg(
                            Arg::new("session")
                                .long("session")
                                .value_name("FILE")
                                .required(true),
                        )
                        .arg(Arg::new("json").long("json").action(ArgAction::SetTrue))
                        .args(output_args()),
                )
                .subcommand(Command::new("schema").about("Print the schema sent to the model")),
        )
        .subcommand(Command::new("doctor").about("Check stored totals and balances"))
}
