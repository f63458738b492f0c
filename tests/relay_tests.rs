// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, bail};
use daftar::chat::{ChatClient, ChatMessage, FunctionCall, Role, ToolCall, ToolSpec};
use daftar::db::{QueryExecutor, describe_schema, init_schema};
use daftar::error::RelayError;
use daftar::models::QueryResult;
use daftar::relay::{RUN_QUERY, RelayConfig, ReportRelay, SELECT_ONLY_ERROR};
use daftar::report::SectionKind;
use daftar::sql_guard::SqlPolicy;
use rusqlite::Connection;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

/// Replays canned replies and records every conversation it was sent.
struct Scripted {
    replies: RefCell<VecDeque<ChatMessage>>,
    seen: RefCell<Vec<Vec<ChatMessage>>>,
    models: RefCell<Vec<String>>,
    delay: Duration,
}

impl Scripted {
    fn new(replies: Vec<ChatMessage>) -> Self {
        Scripted {
            replies: RefCell::new(replies.into()),
            seen: RefCell::new(Vec::new()),
            models: RefCell::new(Vec::new()),
            delay: Duration::ZERO,
        }
    }

    fn calls(&self) -> usize {
        self.seen.borrow().len()
    }
}

impl ChatClient for Scripted {
    fn chat(&self, messages: &[ChatMessage], tools: &[ToolSpec], model: &str) -> Result<ChatMessage> {
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].function.name, RUN_QUERY);
        self.seen.borrow_mut().push(messages.to_vec());
        self.models.borrow_mut().push(model.to_string());
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        match self.replies.borrow_mut().pop_front() {
            Some(m) => Ok(m),
            None => bail!("script exhausted"),
        }
    }
}

/// Executor that must never be reached.
struct NoQueries;

impl QueryExecutor for NoQueries {
    fn run_select(&self, sql: &str, _params: &[Value]) -> Result<QueryResult> {
        panic!("unexpected query: {}", sql)
    }
}

fn tool_call(id: &str, name: &str, arguments: &str) -> ChatMessage {
    ChatMessage {
        role: Role::Assistant,
        content: None,
        tool_calls: vec![ToolCall {
            id: id.to_string(),
            kind: "function".to_string(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }],
        tool_call_id: None,
    }
}

fn query_call(id: &str, sql: &str) -> ChatMessage {
    tool_call(id, RUN_QUERY, &json!({ "sql": sql }).to_string())
}

const BAR_REPORT: &str = r#"{"title":"Monthly income","sections":[
    {"type":"chart","title":"Income by month",
     "chart":{"type":"bar","categories":["01","02"],"series":[{"name":"Income","data":[120.5,80]}]}}]}"#;

fn seeded() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    init_schema(&conn).unwrap();
    conn.execute_batch(
        r#"
        INSERT INTO customers(id, full_name, phone, address) VALUES (1,'Ahmad','0700','Kabul');
        INSERT INTO sales(customer_id, date, total_amount, paid_amount) VALUES
            (1,'2025-01-10',150,120.5),(1,'2025-02-03',80,80);
        "#,
    )
    .unwrap();
    conn
}

fn config() -> RelayConfig {
    RelayConfig {
        model: "test-model".to_string(),
        max_round_trips: 5,
        timeout: Duration::from_secs(30),
        policy: SqlPolicy::Strict,
    }
}

#[test]
fn monthly_income_question_runs_query_and_returns_chart() {
    let conn = seeded();
    let schema = describe_schema(&conn).unwrap();
    let client = Scripted::new(vec![
        query_call(
            "call_1",
            "SELECT strftime('%m',date) m, SUM(paid_amount) total FROM sales GROUP BY m",
        ),
        ChatMessage::assistant(BAR_REPORT),
    ]);
    let relay = ReportRelay::new(&client, &conn, schema, config());
    let out = relay.generate("درآمد ماهانه ۶ ماه گذشته", None).unwrap();

    assert_eq!(out.report.sections.len(), 1);
    assert_eq!(out.report.sections[0].kind, SectionKind::Chart);
    assert_eq!(out.report.sections[0].chart.as_ref().unwrap().kind, "bar");
    assert_eq!(client.calls(), 2);
    assert_eq!(client.models.borrow()[0], "test-model");

    // second request carries the query result as a tool message
    let seen = client.seen.borrow();
    let second = &seen[1];
    let tool_msg = second.last().unwrap();
    assert_eq!(tool_msg.role, Role::Tool);
    assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_1"));
    let payload: Value = serde_json::from_str(tool_msg.content.as_deref().unwrap()).unwrap();
    assert_eq!(payload["columns"], json!(["m", "total"]));
    assert_eq!(payload["rows"], json!([["01", 120.5], ["02", 80.0]]));

    // system, user, assistant(tool call), tool, assistant(report)
    assert_eq!(out.messages.len(), 5);
    assert_eq!(out.messages[0].role, Role::System);
    assert!(out.messages[0].content.as_deref().unwrap().contains("sales("));
    assert_eq!(out.messages[4].role, Role::Assistant);
}

#[test]
fn mutation_request_is_answered_with_error_and_loop_continues() {
    let client = Scripted::new(vec![
        query_call("call_1", "DELETE FROM sales"),
        ChatMessage::assistant(BAR_REPORT),
    ]);
    let relay = ReportRelay::new(&client, NoQueries, "", config());
    let out = relay.generate("clean up", None).unwrap();

    assert_eq!(out.report.title, "Monthly income");
    let seen = client.seen.borrow();
    let second = &seen[1];
    let tool_msg = second.last().unwrap();
    let payload: Value = serde_json::from_str(tool_msg.content.as_deref().unwrap()).unwrap();
    assert_eq!(payload, json!({ "error": SELECT_ONLY_ERROR }));
}

#[test]
fn prefix_policy_lets_hidden_mutation_reach_executor_readonly_check() {
    let conn = seeded();
    let mut cfg = config();
    cfg.policy = SqlPolicy::Prefix;
    let client = Scripted::new(vec![query_call("call_1", "SELECT 1; DELETE FROM sales")]);
    let relay = ReportRelay::new(&client, &conn, "", cfg);
    // rusqlite refuses the trailing statement, so nothing is deleted
    let err = relay.generate("x", None).unwrap_err();
    assert!(matches!(err, RelayError::Query(_) | RelayError::Chat(_)));
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM sales", [], |r| r.get(0))
        .unwrap();
    assert_eq!(n, 2);
}

#[test]
fn fenced_final_answer_is_accepted() {
    let fenced = format!("```json\n{}\n```", BAR_REPORT);
    let client = Scripted::new(vec![ChatMessage::assistant(fenced)]);
    let relay = ReportRelay::new(&client, NoQueries, "", config());
    let out = relay.generate("chart", None).unwrap();
    assert_eq!(out.report.sections.len(), 1);
}

#[test]
fn prose_answer_is_invalid_json() {
    let client = Scripted::new(vec![ChatMessage::assistant("Sorry, I cannot help.")]);
    let relay = ReportRelay::new(&client, NoQueries, "", config());
    match relay.generate("x", None).unwrap_err() {
        RelayError::InvalidJson { prefix, .. } => assert!(prefix.starts_with("Sorry")),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn endless_tool_calls_hit_the_budget() {
    let conn = seeded();
    let replies = (0..10)
        .map(|i| query_call(&format!("c{}", i), "SELECT 1"))
        .collect();
    let client = Scripted::new(replies);
    let mut cfg = config();
    cfg.max_round_trips = 3;
    let relay = ReportRelay::new(&client, &conn, "", cfg);
    let err = relay.generate("x", None).unwrap_err();
    assert!(matches!(err, RelayError::IterationBudgetExceeded { limit: 3 }));
    assert_eq!(client.calls(), 3);
}

#[test]
fn slow_model_hits_the_timeout() {
    let conn = seeded();
    let mut client = Scripted::new(vec![
        query_call("c1", "SELECT 1"),
        query_call("c2", "SELECT 1"),
    ]);
    client.delay = Duration::from_millis(30);
    let mut cfg = config();
    cfg.timeout = Duration::from_millis(10);
    let relay = ReportRelay::new(&client, &conn, "", cfg);
    let err = relay.generate("x", None).unwrap_err();
    assert!(matches!(err, RelayError::Timeout { .. }));
    assert_eq!(client.calls(), 1);
}

#[test]
fn malformed_arguments_and_unknown_tools_do_not_abort() {
    let client = Scripted::new(vec![
        tool_call("c1", RUN_QUERY, "{not json"),
        tool_call("c2", "drop_everything", "{}"),
        ChatMessage::assistant(BAR_REPORT),
    ]);
    let relay = ReportRelay::new(&client, NoQueries, "", config());
    relay.generate("x", None).unwrap();
    let seen = client.seen.borrow();
    let first = seen[1].last().unwrap().content.clone().unwrap();
    assert!(first.contains(SELECT_ONLY_ERROR));
    let second = seen[2].last().unwrap().content.clone().unwrap();
    assert!(second.contains("Unknown tool: drop_everything"));
}

#[test]
fn chat_failure_surfaces_as_chat_error() {
    let client = Scripted::new(Vec::new());
    let relay = ReportRelay::new(&client, NoQueries, "", config());
    let err = relay.generate("x", None).unwrap_err();
    assert!(matches!(err, RelayError::Chat(_)));
}

#[test]
fn refine_appends_to_saved_history() {
    let first = Scripted::new(vec![ChatMessage::assistant(BAR_REPORT)]);
    let relay = ReportRelay::new(&first, NoQueries, "", config());
    let out = relay.generate("monthly income", None).unwrap();

    let pie = r#"{"title":"Income share","sections":[{"type":"chart","title":"Share",
        "chart":{"type":"pie","labels":["01","02"],"series":[60,40]}}]}"#;
    let second = Scripted::new(vec![ChatMessage::assistant(pie)]);
    let relay = ReportRelay::new(&second, NoQueries, "", config());
    let refined = relay
        .refine(out.messages.clone(), "make it a pie chart", Some("other-model"))
        .unwrap();

    assert_eq!(refined.report.title, "Income share");
    assert_eq!(second.models.borrow()[0], "other-model");
    let seen = second.seen.borrow();
    let sent = &seen[0];
    assert_eq!(sent.len(), out.messages.len() + 1);
    assert_eq!(sent.last().unwrap().content.as_deref(), Some("make it a pie chart"));
    assert_eq!(refined.messages.len(), out.messages.len() + 2);
}

#[test]
fn refine_rejects_history_without_report() {
    let client = Scripted::new(vec![ChatMessage::assistant(BAR_REPORT)]);
    let relay = ReportRelay::new(&client, NoQueries, "", config());

    let err = relay
        .refine(vec![ChatMessage::user("hi")], "again", None)
        .unwrap_err();
    assert!(matches!(err, RelayError::InvalidHistory(_)));

    let history = vec![
        ChatMessage::system("s"),
        ChatMessage::user("u"),
        ChatMessage::assistant("not a report"),
    ];
    let err = relay.refine(history, "again", None).unwrap_err();
    assert!(matches!(err, RelayError::InvalidHistory(_)));
    assert_eq!(client.calls(), 0);
}
