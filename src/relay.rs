// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Turns a natural-language report request into a [`Report`] by letting a chat
//! model read the database through a single `run_query` tool.
//!
//! The loop is strictly sequential: one chat call, then every requested query
//! in order, then the next chat call. It ends when the model answers without
//! tool calls, or with an error when the round-trip budget or the wall-clock
//! timeout runs out.

use crate::chat::{ChatClient, ChatMessage, FunctionSpec, Role, ToolCall, ToolSpec};
use crate::db::QueryExecutor;
use crate::error::RelayError;
use crate::report::{Report, parse_report};
use crate::sql_guard::SqlPolicy;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::{Duration, Instant};

pub const RUN_QUERY: &str = "run_query";
pub const SELECT_ONLY_ERROR: &str = "Only SELECT queries are allowed";

#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub model: String,
    /// Maximum number of chat calls for one request.
    pub max_round_trips: usize,
    pub timeout: Duration,
    pub policy: SqlPolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            model: "gpt-4o-mini".to_string(),
            max_round_trips: 8,
            timeout: Duration::from_secs(120),
            policy: SqlPolicy::Strict,
        }
    }
}

/// The validated report plus the whole conversation, final answer included,
/// so a follow-up can append one more user turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayOutcome {
    pub report: Report,
    pub messages: Vec<ChatMessage>,
}

pub fn run_query_tool() -> ToolSpec {
    ToolSpec {
        kind: "function".to_string(),
        function: FunctionSpec {
            name: RUN_QUERY.to_string(),
            description: "Run a read-only SQLite SELECT query and return {columns, rows}."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "sql": {
                        "type": "string",
                        "description": "A single SELECT statement. Use ? placeholders for values."
                    },
                    "params": {
                        "type": "array",
                        "description": "Values bound to the ? placeholders, in order.",
                        "items": {}
                    }
                },
                "required": ["sql"]
            }),
        },
    }
}

pub fn system_prompt(schema: &str) -> String {
    format!(
        r#"You are a reporting assistant for a small-business ledger stored in SQLite.
Use the run_query tool to read data. Only SELECT statements are allowed; bind values through "params" with ? placeholders.
Dates are stored as TEXT in YYYY-MM-DD form. Amounts are REAL.
When you have what you need, respond ONLY with a JSON object of this shape and nothing else:
{{
  "title": string,
  "summary": string (optional),
  "sections": [
    {{ "type": "table", "title": string, "table": {{ "columns": [string], "rows": [[value, ...], ...] }} }},
    {{ "type": "chart", "title": string, "chart": {{ "type": "bar" | "line" | "pie", "categories": [string], "series": [{{ "name": string, "data": [number] }}], "labels": [string] }} }}
  ]
}}
For pie charts put slice names in "labels" and a flat list of numbers in "series".

Database schema:
{schema}"#
    )
}

/// Pull `sql` and `params` out of the model's raw argument text. Anything
/// unparsable degrades to an empty statement or an empty parameter list.
pub fn parse_tool_args(raw: &str) -> (String, Vec<Value>) {
    let v: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            debug!("tool arguments are not JSON: {}", e);
            return (String::new(), Vec::new());
        }
    };
    let sql = v
        .get("sql")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let params = match v.get("params") {
        Some(Value::Array(a)) => a.clone(),
        // some models double-encode the array
        Some(Value::String(s)) => match serde_json::from_str::<Value>(s) {
            Ok(Value::Array(a)) => a,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    (sql, params)
}

pub struct ReportRelay<C, Q> {
    client: C,
    executor: Q,
    schema: String,
    config: RelayConfig,
}

impl<C: ChatClient, Q: QueryExecutor> ReportRelay<C, Q> {
    pub fn new(client: C, executor: Q, schema: impl Into<String>, config: RelayConfig) -> Self {
        ReportRelay {
            client,
            executor,
            schema: schema.into(),
            config,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Start a new conversation for `prompt`.
    pub fn generate(&self, prompt: &str, model: Option<&str>) -> Result<RelayOutcome, RelayError> {
        let messages = vec![
            ChatMessage::system(system_prompt(&self.schema)),
            ChatMessage::user(prompt),
        ];
        self.run(messages, model.unwrap_or(self.config.model.as_str()))
    }

    /// Continue a previous conversation with one more user turn. The last
    /// report in `history` is re-validated before anything is sent.
    pub fn refine(
        &self,
        mut history: Vec<ChatMessage>,
        prompt: &str,
        model: Option<&str>,
    ) -> Result<RelayOutcome, RelayError> {
        match history.first() {
            Some(m) if m.role == Role::System => {}
            _ => {
                return Err(RelayError::InvalidHistory(
                    "conversation must start with the system prompt".into(),
                ));
            }
        }
        let last = history
            .last()
            .filter(|m| m.role == Role::Assistant && m.tool_calls.is_empty())
            .ok_or_else(|| {
                RelayError::InvalidHistory("conversation does not end with a report".into())
            })?;
        parse_report(last.content.as_deref().unwrap_or_default())
            .map_err(|e| RelayError::InvalidHistory(format!("previous report is invalid: {}", e)))?;
        history.push(ChatMessage::user(prompt));
        self.run(history, model.unwrap_or(self.config.model.as_str()))
    }

    fn run(&self, mut messages: Vec<ChatMessage>, model: &str) -> Result<RelayOutcome, RelayError> {
        let tools = [run_query_tool()];
        let started = Instant::now();
        let mut round = 0usize;
        loop {
            if round >= self.config.max_round_trips {
                return Err(RelayError::IterationBudgetExceeded {
                    limit: self.config.max_round_trips,
                });
            }
            if round > 0 {
                let elapsed = started.elapsed();
                if elapsed >= self.config.timeout {
                    return Err(RelayError::Timeout { elapsed });
                }
            }
            round += 1;
            debug!("round {} with {} messages (model {})", round, messages.len(), model);

            let mut reply = self
                .client
                .chat(&messages, &tools, model)
                .map_err(|e| RelayError::Chat(format!("{:#}", e)))?;
            reply.role = Role::Assistant;

            if reply.tool_calls.is_empty() {
                let report = parse_report(reply.content.as_deref().unwrap_or_default())?;
                info!(
                    "report '{}' with {} sections after {} rounds",
                    report.title,
                    report.sections.len(),
                    round
                );
                messages.push(reply);
                return Ok(RelayOutcome { report, messages });
            }

            let calls = reply.tool_calls.clone();
            messages.push(reply);
            for call in &calls {
                let content = self.answer(call)?;
                messages.push(ChatMessage::tool_result(call.id.clone(), content));
            }
        }
    }

    fn answer(&self, call: &ToolCall) -> Result<String, RelayError> {
        if call.function.name != RUN_QUERY {
            warn!("model asked for unknown tool {}", call.function.name);
            return Ok(json!({ "error": format!("Unknown tool: {}", call.function.name) })
                .to_string());
        }
        let (sql, params) = parse_tool_args(&call.function.arguments);
        if let Err(rejection) = self.config.policy.check(&sql) {
            warn!("rejected model SQL ({}): {}", rejection, sql);
            return Ok(json!({ "error": SELECT_ONLY_ERROR }).to_string());
        }
        debug!("run_query: {} {:?}", sql, params);
        let result = self
            .executor
            .run_select(&sql, &params)
            .map_err(|e| RelayError::Query(format!("{:#}", e)))?;
        serde_json::to_string(&result).map_err(|e| RelayError::Query(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_args_are_parsed_defensively() {
        let (sql, params) = parse_tool_args(r#"{"sql":"SELECT ?","params":[1,"a"]}"#);
        assert_eq!(sql, "SELECT ?");
        assert_eq!(params, vec![json!(1), json!("a")]);

        let (sql, params) = parse_tool_args(r#"{"sql":"SELECT 1","params":"[2]"}"#);
        assert_eq!(sql, "SELECT 1");
        assert_eq!(params, vec![json!(2)]);

        let (sql, params) = parse_tool_args(r#"{"sql":"SELECT 1","params":"oops"}"#);
        assert_eq!(sql, "SELECT 1");
        assert!(params.is_empty());

        let (sql, params) = parse_tool_args("{not json");
        assert!(sql.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn tool_spec_has_single_run_query() {
        let t = run_query_tool();
        assert_eq!(t.function.name, RUN_QUERY);
        assert_eq!(t.function.parameters["required"], json!(["sql"]));
    }

    #[test]
    fn system_prompt_embeds_schema() {
        let p = system_prompt("sales(id INTEGER, date TEXT)");
        assert!(p.contains("sales(id INTEGER, date TEXT)"));
        assert!(p.contains("respond ONLY with a JSON object"));
    }
}
