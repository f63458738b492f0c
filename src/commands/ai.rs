// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::chat::{ChatMessage, HttpChatClient};
use crate::commands::reports::emit;
use crate::config::{AiConfig, ENV_API_KEY};
use crate::db::describe_schema;
use crate::relay::{RelayOutcome, ReportRelay};
use anyhow::{Context, Result};
use log::{info, warn};
use rusqlite::Connection;
use std::fs;
use std::path::Path;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("ask", sub)) => {
            let prompt = sub.get_one::<String>("prompt").unwrap();
            let outcome = {
                let relay = build_relay(conn)?;
                relay.generate(prompt, sub.get_one::<String>("model").map(String::as_str))?
            };
            if let Some(path) = sub.get_one::<String>("session") {
                save_session(Path::new(path), &outcome)?;
            }
            emit(&outcome.report, sub)?;
        }
        Some(("refine", sub)) => {
            let prompt = sub.get_one::<String>("prompt").unwrap();
            let path = Path::new(sub.get_one::<String>("session").unwrap());
            let history = load_session(path)?;
            let outcome = {
                let relay = build_relay(conn)?;
                relay.refine(
                    history,
                    prompt,
                    sub.get_one::<String>("model").map(String::as_str),
                )?
            };
            save_session(path, &outcome)?;
            emit(&outcome.report, sub)?;
        }
        Some(("schema", _)) => print!("{}", describe_schema(conn)?),
        _ => {}
    }
    Ok(())
}

fn build_relay(conn: &Connection) -> Result<ReportRelay<HttpChatClient, &Connection>> {
    let cfg = AiConfig::load(conn)?;
    if cfg.api_key.is_none() {
        warn!("{} is not set; the request is sent without credentials", ENV_API_KEY);
    }
    info!("AI relay using {} at {}", cfg.model, cfg.api_base);
    let client = HttpChatClient::new(&cfg.api_base, cfg.api_key.clone(), cfg.timeout_secs)?;
    let schema = describe_schema(conn)?;
    Ok(ReportRelay::new(client, conn, schema, cfg.relay_config()))
}

/// Sessions hold the last report and the conversation that produced it.
pub fn save_session(path: &Path, outcome: &RelayOutcome) -> Result<()> {
    fs::write(path, serde_json::to_string_pretty(outcome)?)
        .with_context(|| format!("Write session {}", path.display()))?;
    Ok(())
}

pub fn load_session(path: &Path) -> Result<Vec<ChatMessage>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Read session {}", path.display()))?;
    let outcome: RelayOutcome = serde_json::from_str(&text)
        .with_context(|| format!("Session {} is not a saved conversation", path.display()))?;
    Ok(outcome.messages)
}
