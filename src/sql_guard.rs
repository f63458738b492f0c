// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Gate that decides which model-proposed SQL may reach the database.
//!
//! Two policies exist. [`SqlPolicy::Prefix`] is the plain "starts with SELECT"
//! check. [`SqlPolicy::Strict`] scans the statement, skipping comments, string
//! literals and quoted identifiers, and only accepts a single `SELECT`/`WITH`
//! statement that contains no data- or schema-changing keyword.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqlRejection {
    #[error("empty statement")]
    Empty,
    #[error("statement must start with SELECT or WITH, found '{0}'")]
    NotASelect(String),
    #[error("multiple statements are not allowed")]
    MultipleStatements,
    #[error("keyword {0} is not allowed in a read query")]
    ForbiddenKeyword(String),
    #[error("unterminated string, identifier or comment")]
    Unterminated,
}

// REPLACE is absent on purpose: it doubles as the replace() function and
// REPLACE INTO already fails the leading keyword check.
const FORBIDDEN: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "ATTACH", "DETACH", "PRAGMA",
    "VACUUM", "REINDEX",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlPolicy {
    Prefix,
    #[default]
    Strict,
}

impl SqlPolicy {
    pub fn check(self, sql: &str) -> Result<(), SqlRejection> {
        match self {
            SqlPolicy::Prefix => {
                if is_select_only(sql) {
                    Ok(())
                } else {
                    let first = sql.split_whitespace().next().unwrap_or_default();
                    if first.is_empty() {
                        Err(SqlRejection::Empty)
                    } else {
                        Err(SqlRejection::NotASelect(first.to_string()))
                    }
                }
            }
            SqlPolicy::Strict => check_read_only(sql),
        }
    }
}

/// True iff the trimmed, upper-cased text starts with `SELECT`.
pub fn is_select_only(sql: &str) -> bool {
    sql.trim().to_uppercase().starts_with("SELECT")
}

#[derive(Debug, PartialEq)]
enum Token {
    Word(String),
    Semicolon,
    Other,
}

fn tokenize(sql: &str) -> Result<Vec<Token>, SqlRejection> {
    let chars: Vec<char> = sql.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '-' && chars.get(i + 1) == Some(&'-') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            loop {
                if i + 1 >= chars.len() {
                    return Err(SqlRejection::Unterminated);
                }
                if chars[i] == '*' && chars[i + 1] == '/' {
                    i += 2;
                    break;
                }
                i += 1;
            }
        } else if c == '\'' || c == '"' || c == '`' || c == '[' {
            let close = if c == '[' { ']' } else { c };
            i += 1;
            loop {
                if i >= chars.len() {
                    return Err(SqlRejection::Unterminated);
                }
                if chars[i] == close {
                    // doubled quote is an escaped quote
                    if close != ']' && chars.get(i + 1) == Some(&close) {
                        i += 2;
                        continue;
                    }
                    i += 1;
                    break;
                }
                i += 1;
            }
            out.push(Token::Other);
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$')
            {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            out.push(Token::Word(word.to_uppercase()));
        } else if c == ';' {
            out.push(Token::Semicolon);
            i += 1;
        } else {
            out.push(Token::Other);
            i += 1;
        }
    }
    Ok(out)
}

/// Strict read-only check used by the report relay.
pub fn check_read_only(sql: &str) -> Result<(), SqlRejection> {
    let tokens = tokenize(sql)?;
    let first = match tokens.first() {
        None => return Err(SqlRejection::Empty),
        Some(Token::Word(w)) => w.clone(),
        Some(_) => return Err(SqlRejection::NotASelect(sql.trim().chars().take(10).collect())),
    };
    if first != "SELECT" && first != "WITH" {
        return Err(SqlRejection::NotASelect(first));
    }
    if let Some(pos) = tokens.iter().position(|t| *t == Token::Semicolon) {
        if tokens[pos + 1..].iter().any(|t| *t != Token::Semicolon) {
            return Err(SqlRejection::MultipleStatements);
        }
    }
    for t in &tokens {
        if let Token::Word(w) = t {
            if FORBIDDEN.contains(&w.as_str()) {
                return Err(SqlRejection::ForbiddenKeyword(w.clone()));
            }
        }
    }
    Ok(())
}
