mod pattern;
mod rows;
mod schema;

pub use pattern::{is_in, named, ne, node, Literal, Match, NodeMatcher, Path};
pub use rows::{Row, TieBreak};
pub use schema::{EdgeKind, NodeKind};

use serde::Serialize;
use serde_json::Value;

use crate::session::Session;

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

/// Normalize a pattern for the single-line query transport
pub fn prepare_query(pattern: &str, multiline: bool) -> String {
    let trimmed = pattern.trim();
    if multiline {
        trimmed.replace(['\r', '\n'], "")
    } else {
        trimmed.to_string()
    }
}

/// Run a raw pattern against a blueprint's staging graph.
///
/// Never fails: transport errors, non-200 answers and bodies without
/// `items` are logged and yield whatever rows could be recovered.
pub async fn run_query(session: &Session, blueprint_id: &str, pattern: &str, multiline: bool) -> Vec<Row> {
    let query = prepare_query(pattern, multiline);
    let path = format!("/blueprints/{}/qe", blueprint_id);
    tracing::debug!(blueprint = blueprint_id, "query: {}", query);

    let resp = match session
        .post(&path, &QueryRequest { query: &query }, &[("type", "staging")])
        .await
    {
        Ok(resp) => resp,
        Err(e) => {
            tracing::warn!(blueprint = blueprint_id, "Query failed: {} ({})", e, query);
            return Vec::new();
        }
    };

    if resp.status.as_u16() != 200 {
        tracing::warn!(
            blueprint = blueprint_id,
            status = %resp.status,
            "Query answered non-200: {} ({})",
            resp.body,
            query
        );
    }

    let items = match resp.json().and_then(|mut doc| doc.get_mut("items").map(Value::take)) {
        Some(items) => items,
        None => {
            tracing::warn!(blueprint = blueprint_id, "Query result has no items: {}", query);
            return Vec::new();
        }
    };

    match serde_json::from_value::<Vec<Row>>(items) {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(blueprint = blueprint_id, "Unreadable query items: {}", e);
            Vec::new()
        }
    }
}

/// Run a built pattern; every row carries a key for every binding
pub async fn run_match(session: &Session, blueprint_id: &str, pattern: &Match) -> Vec<Row> {
    let bindings = pattern.bindings();
    let mut rows = run_query(session, blueprint_id, &pattern.to_string(), false).await;
    for row in &mut rows {
        row.fill_missing(&bindings);
    }
    rows
}
