//! Query-string encoding for the table API.

use poster_studio_sdk::{Embed, Filter, Order, Query};
use serde_json::Value;

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn filter_param(filter: &Filter) -> (String, String) {
    match filter {
        Filter::Eq { column, value } if value.is_null() => (column.clone(), "is.null".to_owned()),
        Filter::Eq { column, value } => (column.clone(), format!("eq.{}", literal(value))),
    }
}

fn order_param(order: &[Order]) -> Option<String> {
    if order.is_empty() {
        return None;
    }
    let clauses: Vec<String> = order
        .iter()
        .map(|o| {
            let direction = if o.ascending { "asc" } else { "desc" };
            format!("{}.{direction}", o.column)
        })
        .collect();
    Some(clauses.join(","))
}

/// `select` column list, with the embedded relation when requested.
pub fn select_list(embed: Option<Embed>) -> String {
    match embed {
        Some(embed) => format!("*,{}:{}(*)", embed.key(), embed.table()),
        None => "*".to_owned(),
    }
}

pub fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters.iter().map(filter_param).collect()
}

/// Full parameter list of a read.
pub fn read_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_owned(), select_list(query.embed))];
    params.extend(filter_params(&query.filters));
    if let Some(order) = order_param(&query.order) {
        params.push(("order".to_owned(), order));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_owned(), limit.to_string()));
    }
    params
}
