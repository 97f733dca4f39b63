//! In-memory document store backend.
//!
//! Documents are JSON objects grouped by collection. Predicates are evaluated
//! directly against the documents; counting runs the unbounded query and
//! counts what comes back, the way a document cursor is counted.

use dashmap::DashMap;
use serde_json::Value as Json;
use std::cmp::Ordering;
use std::sync::Arc;

use crate::ast::*;
use crate::error::{GridError, GridResult};
use crate::query::{Backend, Record};

/// Shared, cloneable handle on a set of in-memory collections.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    collections: Arc<DashMap<String, Vec<Record>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append documents to a collection; non-object values are skipped.
    pub fn insert_many(&self, collection: &str, documents: Vec<Json>) -> usize {
        let mut docs = self.collections.entry(collection.to_string()).or_default();
        let before = docs.len();
        for document in documents {
            match document {
                Json::Object(map) => docs.push(map),
                other => tracing::warn!("Skipping non-object document in '{}': {}", collection, other),
            }
        }
        docs.len() - before
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    fn run(&self, cmd: &QueryCmd, params: &[Value]) -> GridResult<Vec<Record>> {
        let Some(docs) = self.collections.get(&cmd.table) else {
            return Ok(Vec::new());
        };

        let mut matched = Vec::new();
        for doc in docs.iter() {
            if matches(doc, cmd, params)? {
                matched.push(doc.clone());
            }
        }
        drop(docs);

        if let Some((field, order)) = cmd.sort() {
            matched.sort_by(|a, b| {
                let ord = sort_order(lookup(a, field), lookup(b, field));
                match order {
                    SortOrder::Asc => ord,
                    SortOrder::Desc => ord.reverse(),
                }
            });
        }

        let offset = cmd.offset().unwrap_or(0);
        let iter = matched.into_iter().skip(offset);
        let page: Vec<Record> = match cmd.limit() {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        };

        if cmd.columns.is_empty() {
            return Ok(page);
        }
        Ok(page
            .into_iter()
            .map(|doc| {
                cmd.columns
                    .iter()
                    .map(|c| (c.clone(), lookup(&doc, c).cloned().unwrap_or(Json::Null)))
                    .collect()
            })
            .collect())
    }
}

impl Backend for MemoryBackend {
    fn fetch(&self, cmd: &QueryCmd, params: &[Value]) -> GridResult<Vec<Record>> {
        self.run(cmd, params)
    }

    fn count(&self, cmd: &QueryCmd, params: &[Value]) -> GridResult<usize> {
        let cursor = self.run(&cmd.without_bounds(), params)?;
        tracing::debug!("Counted {} documents in '{}'", cursor.len(), cmd.table);
        Ok(cursor.len())
    }
}

/// Field lookup with `a.b` paths into nested documents.
fn lookup<'a>(doc: &'a Record, path: &str) -> Option<&'a Json> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

fn matches(doc: &Record, cmd: &QueryCmd, params: &[Value]) -> GridResult<bool> {
    for cage in cmd.filters() {
        let passed = match cage.logical_op {
            LogicalOp::And => {
                let mut all = true;
                for cond in &cage.conditions {
                    if !eval(doc, cond, params)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            LogicalOp::Or => {
                let mut any = false;
                for cond in &cage.conditions {
                    if eval(doc, cond, params)? {
                        any = true;
                        break;
                    }
                }
                any
            }
        };
        if !passed {
            return Ok(false);
        }
    }
    Ok(true)
}

fn resolve(value: &Value, params: &[Value]) -> GridResult<Json> {
    match value {
        Value::Param(n) => params
            .get(n.wrapping_sub(1))
            .map(Value::to_json)
            .ok_or_else(|| GridError::Execution(format!("parameter ${} is not bound", n))),
        Value::Array(items) => items
            .iter()
            .map(|v| resolve(v, params))
            .collect::<GridResult<Vec<_>>>()
            .map(Json::Array),
        v => Ok(v.to_json()),
    }
}

/// SQL-style evaluation: comparisons against a missing or null field are false.
fn eval(doc: &Record, cond: &Condition, params: &[Value]) -> GridResult<bool> {
    let field = lookup(doc, &cond.column).filter(|v| !v.is_null());

    let Some(field) = field else {
        return Ok(cond.op == Operator::IsNull);
    };

    let expected = resolve(&cond.value, params)?;
    let result = match cond.op {
        Operator::Eq => compare(field, &expected) == Some(Ordering::Equal),
        Operator::Ne => matches!(compare(field, &expected), Some(o) if o != Ordering::Equal),
        Operator::Gt => compare(field, &expected) == Some(Ordering::Greater),
        Operator::Gte => matches!(compare(field, &expected), Some(Ordering::Greater | Ordering::Equal)),
        Operator::Lt => compare(field, &expected) == Some(Ordering::Less),
        Operator::Lte => matches!(compare(field, &expected), Some(Ordering::Less | Ordering::Equal)),
        Operator::In | Operator::NotIn => {
            let found = expected
                .as_array()
                .map(|items| items.iter().any(|v| compare(field, v) == Some(Ordering::Equal)))
                .unwrap_or(false);
            if cond.op == Operator::In { found } else { !found }
        }
        Operator::Contains | Operator::NotContains | Operator::StartsWith | Operator::EndsWith => {
            let (Some(haystack), Some(needle)) = (text(field), text(&expected)) else {
                return Ok(false);
            };
            let (haystack, needle) = if cond.case_sensitive {
                (haystack, needle)
            } else {
                (haystack.to_lowercase(), needle.to_lowercase())
            };
            match cond.op {
                Operator::Contains => haystack.contains(&needle),
                Operator::NotContains => !haystack.contains(&needle),
                Operator::StartsWith => haystack.starts_with(&needle),
                _ => haystack.ends_with(&needle),
            }
        }
        Operator::IsNull => false,
        Operator::IsNotNull => true,
    };
    Ok(result)
}

fn text(value: &Json) -> Option<String> {
    match value {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        Json::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Compare two scalars; numbers compare numerically, mismatched kinds don't compare.
fn compare(a: &Json, b: &Json) -> Option<Ordering> {
    match (a, b) {
        (Json::Number(x), Json::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Json::String(x), Json::String(y)) => Some(x.cmp(y)),
        (Json::Bool(x), Json::Bool(y)) => Some(x.cmp(y)),
        // request values often arrive as strings
        (Json::Number(x), Json::String(y)) => x.as_f64()?.partial_cmp(&y.parse::<f64>().ok()?),
        (Json::String(x), Json::Number(y)) => x.parse::<f64>().ok()?.partial_cmp(&y.as_f64()?),
        (Json::Bool(x), Json::Number(y)) => Some((*x as i64).cmp(&y.as_i64()?)),
        _ => None,
    }
}

/// Position of a JSON kind in the sort order.
fn kind_rank(value: Option<&Json>) -> u8 {
    match value {
        Some(Json::Bool(_)) => 0,
        Some(Json::Number(_)) => 1,
        Some(Json::String(_)) => 2,
        Some(Json::Array(_)) => 3,
        Some(Json::Object(_)) => 4,
        Some(Json::Null) | None => 5,
    }
}

/// Total order used for sorting documents.
///
/// Kinds never mix: booleans, then numbers, then strings, then lists and
/// objects. Missing and null fields sort as the largest value, last when
/// ascending and first when descending, the way PostgreSQL orders NULLs.
fn sort_order(a: Option<&Json>, b: Option<&Json>) -> Ordering {
    kind_rank(a).cmp(&kind_rank(b)).then_with(|| match (a, b) {
        (Some(Json::Bool(x)), Some(Json::Bool(y))) => x.cmp(y),
        (Some(Json::Number(x)), Some(Json::Number(y))) => {
            let x = x.as_f64().unwrap_or_default();
            x.total_cmp(&y.as_f64().unwrap_or_default())
        }
        (Some(Json::String(x)), Some(Json::String(y))) => x.cmp(y),
        (Some(x @ (Json::Array(_) | Json::Object(_))), Some(y)) => x.to_string().cmp(&y.to_string()),
        _ => Ordering::Equal,
    })
}
