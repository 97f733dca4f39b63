use std::str::FromStr;

use crate::ast::{Condition, Operator, Value};
use crate::error::GridResult;
use crate::filter::{apply_where, Filter, FilterBase, FilterData, FilterOptions, FilterType};
use crate::query::FilterQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChoiceOperator {
    #[default]
    Equal,
    NotEqual,
}

impl FromStr for ChoiceOperator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equal" | "in" | "1" => Ok(ChoiceOperator::Equal),
            "not_equal" | "not_in" | "2" => Ok(ChoiceOperator::NotEqual),
            _ => Err(()),
        }
    }
}

/// Membership in a fixed set of values.
///
/// A single value compares with `=` / `!=`, a list with `IN` / `NOT IN`.
/// When the `choices` option is set, values outside it are ignored and the
/// configured spelling of a matching choice is bound.
#[derive(Debug, Clone)]
pub struct ChoiceFilter {
    base: FilterBase,
}

impl ChoiceFilter {
    pub fn new(name: impl Into<String>, field_name: impl Into<String>, options: FilterOptions) -> Self {
        Self {
            base: FilterBase::new(name, field_name, options),
        }
    }

    fn allowed(&self, value: &serde_json::Value) -> Option<Value> {
        let choices = &self.options().choices;
        if choices.is_empty() {
            return Some(Value::from_json(value));
        }
        let found = choices.iter().find(|choice| same_choice(choice, value));
        if found.is_none() {
            tracing::warn!("Filter '{}' ignores {}, not one of its choices", self.name(), value);
        }
        found.map(Value::from_json)
    }
}

/// Request values arrive as strings, so `"1"` matches a configured `1`.
fn same_choice(choice: &serde_json::Value, value: &serde_json::Value) -> bool {
    use serde_json::Value as Json;
    match (choice, value) {
        (Json::Number(n), Json::String(s)) | (Json::String(s), Json::Number(n)) => {
            matches!((n.as_f64(), s.trim().parse::<f64>()), (Some(a), Ok(b)) if a == b)
        }
        (Json::String(a), Json::String(b)) => a == b.trim() || a.trim() == b,
        (Json::Number(a), Json::Number(b)) => a.as_f64() == b.as_f64(),
        (a, b) => a == b,
    }
}

impl Filter for ChoiceFilter {
    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter_type(&self) -> FilterType {
        FilterType::Choice
    }

    fn filter(&self, query: &mut dyn FilterQuery, data: &FilterData) -> GridResult<bool> {
        let Some(operator) = data.operator(ChoiceOperator::default()) else {
            return Ok(false);
        };
        let negate = operator == ChoiceOperator::NotEqual;

        let predicate = match &data.value {
            serde_json::Value::Array(items) => {
                let mut params = Vec::with_capacity(items.len());
                for item in items.iter().filter(|v| !v.is_null()) {
                    if let Some(value) = self.allowed(item) {
                        params.push(query.bind(value));
                    }
                }
                if params.is_empty() {
                    return Ok(false);
                }
                let op = if negate { Operator::NotIn } else { Operator::In };
                Condition::new(self.field_name(), op, Value::Array(params))
            }
            scalar => {
                let Some(value) = self.allowed(scalar) else {
                    return Ok(false);
                };
                let op = if negate { Operator::Ne } else { Operator::Eq };
                let param = query.bind(value);
                Condition::new(self.field_name(), op, param)
            }
        };

        apply_where(query, self.condition(), predicate);
        Ok(true)
    }

    fn clone_box(&self) -> Box<dyn Filter> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::QueryCmd;
    use crate::memory::MemoryBackend;
    use crate::query::ProxyQuery;
    use crate::transpiler::ToSql;
    use serde_json::json;

    fn filter() -> ChoiceFilter {
        let options = FilterOptions {
            choices: vec![json!("draft"), json!("published"), json!("archived")],
            ..Default::default()
        };
        ChoiceFilter::new("status", "status", options)
    }

    #[test]
    fn test_list_becomes_in() {
        let mut f = filter();
        let mut q = ProxyQuery::new(MemoryBackend::new(), QueryCmd::get("posts"));
        f.apply(&mut q, Some(&FilterData::new(json!(["draft", "archived"]))))
            .unwrap();
        assert_eq!(q.cmd().to_sql(), "SELECT * FROM posts WHERE status IN ($1, $2)");
    }

    #[test]
    fn test_not_equal_scalar() {
        let mut f = filter();
        let mut q = ProxyQuery::new(MemoryBackend::new(), QueryCmd::get("posts"));
        f.apply(&mut q, Some(&FilterData::with_type("not_equal", "draft")))
            .unwrap();
        assert_eq!(q.cmd().to_sql(), "SELECT * FROM posts WHERE status != $1");
    }

    #[test]
    fn test_value_outside_choices() {
        let mut f = filter();
        let mut q = ProxyQuery::new(MemoryBackend::new(), QueryCmd::get("posts"));
        f.apply(&mut q, Some(&FilterData::new("deleted"))).unwrap();
        assert!(!f.is_active());
        assert!(q.cmd().cages.is_empty());

        f.apply(&mut q, Some(&FilterData::new(json!(["deleted", "draft"]))))
            .unwrap();
        assert!(f.is_active());
        assert_eq!(q.parameters(), &[Value::from("draft")]);
    }

    #[test]
    fn test_request_strings_match_numeric_choices() {
        let options = FilterOptions {
            choices: vec![json!(1), json!(2)],
            ..Default::default()
        };
        let mut f = ChoiceFilter::new("rating", "rating", options);
        let mut q = ProxyQuery::new(MemoryBackend::new(), QueryCmd::get("posts"));
        f.apply(&mut q, Some(&FilterData::new("1"))).unwrap();
        assert!(f.is_active());
        assert_eq!(q.parameters(), &[Value::Int(1)]);

        let mut q = ProxyQuery::new(MemoryBackend::new(), QueryCmd::get("posts"));
        f.apply(&mut q, Some(&FilterData::new("3"))).unwrap();
        assert!(!f.is_active());
    }
}
