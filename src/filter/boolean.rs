use crate::ast::{Condition, Operator, Value};
use crate::error::GridResult;
use crate::filter::{apply_where, Filter, FilterBase, FilterData, FilterOptions, FilterType};
use crate::query::FilterQuery;

/// Yes / no / all switch over a boolean field.
#[derive(Debug, Clone)]
pub struct BooleanFilter {
    base: FilterBase,
}

impl BooleanFilter {
    pub fn new(name: impl Into<String>, field_name: impl Into<String>, options: FilterOptions) -> Self {
        Self {
            base: FilterBase::new(name, field_name, options),
        }
    }
}

/// `Some(flag)` for yes/no, `None` for "all" and anything unrecognised.
fn parse_choice(value: &serde_json::Value) -> Option<bool> {
    match value {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(2) | Some(0) => Some(false),
            _ => None,
        },
        serde_json::Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" | "1" => Some(true),
            "no" | "false" | "2" | "0" => Some(false),
            "all" | "" => None,
            other => {
                tracing::warn!("Ignoring boolean choice '{}'", other);
                None
            }
        },
        _ => None,
    }
}

impl Filter for BooleanFilter {
    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter_type(&self) -> FilterType {
        FilterType::Boolean
    }

    fn filter(&self, query: &mut dyn FilterQuery, data: &FilterData) -> GridResult<bool> {
        let Some(flag) = parse_choice(&data.value) else {
            return Ok(false);
        };
        let param = query.bind(Value::Bool(flag));
        apply_where(
            query,
            self.condition(),
            Condition::new(self.field_name(), Operator::Eq, param),
        );
        Ok(true)
    }

    fn clone_box(&self) -> Box<dyn Filter> {
        Box::new(self.clone())
    }
}
