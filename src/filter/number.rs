use std::str::FromStr;

use crate::ast::{Condition, Operator, Value};
use crate::error::GridResult;
use crate::filter::{apply_where, Filter, FilterBase, FilterData, FilterOptions, FilterType};
use crate::query::FilterQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberOperator {
    #[default]
    Equal,
    NotEqual,
    GreaterThan,
    GreaterEqual,
    LessThan,
    LessEqual,
}

impl FromStr for NumberOperator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" | "equal" | "=" => Ok(NumberOperator::Equal),
            "ne" | "not_equal" | "!=" => Ok(NumberOperator::NotEqual),
            "gt" | ">" => Ok(NumberOperator::GreaterThan),
            "gte" | ">=" => Ok(NumberOperator::GreaterEqual),
            "lt" | "<" => Ok(NumberOperator::LessThan),
            "lte" | "<=" => Ok(NumberOperator::LessEqual),
            _ => Err(()),
        }
    }
}

impl NumberOperator {
    fn as_operator(self) -> Operator {
        match self {
            NumberOperator::Equal => Operator::Eq,
            NumberOperator::NotEqual => Operator::Ne,
            NumberOperator::GreaterThan => Operator::Gt,
            NumberOperator::GreaterEqual => Operator::Gte,
            NumberOperator::LessThan => Operator::Lt,
            NumberOperator::LessEqual => Operator::Lte,
        }
    }
}

/// Numeric comparison; request strings are parsed as integers first, then floats.
#[derive(Debug, Clone)]
pub struct NumberFilter {
    base: FilterBase,
}

impl NumberFilter {
    pub fn new(name: impl Into<String>, field_name: impl Into<String>, options: FilterOptions) -> Self {
        Self {
            base: FilterBase::new(name, field_name, options),
        }
    }
}

fn parse_number(data: &FilterData) -> Option<Value> {
    match &data.value {
        serde_json::Value::Number(_) => Some(Value::from_json(&data.value)),
        serde_json::Value::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(i) => Some(Value::Int(i)),
                Err(_) => s.parse::<f64>().ok().filter(|f| f.is_finite()).map(Value::Float),
            }
        }
        _ => None,
    }
}

impl Filter for NumberFilter {
    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter_type(&self) -> FilterType {
        FilterType::Number
    }

    fn filter(&self, query: &mut dyn FilterQuery, data: &FilterData) -> GridResult<bool> {
        let Some(op) = data.operator(NumberOperator::default()) else {
            return Ok(false);
        };
        let Some(number) = parse_number(data) else {
            tracing::warn!("Filter '{}' ignores non-numeric value {}", self.name(), data.value);
            return Ok(false);
        };
        let param = query.bind(number);
        let op = op.as_operator();
        apply_where(query, self.condition(), Condition::new(self.field_name(), op, param));
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

    #[test]
    fn test_gte_from_request_string() {
        let mut filter = NumberFilter::new("age", "age", FilterOptions::default());
        let mut q = ProxyQuery::new(MemoryBackend::new(), QueryCmd::get("users"));
        filter
            .apply(&mut q, Some(&FilterData::with_type("gte", "30")))
            .unwrap();
        assert_eq!(q.cmd().to_sql(), "SELECT * FROM users WHERE age >= $1");
        assert_eq!(q.parameters(), &[Value::Int(30)]);
    }

    #[test]
    fn test_zero_is_a_value() {
        let mut filter = NumberFilter::new("stock", "stock", FilterOptions::default());
        let mut q = ProxyQuery::new(MemoryBackend::new(), QueryCmd::get("items"));
        filter.apply(&mut q, Some(&FilterData::new(0))).unwrap();
        assert!(filter.is_active());
        assert_eq!(q.parameters(), &[Value::Int(0)]);
    }

    #[test]
    fn test_not_a_number_stays_inactive() {
        let mut filter = NumberFilter::new("age", "age", FilterOptions::default());
        let mut q = ProxyQuery::new(MemoryBackend::new(), QueryCmd::get("users"));
        for value in [json!("old"), json!("NaN"), json!([1, 2])] {
            filter.apply(&mut q, Some(&FilterData::new(value))).unwrap();
            assert!(!filter.is_active());
        }
        assert!(q.cmd().cages.is_empty());
        assert!(q.parameters().is_empty());
    }
}
