use chrono::NaiveDate;
use std::str::FromStr;

use crate::ast::{Condition, Operator, Value};
use crate::error::GridResult;
use crate::filter::{apply_where, Filter, FilterBase, FilterData, FilterOptions, FilterType};
use crate::query::FilterQuery;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateOperator {
    #[default]
    Equal,
    GreaterThan,
    GreaterEqual,
    LessThan,
    LessEqual,
}

impl FromStr for DateOperator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eq" | "equal" => Ok(DateOperator::Equal),
            "gt" | "after" => Ok(DateOperator::GreaterThan),
            "gte" => Ok(DateOperator::GreaterEqual),
            "lt" | "before" => Ok(DateOperator::LessThan),
            "lte" => Ok(DateOperator::LessEqual),
            _ => Err(()),
        }
    }
}

/// Calendar date comparison against ISO `YYYY-MM-DD` values.
#[derive(Debug, Clone)]
pub struct DateFilter {
    base: FilterBase,
}

impl DateFilter {
    pub fn new(name: impl Into<String>, field_name: impl Into<String>, options: FilterOptions) -> Self {
        Self {
            base: FilterBase::new(name, field_name, options),
        }
    }
}

impl Filter for DateFilter {
    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter_type(&self) -> FilterType {
        FilterType::Date
    }

    fn filter(&self, query: &mut dyn FilterQuery, data: &FilterData) -> GridResult<bool> {
        let Some(date) = data
            .text()
            .and_then(|raw| NaiveDate::parse_from_str(&raw, DATE_FORMAT).ok())
        else {
            tracing::warn!("Filter '{}' ignores invalid date {}", self.name(), data.value);
            return Ok(false);
        };
        let Some(operator) = data.operator(DateOperator::default()) else {
            return Ok(false);
        };

        let op = match operator {
            DateOperator::Equal => Operator::Eq,
            DateOperator::GreaterThan => Operator::Gt,
            DateOperator::GreaterEqual => Operator::Gte,
            DateOperator::LessThan => Operator::Lt,
            DateOperator::LessEqual => Operator::Lte,
        };
        let param = query.bind(Value::String(date.format(DATE_FORMAT).to_string()));
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
    use crate::query::{Hydration, ProxyQuery};
    use serde_json::json;

    #[test]
    fn test_before_date_on_documents() {
        let backend = MemoryBackend::new();
        backend.insert_many(
            "orders",
            vec![
                json!({"id": 1, "placed_on": "2024-01-31"}),
                json!({"id": 2, "placed_on": "2024-02-01"}),
                json!({"id": 3, "placed_on": "2023-12-24"}),
            ],
        );
        let mut filter = DateFilter::new("placed", "placed_on", FilterOptions::default());
        let mut q = ProxyQuery::new(backend, QueryCmd::get("orders"));
        filter
            .apply(&mut q, Some(&FilterData::with_type("lt", "2024-02-01")))
            .unwrap();
        assert_eq!(q.execute(Hydration::Object).unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_date_stays_inactive() {
        let mut filter = DateFilter::new("placed", "placed_on", FilterOptions::default());
        let mut q = ProxyQuery::new(MemoryBackend::new(), QueryCmd::get("orders"));
        filter
            .apply(&mut q, Some(&FilterData::new("2024-13-01")))
            .unwrap();
        assert!(!filter.is_active());
        assert!(q.cmd().cages.is_empty());
    }
}
