use std::str::FromStr;

use crate::ast::{Condition, Operator, Value};
use crate::error::GridResult;
use crate::filter::{apply_where, Filter, FilterBase, FilterData, FilterOptions, FilterType};
use crate::query::FilterQuery;

/// Operators a string filter accepts in the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringOperator {
    #[default]
    Contains,
    NotContains,
    Equal,
    StartsWith,
    EndsWith,
}

impl FromStr for StringOperator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "contains" | "1" => Ok(StringOperator::Contains),
            "not_contains" | "2" => Ok(StringOperator::NotContains),
            "equal" | "3" => Ok(StringOperator::Equal),
            "starts_with" | "4" => Ok(StringOperator::StartsWith),
            "ends_with" | "5" => Ok(StringOperator::EndsWith),
            _ => Err(()),
        }
    }
}

/// Text match on a single field, case sensitivity from the options.
#[derive(Debug, Clone)]
pub struct StringFilter {
    base: FilterBase,
}

impl StringFilter {
    pub fn new(name: impl Into<String>, field_name: impl Into<String>, options: FilterOptions) -> Self {
        Self {
            base: FilterBase::new(name, field_name, options),
        }
    }
}

impl Filter for StringFilter {
    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter_type(&self) -> FilterType {
        FilterType::String
    }

    fn filter(&self, query: &mut dyn FilterQuery, data: &FilterData) -> GridResult<bool> {
        let Some(text) = data.text().filter(|t| !t.is_empty()) else {
            return Ok(false);
        };
        let Some(operator) = data.operator(StringOperator::default()) else {
            return Ok(false);
        };
        let op = match operator {
            StringOperator::Contains => Operator::Contains,
            StringOperator::NotContains => Operator::NotContains,
            StringOperator::Equal => Operator::Eq,
            StringOperator::StartsWith => Operator::StartsWith,
            StringOperator::EndsWith => Operator::EndsWith,
        };

        let param = query.bind(Value::String(text));
        let predicate = Condition::new(self.field_name(), op, param)
            .case_sensitive(self.options().case_sensitive);
        apply_where(query, self.condition(), predicate);
        Ok(true)
    }

    fn clone_box(&self) -> Box<dyn Filter> {
        Box::new(self.clone())
    }
}
