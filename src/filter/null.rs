use crate::ast::{Condition, Operator, Value};
use crate::error::GridResult;
use crate::filter::{apply_where, Filter, FilterBase, FilterData, FilterOptions, FilterType};
use crate::query::FilterQuery;

/// `yes` selects rows where the field is NULL, `no` where it is set.
///
/// The `inverse` option swaps the two.
#[derive(Debug, Clone)]
pub struct NullFilter {
    base: FilterBase,
}

impl NullFilter {
    pub fn new(name: impl Into<String>, field_name: impl Into<String>, options: FilterOptions) -> Self {
        Self {
            base: FilterBase::new(name, field_name, options),
        }
    }

    fn inverse(&self) -> bool {
        self.options()
            .extra
            .get("inverse")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }
}

impl Filter for NullFilter {
    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter_type(&self) -> FilterType {
        FilterType::Null
    }

    fn filter(&self, query: &mut dyn FilterQuery, data: &FilterData) -> GridResult<bool> {
        let is_null = match data.text().as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("yes" | "true" | "1") => true,
            Some("no" | "2") => false,
            _ => return Ok(false),
        };
        let op = if is_null != self.inverse() {
            Operator::IsNull
        } else {
            Operator::IsNotNull
        };
        apply_where(
            query,
            self.condition(),
            Condition::new(self.field_name(), op, Value::Null),
        );
        Ok(true)
    }

    fn clone_box(&self) -> Box<dyn Filter> {
        Box::new(self.clone())
    }
}
