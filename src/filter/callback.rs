use std::fmt;
use std::sync::Arc;

use crate::error::GridResult;
use crate::filter::{Filter, FilterBase, FilterData, FilterOptions, FilterType};
use crate::query::FilterQuery;

/// User-supplied predicate builder: `(query, field_name, data) -> applied`.
pub type FilterCallback =
    Arc<dyn Fn(&mut dyn FilterQuery, &str, &FilterData) -> GridResult<bool> + Send + Sync>;

/// Delegates predicate building to a registered callback.
#[derive(Clone)]
pub struct CallbackFilter {
    base: FilterBase,
    callback: FilterCallback,
}

impl CallbackFilter {
    pub fn new(
        name: impl Into<String>,
        field_name: impl Into<String>,
        options: FilterOptions,
        callback: FilterCallback,
    ) -> Self {
        Self {
            base: FilterBase::new(name, field_name, options),
            callback,
        }
    }
}

impl fmt::Debug for CallbackFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackFilter")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl Filter for CallbackFilter {
    fn base(&self) -> &FilterBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut FilterBase {
        &mut self.base
    }

    fn filter_type(&self) -> FilterType {
        FilterType::Callback
    }

    fn filter(&self, query: &mut dyn FilterQuery, data: &FilterData) -> GridResult<bool> {
        (self.callback)(query, self.field_name(), data)
    }

    fn clone_box(&self) -> Box<dyn Filter> {
        Box::new(self.clone())
    }
}
