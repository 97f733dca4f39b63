//! Filter construction by type name.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{GridError, GridResult};
use crate::filter::{
    BooleanFilter, CallbackFilter, ChoiceFilter, DateFilter, Filter, FilterCallback, FilterData,
    FilterOptions, FilterType, NullFilter, NumberFilter, StringFilter,
};
use crate::query::FilterQuery;

/// Builds a filter from `(name, field_name, options)`.
pub type FilterConstructor = fn(&str, &str, FilterOptions) -> Box<dyn Filter>;

/// Registry of filter constructors and named callbacks.
#[derive(Clone)]
pub struct FilterFactory {
    types: HashMap<FilterType, FilterConstructor>,
    callbacks: HashMap<String, FilterCallback>,
}

impl std::fmt::Debug for FilterFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut callbacks: Vec<_> = self.callbacks.keys().collect();
        callbacks.sort();
        f.debug_struct("FilterFactory")
            .field("types", &self.types.len())
            .field("callbacks", &callbacks)
            .finish()
    }
}

impl Default for FilterFactory {
    fn default() -> Self {
        let mut factory = Self::empty();
        factory.register_type(FilterType::String, |n, f, o| Box::new(StringFilter::new(n, f, o)));
        factory.register_type(FilterType::Boolean, |n, f, o| Box::new(BooleanFilter::new(n, f, o)));
        factory.register_type(FilterType::Number, |n, f, o| Box::new(NumberFilter::new(n, f, o)));
        factory.register_type(FilterType::Choice, |n, f, o| Box::new(ChoiceFilter::new(n, f, o)));
        factory.register_type(FilterType::Date, |n, f, o| Box::new(DateFilter::new(n, f, o)));
        factory.register_type(FilterType::Null, |n, f, o| Box::new(NullFilter::new(n, f, o)));
        factory
    }
}

impl FilterFactory {
    /// The built-in filter types.
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory with nothing registered.
    pub fn empty() -> Self {
        Self {
            types: HashMap::new(),
            callbacks: HashMap::new(),
        }
    }

    pub fn register_type(&mut self, filter_type: FilterType, constructor: FilterConstructor) {
        self.types.insert(filter_type, constructor);
    }

    /// Register a callback that `callback` filters can name in their options.
    pub fn register_callback<F>(&mut self, name: impl Into<String>, callback: F)
    where
        F: Fn(&mut dyn FilterQuery, &str, &FilterData) -> GridResult<bool> + Send + Sync + 'static,
    {
        self.callbacks.insert(name.into(), Arc::new(callback));
    }

    pub fn has_callback(&self, name: &str) -> bool {
        self.callbacks.contains_key(name)
    }

    /// Create a filter.
    ///
    /// Callback filters need a `callback` option naming a registered
    /// callback; anything else is reported as a missing option.
    pub fn create(
        &self,
        name: &str,
        filter_type: FilterType,
        field_name: &str,
        options: FilterOptions,
    ) -> GridResult<Box<dyn Filter>> {
        if filter_type == FilterType::Callback {
            let callback = options
                .callback
                .as_deref()
                .and_then(|key| self.callbacks.get(key))
                .cloned()
                .ok_or_else(|| GridError::missing(name, "callback"))?;
            return Ok(Box::new(CallbackFilter::new(name, field_name, options, callback)));
        }

        let constructor = self
            .types
            .get(&filter_type)
            .ok_or_else(|| GridError::UnknownFilterType(filter_type.to_string()))?;
        tracing::debug!("Creating {} filter '{}' on '{}'", filter_type, name, field_name);
        Ok(constructor(name, field_name, options))
    }
}
