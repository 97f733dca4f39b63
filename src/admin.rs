//! The admin: one model class, its validated filters, and its datagrid.

use serde::{Deserialize, Serialize};

use crate::ast::LogicalOp;
use crate::config::GridSettings;
use crate::datagrid::{Datagrid, DatagridValues};
use crate::error::{GridError, GridResult};
use crate::filter::{Filter, FilterFactory, FilterOptions, FilterType};
use crate::guesser::TypeGuesserChain;
use crate::model::ModelManager;
use crate::persister::FilterPersister;

/// Declaration of one filter on an admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDefinition {
    pub name: String,
    /// Mapped field, defaults to `name`
    #[serde(default)]
    pub field: Option<String>,
    /// Guessed from the field metadata when absent
    #[serde(rename = "type", default)]
    pub filter_type: Option<FilterType>,
    #[serde(default)]
    pub condition: LogicalOp,
    #[serde(default)]
    pub options: FilterOptions,
}

impl FilterDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: None,
            filter_type: None,
            condition: LogicalOp::And,
            options: FilterOptions::default(),
        }
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn filter_type(mut self, filter_type: FilterType) -> Self {
        self.filter_type = Some(filter_type);
        self
    }

    pub fn options(mut self, options: FilterOptions) -> Self {
        self.options = options;
        self
    }

    pub fn field_name(&self) -> &str {
        self.field.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminDefinition {
    /// Unique admin code, also the persistence key prefix
    pub code: String,
    /// Model class managed by this admin
    pub class: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, rename = "filter")]
    pub filters: Vec<FilterDefinition>,
    /// Take part in global search
    #[serde(default = "default_true")]
    pub search: bool,
}

fn default_true() -> bool {
    true
}

impl AdminDefinition {
    pub fn new(code: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            class: class.into(),
            label: None,
            filters: Vec::new(),
            search: true,
        }
    }

    /// Builder: declare a filter.
    pub fn filter(mut self, filter: FilterDefinition) -> Self {
        self.filters.push(filter);
        self
    }
}

/// An admin over a model manager.
///
/// Filters are built and checked once, in [`Admin::new`]; every datagrid
/// gets clones of them.
#[derive(Debug)]
pub struct Admin<M: ModelManager> {
    definition: AdminDefinition,
    manager: M,
    filters: Vec<Box<dyn Filter>>,
    settings: GridSettings,
    datagrid: Option<Datagrid<M::Backend>>,
}

impl<M: ModelManager> Admin<M> {
    pub fn new(
        definition: AdminDefinition,
        manager: M,
        factory: &FilterFactory,
        guesser: &TypeGuesserChain,
    ) -> GridResult<Self> {
        let metadata = manager.metadata(&definition.class)?;
        let mut filters: Vec<Box<dyn Filter>> = Vec::with_capacity(definition.filters.len());

        for def in &definition.filters {
            if filters.iter().any(|f| f.name() == def.name) {
                return Err(GridError::DuplicateFilter(def.name.clone()));
            }

            let field = def.field_name();
            let is_callback = def.filter_type == Some(FilterType::Callback);
            if !is_callback && !metadata.has_field(field) {
                return Err(GridError::unmapped(&definition.class, field));
            }

            let (filter_type, options) = match def.filter_type {
                Some(filter_type) => (filter_type, def.options.clone()),
                None => {
                    let guess = guesser.guess(metadata, field).ok_or_else(|| {
                        GridError::Config(format!(
                            "cannot guess a filter type for '{}' on '{}'",
                            field, definition.class
                        ))
                    })?;
                    (guess.filter_type, merge_options(guess.options, &def.options))
                }
            };

            let mut filter = factory.create(&def.name, filter_type, field, options)?;
            filter.set_condition(def.condition);
            filters.push(filter);
        }

        tracing::info!(
            "Admin '{}' ready with {} filter(s)",
            definition.code,
            filters.len()
        );
        Ok(Self {
            definition,
            manager,
            filters,
            settings: GridSettings::default(),
            datagrid: None,
        })
    }

    /// Builder: pagination defaults for this admin's datagrids.
    pub fn with_settings(mut self, settings: GridSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn code(&self) -> &str {
        &self.definition.code
    }

    pub fn class(&self) -> &str {
        &self.definition.class
    }

    pub fn label(&self) -> &str {
        self.definition.label.as_deref().unwrap_or(&self.definition.code)
    }

    pub fn definition(&self) -> &AdminDefinition {
        &self.definition
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    pub fn settings(&self) -> &GridSettings {
        &self.settings
    }

    pub fn is_search_enabled(&self) -> bool {
        self.definition.search
    }

    /// The configured filters, before any value is applied.
    pub fn filters(&self) -> impl Iterator<Item = &dyn Filter> {
        self.filters.iter().map(|f| &**f)
    }

    /// Replace the current datagrid with a fresh one over `values`.
    pub fn build_datagrid(&mut self, values: DatagridValues) -> GridResult<&mut Datagrid<M::Backend>> {
        let base_query = self.manager.base_query(&self.definition.class)?;
        let metadata = self.manager.metadata(&self.definition.class)?;
        let mut datagrid = Datagrid::new(
            self.definition.class.clone(),
            base_query,
            values,
            self.settings.clone(),
        );
        datagrid.set_sortable_fields(
            std::iter::once(metadata.identifier.as_str())
                .chain(metadata.fields.iter().map(|f| f.name.as_str())),
        );
        for filter in &self.filters {
            datagrid.add_filter(filter.clone())?;
        }
        Ok(self.datagrid.insert(datagrid))
    }

    /// The current datagrid, built with empty values when there is none.
    pub fn datagrid(&mut self) -> GridResult<&mut Datagrid<M::Backend>> {
        match self.datagrid.take() {
            Some(datagrid) => Ok(self.datagrid.insert(datagrid)),
            None => self.build_datagrid(DatagridValues::default()),
        }
    }

    /// Combine request values with persisted ones.
    ///
    /// A reset clears the stored state. An empty request restores what was
    /// stored, anything else is stored for next time.
    pub fn filter_parameters(
        &self,
        request: DatagridValues,
        reset: bool,
        persister: Option<&dyn FilterPersister>,
    ) -> GridResult<DatagridValues> {
        let Some(persister) = persister else {
            return Ok(request);
        };
        if reset {
            persister.reset(self.code())?;
            return Ok(DatagridValues::default());
        }
        if request.is_empty() {
            return persister.get(self.code());
        }
        persister.set(self.code(), &request)?;
        Ok(request)
    }
}

/// Explicit options override guessed ones that still have their defaults.
fn merge_options(guessed: FilterOptions, explicit: &FilterOptions) -> FilterOptions {
    let defaults = FilterOptions::default();
    if guessed == defaults {
        return explicit.clone();
    }
    let mut merged = explicit.clone();
    if merged.label.is_none() {
        merged.label = guessed.label;
    }
    if merged.choices.is_empty() {
        merged.choices = guessed.choices;
    }
    for (key, value) in guessed.extra {
        merged.extra.entry(key).or_insert(value);
    }
    merged
}
