//! Model metadata and the model manager seam.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ast::QueryCmd;
use crate::error::{GridError, GridResult};
use crate::query::{Backend, ProxyQuery};

/// Storage kind of a mapped field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Text,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub nullable: bool,
}

impl FieldMetadata {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
        }
    }
}

/// Mapping of one model class onto a table or collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub class: String,
    pub table: String,
    #[serde(default = "default_identifier")]
    pub identifier: String,
    #[serde(default)]
    pub fields: Vec<FieldMetadata>,
}

fn default_identifier() -> String {
    "id".to_string()
}

impl ModelMetadata {
    pub fn new(class: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            table: table.into(),
            identifier: default_identifier(),
            fields: Vec::new(),
        }
    }

    /// Builder: declare a field.
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldMetadata::new(name, kind));
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldMetadata> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        name == self.identifier || self.get_field(name).is_some()
    }
}

/// Builds base queries and serves metadata for model classes.
pub trait ModelManager {
    type Backend: Backend;

    fn backend(&self) -> &Self::Backend;

    fn metadata(&self, class: &str) -> GridResult<&ModelMetadata>;

    /// Unfiltered query scoped to the model's table.
    fn base_query(&self, class: &str) -> GridResult<ProxyQuery<Self::Backend>> {
        let metadata = self.metadata(class)?;
        Ok(ProxyQuery::new(
            self.backend().clone(),
            QueryCmd::get(metadata.table.clone()),
        ))
    }
}

/// Model manager over any backend, with metadata registered up front.
#[derive(Debug, Clone)]
pub struct ModelStore<B> {
    backend: B,
    models: HashMap<String, ModelMetadata>,
}

impl<B: Backend> ModelStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            models: HashMap::new(),
        }
    }

    pub fn register(&mut self, metadata: ModelMetadata) {
        tracing::debug!("Registered model '{}' on '{}'", metadata.class, metadata.table);
        self.models.insert(metadata.class.clone(), metadata);
    }

    /// Builder form of [`ModelStore::register`].
    pub fn with_model(mut self, metadata: ModelMetadata) -> Self {
        self.register(metadata);
        self
    }
}

impl<B: Backend> ModelManager for ModelStore<B> {
    type Backend = B;

    fn backend(&self) -> &B {
        &self.backend
    }

    fn metadata(&self, class: &str) -> GridResult<&ModelMetadata> {
        self.models
            .get(class)
            .ok_or_else(|| GridError::UnknownModel(class.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    #[test]
    fn test_base_query_targets_table() {
        let models = ModelStore::new(MemoryBackend::new())
            .with_model(ModelMetadata::new("App\\Post", "posts").field("title", FieldKind::String));
        let query = models.base_query("App\\Post").unwrap();
        assert_eq!(query.cmd().table, "posts");
        assert!(query.cmd().cages.is_empty());
    }

    #[test]
    fn test_unknown_model() {
        let models = ModelStore::new(MemoryBackend::new());
        assert!(matches!(
            models.base_query("App\\Missing"),
            Err(GridError::UnknownModel(_))
        ));
    }

    #[test]
    fn test_identifier_counts_as_field() {
        let meta = ModelMetadata::new("App\\Post", "posts").field("title", FieldKind::String);
        assert!(meta.has_field("id"));
        assert!(meta.has_field("title"));
        assert!(!meta.has_field("body"));
    }
}
