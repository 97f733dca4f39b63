//! # admingrid: admin list screens without the boilerplate
//!
//! admingrid is the list-screen pipeline of a CRUD admin: per-field filters,
//! pagination, a cross-field search box and filter state remembered between
//! requests, over SQL databases (through sqlx) or in-memory JSON documents.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use admingrid::prelude::*;
//!
//! let backend = SqlBackend::connect("sqlite://blog.db")?;
//! let models = ModelStore::new(backend)
//!     .with_model(ModelMetadata::new("Blog\\Post", "posts").field("title", FieldKind::String));
//!
//! let definition = AdminDefinition::new("admin.post", "Blog\\Post")
//!     .filter(FilterDefinition::new("title"));
//! let mut admin = Admin::new(definition, models, &FilterFactory::new(), &TypeGuesserChain::default())?;
//!
//! let values = DatagridValues::from_query_map([("filter[title][value]", "rust"), ("_page", "2")])?;
//! let datagrid = admin.build_datagrid(values)?;
//! let pager = datagrid.pager()?;
//! println!("page {} of {}", pager.page(), pager.last_page());
//! ```
//!
//! ## Pipeline
//!
//! | Stage            | Type                         |
//! |------------------|------------------------------|
//! | request values   | [`datagrid::DatagridValues`] |
//! | predicates       | [`filter::Filter`]           |
//! | query            | [`query::ProxyQuery`]        |
//! | page             | [`pager::Pager`]             |
//! | orchestration    | [`datagrid::Datagrid`]       |

pub mod admin;
pub mod ast;
pub mod config;
pub mod datagrid;
pub mod engine;
pub mod error;
pub mod filter;
pub mod guesser;
pub mod memory;
pub mod model;
pub mod pager;
pub mod parser;
pub mod persister;
pub mod query;
pub mod search;
pub mod transpiler;

pub mod prelude {
    pub use crate::admin::{Admin, AdminDefinition, FilterDefinition};
    pub use crate::ast::*;
    pub use crate::config::{GridConfig, GridSettings};
    pub use crate::datagrid::{Datagrid, DatagridValues};
    pub use crate::engine::SqlBackend;
    pub use crate::error::*;
    pub use crate::filter::{Filter, FilterData, FilterFactory, FilterOptions, FilterType};
    pub use crate::guesser::{TypeGuesser, TypeGuesserChain};
    pub use crate::memory::MemoryBackend;
    pub use crate::model::{FieldKind, ModelManager, ModelMetadata, ModelStore};
    pub use crate::pager::Pager;
    pub use crate::parser::parse;
    pub use crate::persister::{
        FileSession, FilterPersister, MemorySession, SessionFilterPersister, SessionStore,
    };
    pub use crate::query::{Backend, FilterQuery, Hydration, ProxyQuery};
    pub use crate::search::SearchHandler;
    pub use crate::transpiler::{Dialect, ToSql};
}

/// Parse a command-line filter expression.
///
/// # Example
///
/// ```
/// use admingrid::parse;
///
/// let expr = parse("age>=30").unwrap();
/// assert_eq!(expr.name, "age");
/// assert_eq!(expr.data.kind.as_deref(), Some("gte"));
/// ```
pub fn parse(input: &str) -> Result<parser::FilterExpression, error::GridError> {
    parser::parse(input)
}
