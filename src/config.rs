//! admingrid configuration (`admingrid.toml`).
//!
//! ```toml
//! [grid]
//! default_per_page = 25
//! per_page_options = [10, 25, 50]
//!
//! [database]
//! url = "sqlite://blog.db"
//!
//! [[admin]]
//! code = "admin.post"
//! class = "Blog\\Post"
//! table = "posts"
//! fixture = "posts.json"
//! fields = [{ name = "title", kind = "string" }]
//!
//! [[admin.filter]]
//! name = "title"
//! options = { global_search = true }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::admin::AdminDefinition;
use crate::error::{GridError, GridResult};
use crate::model::{FieldMetadata, ModelMetadata};

/// File name looked up in the working and config directories.
pub const CONFIG_FILE: &str = "admingrid.toml";

/// Environment variable pointing at a config file.
pub const CONFIG_ENV: &str = "ADMINGRID_CONFIG";

/// Pagination and search defaults shared by every admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    pub default_per_page: usize,
    /// `_per_page` values a request may pick
    pub per_page_options: Vec<usize>,
    pub max_page_links: usize,
    /// Remember filter values between requests
    pub persist_filters: bool,
    pub search_case_sensitive: bool,
    /// JSON file backing persisted filters, defaults to the user cache dir
    pub session_file: Option<PathBuf>,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            default_per_page: 25,
            per_page_options: vec![10, 25, 50, 100, 250],
            max_page_links: 5,
            persist_filters: false,
            search_case_sensitive: true,
            session_file: None,
        }
    }
}

impl GridSettings {
    /// Create a new settings builder
    pub fn builder() -> GridSettingsBuilder {
        GridSettingsBuilder::default()
    }

    /// The requested page size when it is allowed, else the default.
    pub fn per_page(&self, requested: Option<usize>) -> usize {
        match requested {
            Some(n) if self.per_page_options.contains(&n) => n,
            Some(n) => {
                tracing::warn!("Ignoring per-page value {} (allowed: {:?})", n, self.per_page_options);
                self.default_per_page
            }
            None => self.default_per_page,
        }
    }
}

/// Builder for GridSettings
#[derive(Debug, Default)]
pub struct GridSettingsBuilder {
    settings: GridSettings,
}

impl GridSettingsBuilder {
    pub fn per_page(mut self, per_page: usize) -> Self {
        self.settings.default_per_page = per_page;
        self
    }

    pub fn per_page_options(mut self, options: impl IntoIterator<Item = usize>) -> Self {
        self.settings.per_page_options = options.into_iter().collect();
        self
    }

    pub fn max_page_links(mut self, links: usize) -> Self {
        self.settings.max_page_links = links;
        self
    }

    pub fn persist_filters(mut self, persist: bool) -> Self {
        self.settings.persist_filters = persist;
        self
    }

    pub fn search_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.settings.search_case_sensitive = case_sensitive;
        self
    }

    pub fn build(self) -> GridSettings {
        self.settings
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL; admins read from fixtures when absent
    pub url: Option<String>,
}

/// One `[[admin]]` entry: the admin definition plus its model mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(flatten)]
    pub definition: AdminDefinition,
    pub table: String,
    #[serde(default = "default_identifier")]
    pub identifier: String,
    #[serde(default)]
    pub fields: Vec<FieldMetadata>,
    /// JSON array of documents loaded into the memory backend
    #[serde(default)]
    pub fixture: Option<PathBuf>,
}

fn default_identifier() -> String {
    "id".to_string()
}

impl AdminConfig {
    pub fn model(&self) -> ModelMetadata {
        ModelMetadata {
            class: self.definition.class.clone(),
            table: self.table.clone(),
            identifier: self.identifier.clone(),
            fields: self.fields.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default)]
    pub grid: GridSettings,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default, rename = "admin")]
    pub admins: Vec<AdminConfig>,
    /// File this configuration was read from
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl GridConfig {
    pub fn from_toml(content: &str) -> GridResult<Self> {
        let config: GridConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> GridResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.source = Some(path.to_path_buf());
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from `explicit`, `$ADMINGRID_CONFIG`, `./admingrid.toml` or the
    /// user config dir, in that order. No file at all gives the defaults.
    pub fn load(explicit: Option<&Path>) -> GridResult<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match Self::locate() {
            Some(path) => Self::from_file(&path),
            None => {
                tracing::debug!("No {} found, using defaults", CONFIG_FILE);
                Ok(Self::default())
            }
        }
    }

    fn locate() -> Option<PathBuf> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let local = Some(PathBuf::from(CONFIG_FILE));
        let user = dirs::config_dir().map(|dir| dir.join("admingrid").join(CONFIG_FILE));
        [from_env, local, user]
            .into_iter()
            .flatten()
            .find(|path| path.is_file())
    }

    pub fn admin(&self, code: &str) -> GridResult<&AdminConfig> {
        self.admins
            .iter()
            .find(|a| a.definition.code == code)
            .ok_or_else(|| GridError::Config(format!("no admin with code '{}'", code)))
    }

    /// Resolve a path relative to the directory of the config file.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        match self.source.as_deref().and_then(Path::parent) {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Where persisted filter values live.
    pub fn session_file(&self) -> PathBuf {
        match &self.grid.session_file {
            Some(path) => self.resolve(path),
            None => dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("admingrid")
                .join("filters.json"),
        }
    }

    fn validate(&self) -> GridResult<()> {
        if self.grid.default_per_page == 0 {
            return Err(GridError::Config("default_per_page must be positive".into()));
        }
        let mut codes: Vec<&str> = self.admins.iter().map(|a| a.definition.code.as_str()).collect();
        codes.sort_unstable();
        if let Some(pair) = codes.windows(2).find(|w| w[0] == w[1]) {
            return Err(GridError::Config(format!("admin code '{}' is defined twice", pair[0])));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterType;
    use crate::model::FieldKind;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"
[grid]
default_per_page = 10
per_page_options = [10, 20]

[database]
url = "sqlite::memory:"

[[admin]]
code = "admin.user"
class = "App\\User"
table = "users"
fixture = "users.json"
fields = [
    { name = "name", kind = "string" },
    { name = "age", kind = "integer", nullable = true },
]

[[admin.filter]]
name = "name"
options = { global_search = true }

[[admin.filter]]
name = "age"
type = "number"
"#;

    #[test]
    fn test_parse_sample() {
        let config = GridConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.grid.default_per_page, 10);
        assert_eq!(config.grid.max_page_links, 5);
        assert_eq!(config.database.url.as_deref(), Some("sqlite::memory:"));

        let admin = config.admin("admin.user").unwrap();
        assert_eq!(admin.definition.filters.len(), 2);
        assert!(admin.definition.filters[0].options.global_search);
        assert_eq!(admin.definition.filters[1].filter_type, Some(FilterType::Number));

        let model = admin.model();
        assert_eq!(model.table, "users");
        assert_eq!(model.get_field("age").map(|f| f.kind), Some(FieldKind::Integer));
    }

    #[test]
    fn test_per_page_must_be_allowed() {
        let settings = GridSettings::builder().per_page(25).per_page_options([25, 50]).build();
        assert_eq!(settings.per_page(Some(50)), 50);
        assert_eq!(settings.per_page(Some(7)), 25);
        assert_eq!(settings.per_page(None), 25);
    }

    #[test]
    fn test_duplicate_admin_codes() {
        let toml = r#"
[[admin]]
code = "a"
class = "A"
table = "a"

[[admin]]
code = "a"
class = "B"
table = "b"
"#;
        assert!(matches!(GridConfig::from_toml(toml), Err(GridError::Config(_))));
    }

    #[test]
    fn test_resolve_relative_to_source() {
        let mut config = GridConfig::default();
        assert_eq!(config.resolve(Path::new("x.json")), PathBuf::from("x.json"));
        config.source = Some(PathBuf::from("/etc/admingrid/admingrid.toml"));
        assert_eq!(
            config.resolve(Path::new("x.json")),
            PathBuf::from("/etc/admingrid/x.json")
        );
    }
}
