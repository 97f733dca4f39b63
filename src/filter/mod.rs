//! Filters: one toggleable predicate per field.
//!
//! A filter receives the raw [`FilterData`] submitted for it, decides whether
//! that value is active, and if so appends its condition to the query through
//! the [`FilterQuery`] surface. Conditions go to the AND chain or the query's
//! OR group depending on the filter's [`LogicalOp`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::ast::{Condition, LogicalOp};
use crate::error::{GridError, GridResult};
use crate::query::FilterQuery;

pub mod boolean;
pub mod callback;
pub mod choice;
pub mod date;
pub mod factory;
pub mod null;
pub mod number;
pub mod string;

pub use self::boolean::BooleanFilter;
pub use self::callback::{CallbackFilter, FilterCallback};
pub use self::choice::ChoiceFilter;
pub use self::date::DateFilter;
pub use self::factory::FilterFactory;
pub use self::null::NullFilter;
pub use self::number::NumberFilter;
pub use self::string::StringFilter;

/// The raw per-filter entry from request parameters: `{type?, value}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterData {
    /// Operator name, filter specific (`contains`, `gte`, ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl FilterData {
    pub fn new(value: impl Into<serde_json::Value>) -> Self {
        Self {
            kind: None,
            value: value.into(),
        }
    }

    pub fn with_type(kind: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            kind: Some(kind.into()),
            value: value.into(),
        }
    }

    /// `null`, `""`, `false` and empty lists carry no filter value.
    pub fn has_value(&self) -> bool {
        match &self.value {
            serde_json::Value::Null => false,
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::String(s) => !s.trim().is_empty(),
            serde_json::Value::Array(items) => !items.is_empty(),
            serde_json::Value::Object(map) => !map.is_empty(),
            serde_json::Value::Number(_) => true,
        }
    }

    /// The value as text, numbers included.
    pub fn text(&self) -> Option<String> {
        match &self.value {
            serde_json::Value::String(s) => Some(s.trim().to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Parse the operator name, falling back to `default` when absent or blank.
    ///
    /// An unknown name gives `None` and the filter stays inactive.
    pub fn operator<T: FromStr>(&self, default: T) -> Option<T> {
        match self.kind.as_deref().map(str::trim) {
            None | Some("") => Some(default),
            Some(kind) => {
                let parsed = kind.parse().ok();
                if parsed.is_none() {
                    tracing::warn!("Ignoring unknown filter operator '{}'", kind);
                }
                parsed
            }
        }
    }
}

/// Options shared by every filter type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    #[serde(default)]
    pub label: Option<String>,
    /// Participates in the cross-field search box
    #[serde(default)]
    pub global_search: bool,
    #[serde(default = "default_true")]
    pub case_sensitive: bool,
    /// `Some(true)` always shown, `Some(false)` hidden, `None` shown on demand
    #[serde(default)]
    pub show_filter: Option<bool>,
    /// Allowed values for choice filters
    #[serde(default)]
    pub choices: Vec<serde_json::Value>,
    /// Name of a callback registered with the [`FilterFactory`]
    #[serde(default)]
    pub callback: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

fn default_true() -> bool {
    true
}

impl FilterOptions {
    /// Set an option by name; unknown names land in `extra`.
    pub fn set(&mut self, key: &str, value: serde_json::Value) -> GridResult<()> {
        let invalid = |key: &str| GridError::InvalidValue(format!("option '{}'", key));
        match key {
            "label" => self.label = value.as_str().map(str::to_string),
            "global_search" => self.global_search = value.as_bool().ok_or_else(|| invalid(key))?,
            "case_sensitive" => self.case_sensitive = value.as_bool().ok_or_else(|| invalid(key))?,
            "show_filter" => self.show_filter = value.as_bool(),
            "choices" => {
                self.choices = serde_json::from_value(value).map_err(|_| invalid(key))?;
            }
            "callback" => self.callback = value.as_str().map(str::to_string),
            _ => {
                self.extra.insert(key.to_string(), value);
            }
        }
        Ok(())
    }
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            label: None,
            global_search: false,
            case_sensitive: true,
            show_filter: None,
            choices: Vec::new(),
            callback: None,
            extra: BTreeMap::new(),
        }
    }
}

/// The built-in filter types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    String,
    Boolean,
    Number,
    Choice,
    Date,
    Null,
    Callback,
}

impl FilterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterType::String => "string",
            FilterType::Boolean => "boolean",
            FilterType::Number => "number",
            FilterType::Choice => "choice",
            FilterType::Date => "date",
            FilterType::Null => "null",
            FilterType::Callback => "callback",
        }
    }
}

impl FromStr for FilterType {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(FilterType::String),
            "boolean" => Ok(FilterType::Boolean),
            "number" => Ok(FilterType::Number),
            "choice" => Ok(FilterType::Choice),
            "date" => Ok(FilterType::Date),
            "null" => Ok(FilterType::Null),
            "callback" => Ok(FilterType::Callback),
            _ => Err(GridError::UnknownFilterType(s.to_string())),
        }
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State every filter carries.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterBase {
    pub name: String,
    pub field_name: String,
    pub options: FilterOptions,
    pub condition: LogicalOp,
    pub value: Option<FilterData>,
    pub active: bool,
}

impl FilterBase {
    pub fn new(name: impl Into<String>, field_name: impl Into<String>, options: FilterOptions) -> Self {
        Self {
            name: name.into(),
            field_name: field_name.into(),
            options,
            condition: LogicalOp::And,
            value: None,
            active: false,
        }
    }
}

pub trait Filter: fmt::Debug + Send + Sync {
    fn base(&self) -> &FilterBase;

    fn base_mut(&mut self) -> &mut FilterBase;

    fn filter_type(&self) -> FilterType;

    /// Append this filter's predicate for a value that has content.
    ///
    /// Returns `false` when the value turned out to select everything and the
    /// query was left alone.
    fn filter(&self, query: &mut dyn FilterQuery, data: &FilterData) -> GridResult<bool>;

    fn clone_box(&self) -> Box<dyn Filter>;

    fn name(&self) -> &str {
        &self.base().name
    }

    fn field_name(&self) -> &str {
        &self.base().field_name
    }

    fn label(&self) -> &str {
        self.base().options.label.as_deref().unwrap_or(&self.base().name)
    }

    fn options(&self) -> &FilterOptions {
        &self.base().options
    }

    fn options_mut(&mut self) -> &mut FilterOptions {
        &mut self.base_mut().options
    }

    fn set_option(&mut self, key: &str, value: serde_json::Value) -> GridResult<()> {
        self.options_mut().set(key, value)
    }

    fn condition(&self) -> LogicalOp {
        self.base().condition
    }

    fn set_condition(&mut self, condition: LogicalOp) {
        self.base_mut().condition = condition;
    }

    fn value(&self) -> Option<&FilterData> {
        self.base().value.as_ref()
    }

    fn set_value(&mut self, data: Option<FilterData>) {
        self.base_mut().value = data;
    }

    fn is_active(&self) -> bool {
        self.base().active
    }

    fn is_search_enabled(&self) -> bool {
        self.base().options.global_search
    }

    /// Record `data` and apply it to `query` when it carries a value.
    fn apply(&mut self, query: &mut dyn FilterQuery, data: Option<&FilterData>) -> GridResult<()> {
        let base = self.base_mut();
        base.value = data.cloned();
        base.active = false;

        let Some(data) = data.filter(|d| d.has_value()) else {
            return Ok(());
        };
        let applied = self.filter(query, data)?;
        self.base_mut().active = applied;
        Ok(())
    }
}

impl Clone for Box<dyn Filter> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Route a condition to the AND chain or the OR group.
pub fn apply_where(query: &mut dyn FilterQuery, condition: LogicalOp, predicate: Condition) {
    match condition {
        LogicalOp::And => query.and_where(predicate),
        LogicalOp::Or => query.or_where(predicate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_has_value() {
        assert!(!FilterData::new(json!(null)).has_value());
        assert!(!FilterData::new("").has_value());
        assert!(!FilterData::new("   ").has_value());
        assert!(!FilterData::new(false).has_value());
        assert!(!FilterData::new(json!([])).has_value());
        assert!(FilterData::new(0).has_value());
        assert!(FilterData::new("foo").has_value());
    }

    #[test]
    fn test_filter_data_wire_shape() {
        let data: FilterData = serde_json::from_value(json!({"type": "contains", "value": "foo"})).unwrap();
        assert_eq!(data, FilterData::with_type("contains", "foo"));
        assert_eq!(
            serde_json::to_value(FilterData::new(3)).unwrap(),
            json!({"value": 3})
        );
    }

    #[test]
    fn test_options_defaults_from_toml() {
        let options: FilterOptions = toml::from_str("global_search = true\nplaceholder = \"Name\"").unwrap();
        assert!(options.global_search);
        assert!(options.case_sensitive);
        assert_eq!(options.extra.get("placeholder"), Some(&json!("Name")));
    }

    #[test]
    fn test_set_option() {
        let mut options = FilterOptions::default();
        options.set("case_sensitive", json!(false)).unwrap();
        options.set("callback", json!("by_domain")).unwrap();
        options.set("width", json!(3)).unwrap();
        assert!(!options.case_sensitive);
        assert_eq!(options.callback.as_deref(), Some("by_domain"));
        assert_eq!(options.extra["width"], json!(3));
        assert!(options.set("global_search", json!("yes")).is_err());
    }

    #[test]
    fn test_filter_type_names() {
        assert_eq!("choice".parse::<FilterType>().unwrap(), FilterType::Choice);
        assert!(matches!(
            "geo".parse::<FilterType>(),
            Err(GridError::UnknownFilterType(_))
        ));
    }
}
