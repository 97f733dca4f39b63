//! The list-screen orchestrator: filters, values and a pager over a base query.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ast::SortOrder;
use crate::config::GridSettings;
use crate::error::{GridError, GridResult};
use crate::filter::{Filter, FilterData};
use crate::pager::Pager;
use crate::query::{Backend, Hydration, ProxyQuery};
use crate::transpiler::is_identifier;

/// Submitted datagrid state: one entry per filter plus the reserved
/// `_page`, `_per_page`, `_sort_by` and `_sort_order` keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatagridValues {
    #[serde(rename = "_page", default, skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
    #[serde(rename = "_per_page", default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<usize>,
    #[serde(rename = "_sort_by", default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(rename = "_sort_order", default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    #[serde(flatten)]
    pub filters: BTreeMap<String, FilterData>,
}

impl DatagridValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&FilterData> {
        self.filters.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, data: FilterData) {
        self.filters.insert(name.into(), data);
    }

    /// Builder form of [`DatagridValues::set`].
    pub fn with(mut self, name: impl Into<String>, data: FilterData) -> Self {
        self.set(name, data);
        self
    }

    /// Parse flat request parameters.
    ///
    /// Handles formats like:
    /// - `filter[name][value]=foo`, `filter[name][type]=contains`
    /// - `filter[name][value][]=a` (repeated, builds a list)
    /// - `filter[_page]=2` or `_page=2`, likewise `_per_page`, `_sort_by`, `_sort_order`
    pub fn from_query_map<I, K, V>(pairs: I) -> GridResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut values = Self::default();

        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref());
            let path = match key.strip_prefix("filter[") {
                Some(rest) => bracket_path(rest),
                None if key.starts_with('_') => vec![key],
                None => continue,
            };

            match path.as_slice() {
                ["_page"] => values.page = parse_reserved(key, value)?,
                ["_per_page"] => values.per_page = parse_reserved(key, value)?,
                ["_sort_by"] => values.sort_by = Some(value.to_string()).filter(|v| !v.is_empty()),
                ["_sort_order"] => values.sort_order = parse_reserved(key, value)?,
                [name, "type"] => {
                    values.filters.entry(name.to_string()).or_default().kind = Some(value.to_string());
                }
                [name, "value"] => {
                    values.filters.entry(name.to_string()).or_default().value = value.into();
                }
                [name, "value", ""] => {
                    let data = values.filters.entry(name.to_string()).or_default();
                    match &mut data.value {
                        serde_json::Value::Array(items) => items.push(value.into()),
                        other => *other = serde_json::Value::Array(vec![value.into()]),
                    }
                }
                [name] if !name.starts_with('_') => {
                    values.filters.entry(name.to_string()).or_default().value = value.into();
                }
                _ => tracing::warn!("Ignoring request parameter '{}'", key),
            }
        }

        Ok(values)
    }
}

/// `a][b][c]` into `["a", "b", "c"]`.
fn bracket_path(rest: &str) -> Vec<&str> {
    rest.strip_suffix(']')
        .unwrap_or(rest)
        .split("][")
        .collect()
}

fn parse_reserved<T: std::str::FromStr>(key: &str, value: &str) -> GridResult<Option<T>> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    value
        .trim()
        .parse()
        .map(Some)
        .map_err(|_| GridError::InvalidValue(format!("{} = '{}'", key, value)))
}

/// Filters, values and a lazily built pager for one model class.
///
/// The pager reflects the filters and values present when it was built;
/// later changes need [`Datagrid::rebuild_pager`].
#[derive(Debug)]
pub struct Datagrid<B> {
    class: String,
    base_query: ProxyQuery<B>,
    filters: Vec<Box<dyn Filter>>,
    values: DatagridValues,
    settings: GridSettings,
    /// Fields `_sort_by` may name; `None` accepts any plain identifier
    sortable: Option<Vec<String>>,
    pager: Option<Pager<B>>,
}

impl<B: Backend> Datagrid<B> {
    pub fn new(
        class: impl Into<String>,
        base_query: ProxyQuery<B>,
        values: DatagridValues,
        settings: GridSettings,
    ) -> Self {
        Self {
            class: class.into(),
            base_query,
            filters: Vec::new(),
            values,
            settings,
            sortable: None,
            pager: None,
        }
    }

    /// Restrict `_sort_by` to these fields.
    pub fn set_sortable_fields<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sortable = Some(fields.into_iter().map(Into::into).collect());
    }

    pub fn is_sortable(&self, field: &str) -> bool {
        match &self.sortable {
            Some(fields) => fields.iter().any(|f| f == field),
            None => is_identifier(field),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn settings(&self) -> &GridSettings {
        &self.settings
    }

    pub fn base_query(&self) -> &ProxyQuery<B> {
        &self.base_query
    }

    pub fn add_filter(&mut self, filter: Box<dyn Filter>) -> GridResult<()> {
        if self.has_filter(filter.name()) {
            return Err(GridError::DuplicateFilter(filter.name().to_string()));
        }
        self.filters.push(filter);
        Ok(())
    }

    pub fn has_filter(&self, name: &str) -> bool {
        self.filters.iter().any(|f| f.name() == name)
    }

    pub fn filter(&self, name: &str) -> Option<&dyn Filter> {
        self.filters.iter().find(|f| f.name() == name).map(|f| &**f)
    }

    pub fn filter_mut(&mut self, name: &str) -> Option<&mut dyn Filter> {
        self.filters
            .iter_mut()
            .find(|f| f.name() == name)
            .map(|f| &mut **f as &mut dyn Filter)
    }

    pub fn remove_filter(&mut self, name: &str) -> Option<Box<dyn Filter>> {
        let position = self.filters.iter().position(|f| f.name() == name)?;
        Some(self.filters.remove(position))
    }

    /// Filters in registration order.
    pub fn filters(&self) -> impl Iterator<Item = &dyn Filter> {
        self.filters.iter().map(|f| &**f)
    }

    pub(crate) fn filters_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Filter>> {
        self.filters.iter_mut()
    }

    pub fn values(&self) -> &DatagridValues {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut DatagridValues {
        &mut self.values
    }

    /// Set the raw value of one filter.
    pub fn set_value(&mut self, name: &str, kind: Option<&str>, value: impl Into<serde_json::Value>) {
        self.values.set(
            name,
            FilterData {
                kind: kind.map(str::to_string),
                value: value.into(),
            },
        );
    }

    /// The requested sort field, when it is sortable.
    pub fn sort_by(&self) -> Option<&str> {
        let field = self.values.sort_by.as_deref()?;
        if self.is_sortable(field) {
            return Some(field);
        }
        tracing::warn!("Ignoring sort on '{}' for '{}'", field, self.class);
        None
    }

    pub fn sort_order(&self) -> SortOrder {
        self.values.sort_order.unwrap_or_default()
    }

    pub fn page(&self) -> usize {
        self.values.page.unwrap_or(1)
    }

    pub fn per_page(&self) -> usize {
        self.settings.per_page(self.values.per_page)
    }

    pub fn has_active_filters(&self) -> bool {
        self.filters.iter().any(|f| f.is_active())
    }

    /// Any filter the list screen should render.
    pub fn has_displayable_filters(&self) -> bool {
        self.filters.iter().any(|f| match f.options().show_filter {
            Some(shown) => shown,
            None => f.is_active(),
        })
    }

    /// The base query with every filter and the sort applied.
    pub fn query(&mut self) -> GridResult<ProxyQuery<B>> {
        let mut query = self.base_query.clone();
        for filter in self.filters.iter_mut() {
            let data = self.values.filters.get(filter.name());
            filter.apply(&mut query, data)?;
        }

        if let Some(field) = self.sort_by() {
            query.set_sort_by(Some(field.to_string()));
            query.set_sort_order(self.sort_order());
        }
        Ok(query)
    }

    pub fn has_pager(&self) -> bool {
        self.pager.is_some()
    }

    /// The pager, built and initialized on first use.
    pub fn pager(&mut self) -> GridResult<&mut Pager<B>> {
        let pager = match self.pager.take() {
            Some(pager) => pager,
            None => self.build_pager()?,
        };
        Ok(self.pager.insert(pager))
    }

    /// Drop the cached pager and build a new one from the current values.
    pub fn rebuild_pager(&mut self) -> GridResult<&mut Pager<B>> {
        self.pager = None;
        self.pager()
    }

    pub fn results(&mut self, hydration: Hydration) -> GridResult<&[serde_json::Value]> {
        self.pager()?.results(hydration)
    }

    fn build_pager(&mut self) -> GridResult<Pager<B>> {
        let query = self.query()?;
        let mut pager = Pager::new(query, self.per_page());
        pager.set_page(self.page());
        pager.set_max_page_links(self.settings.max_page_links);
        pager.init()?;
        tracing::debug!(
            "Built pager for '{}' with {} active filter(s)",
            self.class,
            self.filters.iter().filter(|f| f.is_active()).count()
        );
        Ok(pager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{LogicalOp, QueryCmd};
    use crate::filter::{BooleanFilter, FilterOptions, StringFilter};
    use crate::memory::MemoryBackend;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn datagrid(values: DatagridValues) -> Datagrid<MemoryBackend> {
        let backend = MemoryBackend::new();
        backend.insert_many(
            "users",
            (1..=30)
                .map(|id| json!({"id": id, "name": format!("user{:02}", id), "active": id % 3 != 0}))
                .collect(),
        );
        let settings = GridSettings::builder().per_page(10).per_page_options([5, 10]).build();
        let mut grid = Datagrid::new("App\\User", ProxyQuery::new(backend, QueryCmd::get("users")), values, settings);
        grid.add_filter(Box::new(StringFilter::new("name", "name", FilterOptions::default())))
            .unwrap();
        grid.add_filter(Box::new(BooleanFilter::new("active", "active", FilterOptions::default())))
            .unwrap();
        grid
    }

    #[test]
    fn test_from_query_map() {
        let values = DatagridValues::from_query_map([
            ("filter[name][type]", "starts_with"),
            ("filter[name][value]", "us"),
            ("filter[role][value][]", "admin"),
            ("filter[role][value][]", "editor"),
            ("filter[_page]", "2"),
            ("_per_page", "5"),
            ("filter[_sort_by]", "name"),
            ("filter[_sort_order]", "desc"),
            ("unrelated", "x"),
        ])
        .unwrap();

        assert_eq!(values.page, Some(2));
        assert_eq!(values.per_page, Some(5));
        assert_eq!(values.sort_by.as_deref(), Some("name"));
        assert_eq!(values.sort_order, Some(SortOrder::Desc));
        assert_eq!(values.get("name"), Some(&FilterData::with_type("starts_with", "us")));
        assert_eq!(values.get("role").map(|d| &d.value), Some(&json!(["admin", "editor"])));
    }

    #[test]
    fn test_bad_page_is_rejected() {
        let result = DatagridValues::from_query_map([("_page", "two")]);
        assert!(matches!(result, Err(GridError::InvalidValue(_))));
    }

    #[test]
    fn test_values_json_shape() {
        let values = DatagridValues {
            page: Some(3),
            ..Default::default()
        }
        .with("name", FilterData::new("foo"));
        let encoded = serde_json::to_value(&values).unwrap();
        assert_eq!(encoded, json!({"_page": 3, "name": {"value": "foo"}}));
        assert_eq!(serde_json::from_value::<DatagridValues>(encoded).unwrap(), values);
    }

    #[test]
    fn test_filters_and_pagination() {
        let values = DatagridValues {
            page: Some(2),
            per_page: Some(5),
            sort_by: Some("id".into()),
            sort_order: Some(SortOrder::Desc),
            ..Default::default()
        }
        .with("active", FilterData::new("no"));
        let mut grid = datagrid(values);

        let pager = grid.pager().unwrap();
        assert_eq!(pager.nb_results(), 10);
        assert_eq!(pager.last_page(), 2);
        let ids: Vec<_> = grid
            .results(Hydration::Object)
            .unwrap()
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![15, 12, 9, 6, 3]);
        assert!(grid.has_active_filters());
        assert!(grid.filter("active").unwrap().is_active());
        assert!(!grid.filter("name").unwrap().is_active());
    }

    #[test]
    fn test_per_page_outside_options_falls_back() {
        let mut grid = datagrid(DatagridValues {
            per_page: Some(1000),
            ..Default::default()
        });
        assert_eq!(grid.pager().unwrap().max_per_page(), 10);
    }

    #[test]
    fn test_duplicate_filter() {
        let mut grid = datagrid(DatagridValues::new());
        let err = grid
            .add_filter(Box::new(StringFilter::new("name", "email", FilterOptions::default())))
            .unwrap_err();
        assert!(matches!(err, GridError::DuplicateFilter(name) if name == "name"));
    }

    #[test]
    fn test_pager_is_cached_until_rebuilt() {
        let mut grid = datagrid(DatagridValues::new());
        assert!(!grid.has_pager());
        assert_eq!(grid.pager().unwrap().nb_results(), 30);

        grid.set_value("name", Some("equal"), "user07");
        assert_eq!(grid.pager().unwrap().nb_results(), 30);
        assert_eq!(grid.rebuild_pager().unwrap().nb_results(), 1);
    }

    #[test]
    fn test_or_filters_share_one_group() {
        let mut grid = datagrid(DatagridValues::new());
        grid.filter_mut("name").unwrap().set_condition(LogicalOp::Or);
        grid.add_filter(Box::new({
            let mut f = StringFilter::new("name_end", "name", FilterOptions::default());
            f.set_condition(LogicalOp::Or);
            f
        }))
        .unwrap();
        grid.set_value("name", Some("equal"), "user01");
        grid.set_value("name_end", Some("ends_with"), "03");
        grid.set_value("active", None, "yes");

        // user03 is inactive, so only user01 survives the AND
        let query = grid.query().unwrap();
        assert_eq!(query.count().unwrap(), 1);
        assert_eq!(query.cmd().filters().count(), 2);
    }

    #[test]
    fn test_displayable_filters() {
        let mut grid = datagrid(DatagridValues::new());
        assert!(!grid.has_displayable_filters());
        grid.filter_mut("name").unwrap().options_mut().show_filter = Some(true);
        assert!(grid.has_displayable_filters());
    }
}
