//! Cross-field search box.

use std::collections::HashMap;

use crate::admin::Admin;
use crate::ast::LogicalOp;
use crate::error::GridResult;
use crate::filter::Filter;
use crate::model::ModelManager;
use crate::pager::Pager;

/// Runs one term through every `global_search` filter of an admin, OR-ed.
#[derive(Debug, Clone)]
pub struct SearchHandler {
    case_sensitive: bool,
    admin_search: HashMap<String, bool>,
}

impl Default for SearchHandler {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SearchHandler {
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            admin_search: HashMap::new(),
        }
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Turn search off (or back on) for one admin code.
    pub fn configure_admin_search(&mut self, admin_code: impl Into<String>, enabled: bool) {
        self.admin_search.insert(admin_code.into(), enabled);
    }

    pub fn is_admin_search_enabled(&self, admin_code: &str) -> bool {
        self.admin_search.get(admin_code).copied().unwrap_or(true)
    }

    /// Search `admin` for `term`.
    ///
    /// Returns `None`, leaving the datagrid untouched, when the admin has no
    /// searchable filter or search is disabled for it.
    pub fn search<'a, M: ModelManager>(
        &self,
        admin: &'a mut Admin<M>,
        term: &str,
        page: usize,
        per_page: usize,
    ) -> GridResult<Option<&'a mut Pager<M::Backend>>> {
        if !admin.is_search_enabled() || !self.is_admin_search_enabled(admin.code()) {
            tracing::debug!("Search disabled for '{}'", admin.code());
            return Ok(None);
        }

        let datagrid = admin.datagrid()?;
        let mut searched = Vec::new();
        for filter in datagrid.filters_mut() {
            if !filter.is_search_enabled() {
                continue;
            }
            filter.set_condition(LogicalOp::Or);
            filter.options_mut().case_sensitive = self.case_sensitive;
            searched.push(filter.name().to_string());
        }

        if searched.is_empty() {
            return Ok(None);
        }
        for name in &searched {
            datagrid.set_value(name, None, term);
        }
        tracing::info!("Searching '{}' in {} filter(s) of '{}'", term, searched.len(), datagrid.class());

        let pager = datagrid.rebuild_pager()?;
        pager.set_page(page);
        pager.set_max_per_page(per_page);
        pager.init()?;
        Ok(Some(pager))
    }
}
