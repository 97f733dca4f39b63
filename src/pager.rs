//! Page arithmetic and result caching over a [`ProxyQuery`].

use crate::ast::Value;
use crate::error::GridResult;
use crate::query::{Backend, Hydration, ProxyQuery};

/// Stateful paginator.
///
/// Owns its own copy of the filtered query. [`Pager::init`] counts on a
/// further clone with the bounds cleared, then writes the page bounds into
/// the owned query.
#[derive(Debug, Clone)]
pub struct Pager<B> {
    query: ProxyQuery<B>,
    page: usize,
    max_per_page: usize,
    nb_results: usize,
    last_page: usize,
    max_page_links: usize,
    cursor: usize,
    /// The page starts past the last row; nothing to fetch
    beyond_end: bool,
    results: Option<(Hydration, Vec<serde_json::Value>)>,
}

impl<B: Backend> Pager<B> {
    /// A pager on page 1 with `max_per_page` rows per page.
    pub fn new(query: ProxyQuery<B>, max_per_page: usize) -> Self {
        Self {
            query,
            page: 1,
            max_per_page,
            nb_results: 0,
            last_page: 0,
            max_page_links: 0,
            cursor: 1,
            beyond_end: false,
            results: None,
        }
    }

    pub fn query(&self) -> &ProxyQuery<B> {
        &self.query
    }

    /// Mutable access; changes take effect at the next [`Pager::init`].
    pub fn query_mut(&mut self) -> &mut ProxyQuery<B> {
        &mut self.query
    }

    /// Parameters forwarded to the count and the fetch.
    pub fn parameters(&self) -> &[Value] {
        self.query.parameters()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// `0` disables pagination.
    pub fn set_page(&mut self, page: usize) {
        self.page = page;
    }

    pub fn max_per_page(&self) -> usize {
        self.max_per_page
    }

    /// `0` disables pagination.
    pub fn set_max_per_page(&mut self, max_per_page: usize) {
        self.max_per_page = max_per_page;
    }

    pub fn max_page_links(&self) -> usize {
        self.max_page_links
    }

    pub fn set_max_page_links(&mut self, links: usize) {
        self.max_page_links = links;
    }

    pub fn nb_results(&self) -> usize {
        self.nb_results
    }

    /// Count the matching rows and bound the query to the current page.
    pub fn init(&mut self) -> GridResult<()> {
        self.results = None;
        self.cursor = 1;
        self.beyond_end = false;

        let mut counting = self.query.clone();
        counting.set_first_result(0);
        counting.set_max_results(0);
        self.nb_results = counting.count()?;

        if self.page == 0 || self.max_per_page == 0 || self.nb_results == 0 {
            self.last_page = 0;
            self.query.set_first_result(0);
            self.query.set_max_results(0);
        } else {
            self.last_page = self.nb_results.div_ceil(self.max_per_page);
            let offset = (self.page - 1).saturating_mul(self.max_per_page);
            self.beyond_end = offset >= self.nb_results;
            self.query.set_first_result(offset);
            self.query.set_max_results(self.max_per_page);
        }

        tracing::info!(
            "Pager on '{}': page {}/{} ({} results, {} per page)",
            self.query.cmd().table,
            self.page,
            self.last_page,
            self.nb_results,
            self.max_per_page
        );
        Ok(())
    }

    /// Rows of the current page, fetched once per hydration mode.
    pub fn results(&mut self, hydration: Hydration) -> GridResult<&[serde_json::Value]> {
        let stale = !matches!(&self.results, Some((h, _)) if *h == hydration);
        if stale {
            let rows = if self.beyond_end {
                Vec::new()
            } else {
                self.query.execute(hydration)?
            };
            self.results = Some((hydration, rows));
        }
        Ok(self.results.as_ref().map(|(_, rows)| rows.as_slice()).unwrap_or_default())
    }

    /// Iterate the rows fetched by the last [`Pager::results`] call.
    pub fn iter(&self) -> impl Iterator<Item = &serde_json::Value> {
        self.results.iter().flat_map(|(_, rows)| rows.iter())
    }

    pub fn first_page(&self) -> usize {
        1
    }

    pub fn last_page(&self) -> usize {
        self.last_page
    }

    pub fn next_page(&self) -> usize {
        self.page.saturating_add(1).min(self.last_page)
    }

    pub fn previous_page(&self) -> usize {
        self.page.saturating_sub(1).max(self.first_page())
    }

    pub fn is_first_page(&self) -> bool {
        self.page == 1
    }

    pub fn is_last_page(&self) -> bool {
        self.page == self.last_page
    }

    pub fn have_to_paginate(&self) -> bool {
        self.max_per_page > 0 && self.nb_results > self.max_per_page
    }

    /// Up to `nb_links` page numbers around the current page.
    ///
    /// `0` falls back to [`Pager::max_page_links`].
    pub fn links(&self, nb_links: usize) -> Vec<usize> {
        let nb_links = if nb_links == 0 { self.max_page_links } else { nb_links };
        if nb_links == 0 || self.last_page == 0 {
            return Vec::new();
        }

        let centered = self.page.saturating_sub(nb_links / 2).max(1);
        let limit = (self.last_page + 1).saturating_sub(nb_links).max(1);
        let begin = centered.min(limit);
        (begin..begin.saturating_add(nb_links))
            .take_while(|page| *page <= self.last_page)
            .collect()
    }

    /// 1-based position of the first row on this page.
    pub fn first_indice(&self) -> usize {
        if self.page == 0 {
            1
        } else {
            (self.page - 1)
                .saturating_mul(self.max_per_page)
                .saturating_add(1)
        }
    }

    /// 1-based position of the last row on this page.
    pub fn last_indice(&self) -> usize {
        if self.page == 0 {
            return self.nb_results;
        }
        self.page
            .saturating_mul(self.max_per_page)
            .min(self.nb_results)
    }

    /// The row at a 1-based position in the whole result set.
    pub fn object_at(&self, position: usize) -> GridResult<Option<serde_json::Value>> {
        if position == 0 || position > self.nb_results {
            return Ok(None);
        }
        let mut single = self.query.clone();
        single.set_first_result(position - 1);
        single.set_max_results(1);
        Ok(single.execute(Hydration::Object)?.into_iter().next())
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor, clamped to the result set.
    pub fn set_cursor(&mut self, position: usize) {
        self.cursor = position.clamp(1, self.nb_results.max(1));
    }

    pub fn current(&self) -> GridResult<Option<serde_json::Value>> {
        self.object_at(self.cursor)
    }

    pub fn next_object(&self) -> GridResult<Option<serde_json::Value>> {
        self.object_at(self.cursor.saturating_add(1))
    }

    pub fn previous_object(&self) -> GridResult<Option<serde_json::Value>> {
        self.object_at(self.cursor.saturating_sub(1))
    }
}
