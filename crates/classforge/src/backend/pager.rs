//! Lazy page-by-page enumeration of list operations.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::model::{Group, Repository, User};

use super::errors::Result;
use super::types::{Backend, Page, PageRequest, RepositoryFilter};

/// An entity that a backend can list page by page.
#[async_trait]
pub trait Listing: Sized + Send {
    /// Filter carried between pages.
    type Query: Send + Sync;

    async fn fetch_page(
        backend: &dyn Backend,
        query: &Self::Query,
        page: PageRequest,
    ) -> Result<Page<Self>>;
}

#[async_trait]
impl Listing for Repository {
    type Query = RepositoryFilter;

    async fn fetch_page(
        backend: &dyn Backend,
        query: &RepositoryFilter,
        page: PageRequest,
    ) -> Result<Page<Self>> {
        let filter = RepositoryFilter {
            page,
            ..query.clone()
        };
        backend.list_repositories(&filter).await
    }
}

#[async_trait]
impl Listing for User {
    type Query = ();

    async fn fetch_page(backend: &dyn Backend, _query: &(), page: PageRequest) -> Result<Page<Self>> {
        backend.list_users(&page).await
    }
}

#[async_trait]
impl Listing for Group {
    type Query = ();

    async fn fetch_page(backend: &dyn Backend, _query: &(), page: PageRequest) -> Result<Page<Self>> {
        backend.list_groups(&page).await
    }
}

/// Lazy, finite, non-restartable sequence of pages.
///
/// Each call to [`Pager::next_page`] issues at most one request. Once the
/// backend reports no further pages the pager is exhausted for good; build
/// a new one to enumerate again. A cursor the pager has already followed
/// also ends the listing. A failed request leaves the cursor where it was,
/// so the same page can be requested again.
pub struct Pager<'a, T: Listing> {
    backend: &'a dyn Backend,
    query: T::Query,
    per_page: u32,
    cursor: Option<String>,
    seen: HashSet<String>,
    exhausted: bool,
    fetched: usize,
}

impl<'a, T: Listing> Pager<'a, T> {
    pub fn new(backend: &'a dyn Backend, query: T::Query, per_page: u32) -> Self {
        Self {
            backend,
            query,
            per_page,
            cursor: None,
            seen: HashSet::new(),
            exhausted: false,
            fetched: 0,
        }
    }

    /// Fetch the next page, or `None` once exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<T>>> {
        if self.exhausted {
            return Ok(None);
        }

        let request = PageRequest::at(self.cursor.clone(), self.per_page);
        let page = T::fetch_page(self.backend, &self.query, request).await?;

        self.fetched += page.items.len();
        if let Some(current) = self.cursor.take() {
            self.seen.insert(current);
        }
        match page.next_cursor {
            Some(next) if self.seen.contains(&next) => {
                tracing::warn!(
                    backend = self.backend.backend_type(),
                    cursor = %next,
                    "Backend repeated a page cursor, ending the listing"
                );
                self.exhausted = true;
            }
            Some(next) => self.cursor = Some(next),
            None => self.exhausted = true,
        }
        tracing::debug!(
            backend = self.backend.backend_type(),
            count = page.items.len(),
            total_so_far = self.fetched,
            exhausted = self.exhausted,
            "Fetched page"
        );

        Ok(Some(page.items))
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Number of items yielded so far.
    #[must_use]
    pub fn fetched(&self) -> usize {
        self.fetched
    }

    /// Drain every remaining page.
    pub async fn collect_all(mut self) -> Result<Vec<T>> {
        let mut all = Vec::new();
        while let Some(items) = self.next_page().await? {
            all.extend(items);
        }
        Ok(all)
    }
}

/// Page through repositories matching `filter`, starting at its cursor.
pub fn repositories(backend: &dyn Backend, filter: RepositoryFilter) -> Pager<'_, Repository> {
    let per_page = filter.page.per_page;
    let cursor = filter.page.cursor.clone();
    let mut pager = Pager::new(backend, filter, per_page);
    pager.cursor = cursor;
    pager
}

pub fn users(backend: &dyn Backend, per_page: u32) -> Pager<'_, User> {
    Pager::new(backend, (), per_page)
}

pub fn groups(backend: &dyn Backend, per_page: u32) -> Pager<'_, Group> {
    Pager::new(backend, (), per_page)
}
