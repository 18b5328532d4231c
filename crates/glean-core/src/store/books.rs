use super::lock;
use crate::api::types::{Book, ListBooksParams, UpdateProgress};
use crate::api::{ApiClient, books};
use crate::error::Result;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

/// Client-side shelf filters. `None` predicates match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilters {
    pub starred: Option<bool>,
    pub finished: Option<bool>,
    /// `Some(true)` keeps books that have been opened at least once.
    pub started: Option<bool>,
    pub search: String,
}

impl BookFilters {
    /// The bookshelf view: books with reading progress.
    pub fn shelf() -> Self {
        Self {
            started: Some(true),
            ..Self::default()
        }
    }

    fn to_params(&self) -> ListBooksParams {
        let search = self.search.trim();
        ListBooksParams {
            starred: self.starred,
            search: (!search.is_empty()).then(|| search.to_string()),
            finished: self.finished,
            started: self.started,
        }
    }
}

/// Most recently read first (never-read books last), then the predicates,
/// then a case-insensitive title match on the trimmed search text.
pub fn filter_books(books: &[Book], filters: &BookFilters) -> Vec<Book> {
    let mut sorted: Vec<&Book> = books.iter().collect();
    sorted.sort_by(|a, b| {
        let a = a.last_read_time.unwrap_or(0.0);
        let b = b.last_read_time.unwrap_or(0.0);
        b.total_cmp(&a)
    });

    let query = filters.search.trim().to_lowercase();
    sorted
        .into_iter()
        .filter(|book| filters.starred.is_none_or(|starred| book.is_starred == starred))
        .filter(|book| filters.finished.is_none_or(|finished| book.is_finished == finished))
        .filter(|book| filters.started.is_none_or(|started| book.is_started() == started))
        .filter(|book| query.is_empty() || book.title.to_lowercase().contains(&query))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BooksSnapshot {
    pub books: Vec<Book>,
    pub loading: bool,
    pub error: Option<String>,
    pub filters: BookFilters,
}

#[derive(Debug, Default)]
struct BooksState {
    books: Vec<Book>,
    loading: bool,
    error: Option<String>,
    filters: BookFilters,
}

impl BooksState {
    fn replace(&mut self, book: Book) -> bool {
        match self.books.iter_mut().find(|existing| existing.id == book.id) {
            Some(existing) => {
                *existing = book;
                true
            }
            None => false,
        }
    }
}

#[derive(Clone)]
pub struct BooksStore {
    api: ApiClient,
    state: Arc<Mutex<BooksState>>,
}

impl BooksStore {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: Arc::new(Mutex::new(BooksState::default())),
        }
    }

    pub fn with_filters(api: ApiClient, filters: BookFilters) -> Self {
        let store = Self::new(api);
        store.set_filters(filters);
        store
    }

    pub fn snapshot(&self) -> BooksSnapshot {
        let state = lock(&self.state);
        BooksSnapshot {
            books: state.books.clone(),
            loading: state.loading,
            error: state.error.clone(),
            filters: state.filters.clone(),
        }
    }

    pub fn books(&self) -> Vec<Book> {
        lock(&self.state).books.clone()
    }

    pub fn filtered_books(&self) -> Vec<Book> {
        let state = lock(&self.state);
        filter_books(&state.books, &state.filters)
    }

    pub fn filters(&self) -> BookFilters {
        lock(&self.state).filters.clone()
    }

    pub fn set_filters(&self, filters: BookFilters) {
        lock(&self.state).filters = filters;
    }

    pub fn set_starred_filter(&self, starred: Option<bool>) {
        lock(&self.state).filters.starred = starred;
    }

    pub fn set_finished_filter(&self, finished: Option<bool>) {
        lock(&self.state).filters.finished = finished;
    }

    pub fn set_search(&self, search: impl Into<String>) {
        lock(&self.state).filters.search = search.into();
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.state).loading
    }

    pub fn error(&self) -> Option<String> {
        lock(&self.state).error.clone()
    }

    fn begin_loading(&self) {
        let mut state = lock(&self.state);
        state.loading = true;
        state.error = None;
    }

    /// Refresh the listing with the current filters. Failures land in
    /// [`error`](Self::error) and leave the previous listing in place.
    pub async fn fetch_books(&self) {
        let params = {
            let mut state = lock(&self.state);
            state.loading = true;
            state.error = None;
            state.filters.to_params()
        };
        let outcome = books::list_books(&self.api, &params).await;
        let mut state = lock(&self.state);
        state.loading = false;
        match outcome {
            Ok(list) => {
                info!(count = list.len(), "Loaded book listing");
                state.books = list;
            }
            Err(err) => {
                error!("Failed to fetch books: {err}");
                state.error = Some(err.to_string());
            }
        }
    }

    /// Random picks for discovery; empty on failure.
    pub async fn fetch_random_books(&self, count: u32) -> Vec<Book> {
        self.begin_loading();
        let outcome = books::random_books(&self.api, Some(count)).await;
        let mut state = lock(&self.state);
        state.loading = false;
        match outcome {
            Ok(list) => list,
            Err(err) => {
                error!("Failed to fetch random books: {err}");
                state.error = Some(err.to_string());
                Vec::new()
            }
        }
    }

    pub async fn update_progress(&self, book_id: i64, chapter_index: usize, chapter_offset: u64) {
        let progress = UpdateProgress {
            chapter_index,
            chapter_offset,
        };
        match books::update_progress(&self.api, book_id, progress).await {
            Ok(book) => {
                debug!(book_id, chapter_index, chapter_offset, "Saved reading progress");
                lock(&self.state).replace(book);
            }
            Err(err) => error!(book_id, "Failed to update progress: {err}"),
        }
    }

    pub async fn toggle_star(&self, book_id: i64, starred: bool) {
        match books::toggle_star(&self.api, book_id, starred).await {
            Ok(book) => {
                lock(&self.state).replace(book);
            }
            Err(err) => error!(book_id, "Failed to toggle star: {err}"),
        }
    }

    pub async fn delete_book(&self, book_id: i64, physical: bool) -> Result<()> {
        match books::delete_book(&self.api, book_id, physical).await {
            Ok(_) => {
                info!(book_id, physical, "Deleted book");
                lock(&self.state).books.retain(|book| book.id != book_id);
                Ok(())
            }
            Err(err) => {
                error!(book_id, "Failed to delete book: {err}");
                Err(err)
            }
        }
    }

    pub async fn reparse_book(&self, book_id: i64) -> Result<Book> {
        match books::reparse_book(&self.api, book_id).await {
            Ok(book) => {
                lock(&self.state).replace(book.clone());
                Ok(book)
            }
            Err(err) => {
                error!(book_id, "Failed to reparse book: {err}");
                Err(err)
            }
        }
    }
}
