//! Current book, chapter navigation and the chapter content cache.
//!
//! Book loads and foreground chapter loads each take a request id. A result
//! that comes back after a newer request started is still cached (when it
//! belongs to the current book) but never replaces what is displayed.
//! Pre-fetch runs as spawned tasks that only ever fill the cache.

use super::books::BooksStore;
use super::cache::ChapterCache;
use super::lock;
use crate::api::types::{Book, Chapter};
use crate::api::{ApiClient, books, chapters};
use crate::config::ClientConfig;
use crate::error::Result;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReaderPhase {
    #[default]
    Idle,
    Loading,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderPolicy {
    pub cache_capacity: usize,
    pub prune_distance: usize,
    pub prefetch_behind: usize,
    pub prefetch_ahead: usize,
}

impl Default for ReaderPolicy {
    fn default() -> Self {
        Self::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for ReaderPolicy {
    fn from(config: &ClientConfig) -> Self {
        Self {
            cache_capacity: config.cache_capacity,
            prune_distance: config.prune_distance,
            prefetch_behind: config.prefetch_behind,
            prefetch_ahead: config.prefetch_ahead,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReaderSnapshot {
    pub phase: ReaderPhase,
    pub book: Option<Book>,
    pub chapters: Vec<Chapter>,
    pub current_index: Option<usize>,
    pub content: String,
    pub cached: Vec<usize>,
}

#[derive(Debug)]
struct ReaderState {
    phase: ReaderPhase,
    book: Option<Book>,
    chapters: Vec<Chapter>,
    current_index: Option<usize>,
    content: String,
    cache: ChapterCache,
    book_request: u64,
    chapter_request: u64,
    next_request_id: u64,
}

impl ReaderState {
    fn new(policy: ReaderPolicy) -> Self {
        Self {
            phase: ReaderPhase::Idle,
            book: None,
            chapters: Vec::new(),
            current_index: None,
            content: String::new(),
            cache: ChapterCache::new(policy.cache_capacity, policy.prune_distance),
            book_request: 0,
            chapter_request: 0,
            next_request_id: 1,
        }
    }

    fn allocate_request_id(&mut self) -> u64 {
        let request_id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1).max(1);
        request_id
    }

    /// Clears everything and invalidates in-flight loads.
    fn reset(&mut self) {
        self.phase = ReaderPhase::Idle;
        self.book = None;
        self.chapters.clear();
        self.current_index = None;
        self.content.clear();
        self.cache.clear();
        self.book_request = self.allocate_request_id();
        self.chapter_request = self.allocate_request_id();
    }

    fn book_id(&self) -> Option<i64> {
        self.book.as_ref().map(|book| book.id)
    }
}

#[derive(Clone)]
pub struct ReaderStore {
    api: ApiClient,
    books: BooksStore,
    state: Arc<Mutex<ReaderState>>,
    prefetch: Arc<Mutex<Vec<JoinHandle<()>>>>,
    policy: ReaderPolicy,
}

impl ReaderStore {
    pub fn new(api: ApiClient, books: BooksStore) -> Self {
        Self::with_policy(api, books, ReaderPolicy::default())
    }

    pub fn with_policy(api: ApiClient, books: BooksStore, policy: ReaderPolicy) -> Self {
        Self {
            api,
            books,
            state: Arc::new(Mutex::new(ReaderState::new(policy))),
            prefetch: Arc::new(Mutex::new(Vec::new())),
            policy,
        }
    }

    pub fn snapshot(&self) -> ReaderSnapshot {
        let state = lock(&self.state);
        ReaderSnapshot {
            phase: state.phase,
            book: state.book.clone(),
            chapters: state.chapters.clone(),
            current_index: state.current_index,
            content: state.content.clone(),
            cached: state.cache.indices(),
        }
    }

    pub fn phase(&self) -> ReaderPhase {
        lock(&self.state).phase
    }

    pub fn current_book(&self) -> Option<Book> {
        lock(&self.state).book.clone()
    }

    pub fn current_index(&self) -> Option<usize> {
        lock(&self.state).current_index
    }

    pub fn content(&self) -> String {
        lock(&self.state).content.clone()
    }

    pub fn current_chapter(&self) -> Option<Chapter> {
        let state = lock(&self.state);
        let index = state.current_index?;
        state
            .chapters
            .iter()
            .find(|chapter| chapter.order_index == index)
            .cloned()
    }

    pub fn has_previous_chapter(&self) -> bool {
        lock(&self.state)
            .current_index
            .is_some_and(|index| index > 0)
    }

    pub fn has_next_chapter(&self) -> bool {
        let state = lock(&self.state);
        state
            .current_index
            .is_some_and(|index| index + 1 < state.chapters.len())
    }

    pub fn reset(&self) {
        lock(&self.state).reset();
        self.abort_prefetch();
    }

    /// Load `book_id` and open its starting chapter: the saved position, or
    /// the lowest `order_index` for a book that was never opened.
    pub async fn load_book(&self, book_id: i64) -> Result<()> {
        self.abort_prefetch();
        let request_id = {
            let mut state = lock(&self.state);
            state.reset();
            state.phase = ReaderPhase::Loading;
            let request_id = state.allocate_request_id();
            state.book_request = request_id;
            request_id
        };

        let fetched = async {
            let book = books::get_book(&self.api, book_id).await?;
            let mut list = chapters::list_chapters(&self.api, book_id).await?;
            list.sort_by_key(|chapter| chapter.order_index);
            Ok::<_, crate::ApiError>((book, list))
        }
        .await;

        let start = {
            let mut state = lock(&self.state);
            if state.book_request != request_id {
                debug!(book_id, request_id, "Dropping stale book load");
                return Ok(());
            }
            let (book, list) = match fetched {
                Ok(found) => found,
                Err(err) => {
                    error!(book_id, "Failed to load book: {err}");
                    state.phase = ReaderPhase::Idle;
                    return Err(err);
                }
            };
            let start = book
                .chapter_index
                .or_else(|| list.iter().map(|chapter| chapter.order_index).min());
            info!(book_id, title = %book.title, chapters = list.len(), ?start, "Opened book");
            state.book = Some(book);
            state.chapters = list;
            state.current_index = start;
            if start.is_none() {
                state.phase = ReaderPhase::Ready;
            }
            start
        };

        match start {
            Some(index) => self.load_chapter(index).await,
            None => Ok(()),
        }
    }

    /// Show chapter `index`, from the cache when possible, then pre-fetch its
    /// neighbors. Does nothing without a current book.
    pub async fn load_chapter(&self, index: usize) -> Result<()> {
        let (book_id, book_request, chapter_request) = {
            let mut state = lock(&self.state);
            let Some(book_id) = state.book_id() else {
                return Ok(());
            };
            let cached = state.cache.get(index).map(str::to_owned);
            state.chapter_request = state.allocate_request_id();
            if let Some(content) = cached {
                debug!(book_id, index, "Chapter served from cache");
                state.content = content;
                state.current_index = Some(index);
                state.phase = ReaderPhase::Ready;
                drop(state);
                self.dispatch_prefetch(index);
                return Ok(());
            }
            state.phase = ReaderPhase::Loading;
            (book_id, state.book_request, state.chapter_request)
        };

        let fetched = chapters::chapter_content(&self.api, book_id, index).await;

        {
            let mut state = lock(&self.state);
            if state.book_request != book_request {
                debug!(book_id, index, "Dropping chapter for a closed book");
                return Ok(());
            }
            let is_current = state.chapter_request == chapter_request;
            match fetched {
                Ok(content) => {
                    if is_current {
                        state.cache.insert(index, content.clone());
                        state.content = content;
                        state.current_index = Some(index);
                        state.phase = ReaderPhase::Ready;
                    } else {
                        debug!(book_id, index, "Caching superseded chapter load");
                        state.cache.insert(index, content);
                        return Ok(());
                    }
                }
                Err(err) => {
                    error!(book_id, index, "Failed to load chapter: {err}");
                    if is_current {
                        state.phase = ReaderPhase::Ready;
                    }
                    return Err(err);
                }
            }
        }

        self.dispatch_prefetch(index);
        Ok(())
    }

    pub async fn previous_chapter(&self) -> Result<()> {
        let target = {
            let state = lock(&self.state);
            match (state.book.as_ref(), state.current_index) {
                (Some(_), Some(index)) if index > 0 => Some(index - 1),
                _ => None,
            }
        };
        match target {
            Some(index) => self.load_chapter(index).await,
            None => Ok(()),
        }
    }

    pub async fn next_chapter(&self) -> Result<()> {
        let target = {
            let state = lock(&self.state);
            match (state.book.as_ref(), state.current_index) {
                (Some(_), Some(index)) if index + 1 < state.chapters.len() => Some(index + 1),
                _ => None,
            }
        };
        match target {
            Some(index) => self.load_chapter(index).await,
            None => Ok(()),
        }
    }

    /// Persist the reading offset within the current chapter. Failures are
    /// logged by the books store.
    pub async fn save_progress(&self, offset: u64) {
        let target = {
            let state = lock(&self.state);
            state.book_id().zip(state.current_index)
        };
        if let Some((book_id, index)) = target {
            self.books.update_progress(book_id, index, offset).await;
        }
    }

    pub async fn mark_finished(&self, finished: bool) -> Result<()> {
        let Some(book_id) = lock(&self.state).book_id() else {
            return Ok(());
        };
        match books::mark_finished(&self.api, book_id, finished).await {
            Ok(book) => {
                let mut state = lock(&self.state);
                if state.book_id() == Some(book.id) {
                    state.book = Some(book);
                }
                Ok(())
            }
            Err(err) => {
                error!(book_id, "Failed to mark book finished: {err}");
                Err(err)
            }
        }
    }

    /// Wait for in-flight pre-fetch tasks.
    pub async fn settle_prefetch(&self) {
        let handles = std::mem::take(&mut *lock(&self.prefetch));
        for handle in handles {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    warn!("Chapter pre-fetch task failed: {err}");
                }
            }
        }
    }

    fn abort_prefetch(&self) {
        for handle in lock(&self.prefetch).drain(..) {
            handle.abort();
        }
    }

    fn dispatch_prefetch(&self, center: usize) {
        let (book_id, book_request, targets) = {
            let mut state = lock(&self.state);
            let Some(book_id) = state.book_id() else {
                return;
            };
            let len = state.chapters.len();
            let behind = (1..=self.policy.prefetch_behind).filter_map(|step| center.checked_sub(step));
            let ahead = (1..=self.policy.prefetch_ahead).map(|step| center + step);
            let targets: Vec<usize> = behind
                .chain(ahead)
                .filter(|index| *index < len && !state.cache.contains(*index))
                .collect();
            let evicted = state.cache.prune_around(center);
            if evicted > 0 {
                debug!(book_id, center, evicted, "Pruned chapter cache");
            }
            (book_id, state.book_request, targets)
        };

        let mut handles = lock(&self.prefetch);
        handles.retain(|handle| !handle.is_finished());
        for index in targets {
            let api = self.api.clone();
            let state = Arc::clone(&self.state);
            handles.push(tokio::spawn(async move {
                match chapters::chapter_content(&api, book_id, index).await {
                    Ok(content) => {
                        let mut state = lock(&state);
                        if state.book_request != book_request {
                            return;
                        }
                        state.cache.insert(index, content);
                        let center = state.current_index.unwrap_or(index);
                        state.cache.prune_around(center);
                    }
                    Err(err) => debug!(book_id, index, "Chapter pre-fetch failed: {err}"),
                }
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::api::books::tests::book_json;
    use crate::api::mock::{MockReply, MockTransport};
    use serde_json::{Value, json};
    use std::time::Duration;

    fn chapters_json(book_id: i64, count: usize) -> Value {
        let list: Vec<Value> = (0..count)
            .map(|index| {
                json!({
                    "id": index as i64 + 100,
                    "book_id": book_id,
                    "title": format!("Chapter {}", index + 1),
                    "order_index": index
                })
            })
            .collect();
        json!(list)
    }

    fn script_book(transport: &MockTransport, book_id: i64, count: usize, resume: Option<usize>) {
        let mut book = book_json(book_id, "Moby Dick");
        book["chapter_index"] = json!(resume);
        transport
            .respond(Method::Get, &format!("books/{book_id}"), MockReply::json(200, book))
            .respond(
                Method::Get,
                &format!("books/{book_id}/chapters"),
                MockReply::json(200, chapters_json(book_id, count)),
            );
        for index in 0..count {
            transport.respond(
                Method::Get,
                &format!("books/{book_id}/chapters/{index}"),
                MockReply::text(200, format!("text {book_id}/{index}")),
            );
        }
    }

    fn reader() -> (ReaderStore, std::sync::Arc<MockTransport>) {
        let (client, transport) = MockTransport::client();
        let books = BooksStore::new(client.clone());
        (ReaderStore::new(client, books), transport)
    }

    #[tokio::test]
    async fn load_book_resumes_and_prefetches_neighbors() {
        let (reader, transport) = reader();
        script_book(&transport, 1, 6, Some(2));

        reader.load_book(1).await.expect("load");
        reader.settle_prefetch().await;

        let snapshot = reader.snapshot();
        assert_eq!(snapshot.phase, ReaderPhase::Ready);
        assert_eq!(snapshot.current_index, Some(2));
        assert_eq!(snapshot.content, "text 1/2");
        assert_eq!(snapshot.cached, vec![1, 2, 3, 4]);
        assert_eq!(
            reader.current_chapter().map(|chapter| chapter.title),
            Some("Chapter 3".to_string())
        );
    }

    #[tokio::test]
    async fn unopened_book_starts_at_lowest_order_index() {
        let (reader, transport) = reader();
        script_book(&transport, 2, 3, None);
        transport.respond_only(
            Method::Get,
            "books/2/chapters",
            MockReply::json(
                200,
                json!([
                    {"id": 2, "book_id": 2, "title": "B", "order_index": 1},
                    {"id": 1, "book_id": 2, "title": "A", "order_index": 0}
                ]),
            ),
        );

        reader.load_book(2).await.expect("load");
        let snapshot = reader.snapshot();
        assert_eq!(snapshot.current_index, Some(0));
        assert_eq!(snapshot.chapters[0].title, "A");
        assert!(!reader.has_previous_chapter());
        assert!(reader.has_next_chapter());
    }

    #[tokio::test]
    async fn book_without_chapters_is_ready_but_empty() {
        let (reader, transport) = reader();
        script_book(&transport, 3, 0, None);

        reader.load_book(3).await.expect("load");
        let snapshot = reader.snapshot();
        assert_eq!(snapshot.phase, ReaderPhase::Ready);
        assert_eq!(snapshot.current_index, None);
        assert!(snapshot.content.is_empty());
        assert!(!reader.has_next_chapter());
    }

    #[tokio::test]
    async fn cached_chapter_needs_no_request() {
        let (reader, transport) = reader();
        script_book(&transport, 1, 6, Some(2));
        reader.load_book(1).await.expect("load");
        reader.settle_prefetch().await;
        assert_eq!(transport.count(Method::Get, "books/1/chapters/3"), 1);

        reader.next_chapter().await.expect("next");
        assert_eq!(reader.content(), "text 1/3");
        assert_eq!(transport.count(Method::Get, "books/1/chapters/3"), 1);
        reader.settle_prefetch().await;
        assert_eq!(transport.count(Method::Get, "books/1/chapters/5"), 1);
    }

    #[tokio::test]
    async fn navigation_stops_at_the_boundaries() {
        let (reader, transport) = reader();
        reader.next_chapter().await.expect("no book");
        reader.previous_chapter().await.expect("no book");
        assert!(transport.requests().is_empty());

        script_book(&transport, 1, 2, Some(0));
        reader.load_book(1).await.expect("load");
        reader.settle_prefetch().await;
        let before = transport.requests().len();
        reader.previous_chapter().await.expect("first");
        assert_eq!(reader.current_index(), Some(0));
        assert_eq!(transport.requests().len(), before);

        reader.next_chapter().await.expect("next");
        reader.settle_prefetch().await;
        let before = transport.requests().len();
        reader.next_chapter().await.expect("last");
        reader.settle_prefetch().await;
        assert_eq!(reader.current_index(), Some(1));
        assert_eq!(transport.requests().len(), before);
    }

    #[tokio::test]
    async fn cache_stays_near_the_reading_position() {
        let (reader, transport) = reader();
        script_book(&transport, 1, 40, Some(0));
        reader.load_book(1).await.expect("load");

        for _ in 0..24 {
            reader.next_chapter().await.expect("next");
            reader.settle_prefetch().await;
        }

        let snapshot = reader.snapshot();
        assert_eq!(snapshot.current_index, Some(24));
        // Pruned once, around chapter 19, when the cache first went past 20.
        assert_eq!(snapshot.cached, (9..=26).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn prefetch_failures_are_swallowed() {
        let (reader, transport) = reader();
        script_book(&transport, 1, 4, Some(1));
        transport.respond_only(
            Method::Get,
            "books/1/chapters/2",
            MockReply::json(500, json!({"detail": "Parser crashed"})),
        );

        reader.load_book(1).await.expect("load");
        reader.settle_prefetch().await;
        let snapshot = reader.snapshot();
        assert_eq!(snapshot.content, "text 1/1");
        assert_eq!(snapshot.cached, vec![0, 1, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_earlier_book_load_is_dropped() {
        let (reader, transport) = reader();
        script_book(&transport, 2, 2, Some(0));
        let mut slow = book_json(1, "Slow");
        slow["chapter_index"] = json!(0);
        transport.respond(
            Method::Get,
            "books/1",
            MockReply::json(200, slow).with_delay(Duration::from_millis(200)),
        );

        let (first, second) = tokio::join!(reader.load_book(1), reader.load_book(2));
        first.expect("stale load");
        second.expect("current load");

        let snapshot = reader.snapshot();
        assert_eq!(snapshot.book.map(|book| book.id), Some(2));
        assert_eq!(snapshot.content, "text 2/0");
        assert_eq!(transport.count(Method::Get, "books/1/chapters"), 0);
    }

    #[tokio::test]
    async fn load_failure_is_raised() {
        let (reader, _transport) = reader();
        let err = reader.load_book(404).await.expect_err("missing");
        assert!(err.is_not_found());
        assert_eq!(reader.phase(), ReaderPhase::Idle);
        assert_eq!(reader.current_book(), None);
    }

    #[tokio::test]
    async fn progress_and_finish_go_to_the_server() {
        let (reader, transport) = reader();
        reader.save_progress(10).await;
        assert!(transport.requests().is_empty());

        script_book(&transport, 1, 3, Some(1));
        let mut finished = book_json(1, "Moby Dick");
        finished["is_finished"] = json!(true);
        transport
            .respond(Method::Patch, "books/1/progress", MockReply::json(200, book_json(1, "Moby Dick")))
            .respond(Method::Patch, "books/1/finish", MockReply::json(200, finished));
        reader.load_book(1).await.expect("load");

        reader.save_progress(512).await;
        let progress = transport
            .requests()
            .into_iter()
            .find(|request| request.path == "books/1/progress")
            .expect("progress request");
        assert_eq!(progress.body, Some(json!({"chapter_index": 1, "chapter_offset": 512})));

        reader.mark_finished(true).await.expect("finish");
        assert!(reader.current_book().expect("book").is_finished);
    }

    #[tokio::test]
    async fn reset_clears_everything() {
        let (reader, transport) = reader();
        script_book(&transport, 1, 3, Some(0));
        reader.load_book(1).await.expect("load");
        reader.reset();
        let snapshot = reader.snapshot();
        assert_eq!(snapshot.phase, ReaderPhase::Idle);
        assert_eq!(snapshot.book, None);
        assert!(snapshot.cached.is_empty());
    }
}
