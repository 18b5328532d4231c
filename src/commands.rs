use crate::cli::{AppearanceArgs, Command, ListArgs};
use crate::render;
use anyhow::{Context, Result, bail};
use glean_core::api::{scan, system};
use glean_core::router::{Navigation, RouteName, Router};
use glean_core::store::{AuthStore, BookFilters, BooksStore, ReaderPolicy, ReaderStore};
use glean_core::view::{AppearancePatch, AppearanceStore, FullscreenState, ScrollTracker};
use glean_core::{ApiClient, ClientConfig, ClientEvent, FileStorage, Session, Storage, ToastLevel};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const SCAN_POLL_INTERVAL: Duration = Duration::from_secs(1);
const PAGE_LINES: f64 = 30.0;

/// Everything a command needs, wired once per process.
struct App {
    storage: Arc<dyn Storage>,
    api: ApiClient,
    auth: AuthStore,
    books: BooksStore,
    reader: ReaderStore,
    router: Router,
}

impl App {
    fn new(config: &ClientConfig) -> Result<Self> {
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::open(
            Path::new(&config.storage_dir),
            &config.base_url,
        ));
        let session = Session::new(storage.clone());
        let api = ApiClient::connect(config, session).context("Failed to create API client")?;
        Ok(Self::with_api(storage, api, ReaderPolicy::from(config)))
    }

    fn with_api(storage: Arc<dyn Storage>, api: ApiClient, policy: ReaderPolicy) -> Self {
        let auth = AuthStore::new(api.clone());
        let books = BooksStore::new(api.clone());
        let reader = ReaderStore::with_policy(api.clone(), books.clone(), policy);
        let router = Router::new(auth.clone());
        Self {
            storage,
            api,
            auth,
            books,
            reader,
            router,
        }
    }

    /// Fail early with a hint when the server wants a password we don't have.
    async fn require_session(&self) -> Result<()> {
        self.auth.init().await;
        let auth = self.auth.snapshot();
        if auth.is_auth_enabled && !auth.is_authenticated {
            bail!("This server requires a password; run `glean login` first");
        }
        Ok(())
    }
}

pub async fn run(command: Command, config: ClientConfig) -> Result<()> {
    let app = App::new(&config)?;
    let printer = EventPrinter::spawn(&app);

    let outcome = dispatch(&app, command).await;
    app.reader.settle_prefetch().await;
    printer.finish().await;
    outcome
}

async fn dispatch(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Open { location } => open(app, &location).await,
        Command::Shelf(args) => {
            app.require_session().await?;
            list(app, BookFilters::shelf(), &args).await
        }
        Command::Library(args) => {
            app.require_session().await?;
            list(app, BookFilters::default(), &args).await
        }
        Command::Random { count } => {
            app.require_session().await?;
            random(app, count).await
        }
        Command::Read {
            book_id,
            chapter,
            interactive,
        } => {
            app.require_session().await?;
            read(app, book_id, chapter, interactive).await
        }
        Command::Star { book_id, off } => {
            app.require_session().await?;
            let book = glean_core::api::books::toggle_star(&app.api, book_id, !off)
                .await
                .with_context(|| format!("Failed to update book {book_id}"))?;
            println!("{}", render::book_line(&book));
            Ok(())
        }
        Command::Finish { book_id, undo } => {
            app.require_session().await?;
            let book = glean_core::api::books::mark_finished(&app.api, book_id, !undo)
                .await
                .with_context(|| format!("Failed to update book {book_id}"))?;
            println!("{}", render::book_line(&book));
            Ok(())
        }
        Command::Delete { book_id, physical } => {
            app.require_session().await?;
            app.books
                .delete_book(book_id, physical)
                .await
                .with_context(|| format!("Failed to delete book {book_id}"))?;
            Ok(())
        }
        Command::Reparse { book_id } => {
            app.require_session().await?;
            let book = app
                .books
                .reparse_book(book_id)
                .await
                .with_context(|| format!("Failed to reparse book {book_id}"))?;
            println!("{}", render::book_line(&book));
            Ok(())
        }
        Command::Scan { full, watch } => {
            app.require_session().await?;
            let reply = scan::trigger_scan(&app.api, full)
                .await
                .context("Failed to start scan")?;
            info!(full, files_scanned = reply.files_scanned, "Scan requested");
            if watch {
                watch_scan(app).await?;
            }
            Ok(())
        }
        Command::ScanStatus => {
            app.require_session().await?;
            let status = scan::scan_status(&app.api).await.context("Failed to fetch scan status")?;
            println!("{}", render::scan_line(&status));
            Ok(())
        }
        Command::ScanStop => {
            app.require_session().await?;
            scan::stop_scan(&app.api).await.context("Failed to stop scan")?;
            Ok(())
        }
        Command::Login { password } => login(app, password).await,
        Command::Logout => {
            app.auth.logout();
            println!("Signed out.");
            Ok(())
        }
        Command::Version => {
            println!("glean {}", env!("CARGO_PKG_VERSION"));
            let server = system::version(&app.api).await.context("Failed to fetch server version")?;
            match server.database_version {
                Some(db) => println!("server {} (database {db})", server.app_version),
                None => println!("server {}", server.app_version),
            }
            Ok(())
        }
        Command::Appearance(args) => {
            appearance(app, args);
            Ok(())
        }
    }
}

/// Background task printing toasts and signing out on 401s.
///
/// [`EventPrinter::finish`] handles everything already on the bus before
/// returning, so the last request's events are never lost.
struct EventPrinter {
    done: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl EventPrinter {
    fn spawn(app: &App) -> Self {
        let (done, done_rx) = oneshot::channel();
        let rx = app.api.events().subscribe();
        let handle = tokio::spawn(print_events(rx, app.router.clone(), done_rx));
        Self { done, handle }
    }

    async fn finish(self) {
        let _ = self.done.send(());
        if let Err(err) = self.handle.await {
            warn!("Event printer stopped abnormally: {err}");
        }
    }
}

async fn print_events(
    mut rx: broadcast::Receiver<ClientEvent>,
    router: Router,
    mut done: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            event = rx.recv() => match event {
                Ok(event) => handle_event(&router, event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Event printer fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
            _ = &mut done => break,
        }
    }
    loop {
        match rx.try_recv() {
            Ok(event) => handle_event(&router, event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                debug!(skipped, "Event printer fell behind");
            }
            Err(_) => break,
        }
    }
}

fn handle_event(router: &Router, event: ClientEvent) {
    match event {
        ClientEvent::Toast { level, message } => match level {
            ToastLevel::Success => eprintln!("✓ {message}"),
            ToastLevel::Error => eprintln!("✗ {message}"),
        },
        ClientEvent::Unauthorized => {
            let target = router.handle_unauthorized();
            debug!(%target, "Signed out after 401");
            eprintln!("Session expired; run `glean login` to sign in again.");
        }
    }
}

/// Route-driven entry: resolve the location the way the web app would and
/// render the matching view.
async fn open(app: &App, location: &str) -> Result<()> {
    match app.router.navigate(location).await {
        Navigation::Proceed {
            route,
            title,
            redirected_from,
        } => {
            if let Some(from) = redirected_from {
                debug!(%from, to = %route.location.full_path(), "Followed redirect");
            }
            println!("== {title} ==");
            match route.name() {
                RouteName::Bookshelf => list(app, BookFilters::shelf(), &ListArgs::default()).await,
                RouteName::Library => list(app, BookFilters::default(), &ListArgs::default()).await,
                RouteName::Discovery => random(app, 5).await,
                RouteName::Reader => {
                    let book_id = route
                        .book_id()
                        .with_context(|| format!("Invalid book id in {location}"))?;
                    read(app, book_id, None, false).await
                }
                RouteName::Login => {
                    let target = route.location.query_value("redirect").unwrap_or("/");
                    println!("Run `glean login`, then `glean open {target}`.");
                    Ok(())
                }
            }
        }
        Navigation::NotFound { location } => bail!("No page at {location}"),
        Navigation::TooManyRedirects { last } => bail!("Too many redirects (last: {last})"),
    }
}

async fn list(app: &App, base: BookFilters, args: &ListArgs) -> Result<()> {
    let mut filters = base;
    if let Some(search) = &args.search {
        filters.search = search.clone();
    }
    app.books.set_filters(filters);
    if args.starred {
        app.books.set_starred_filter(Some(true));
    }
    if args.finished {
        app.books.set_finished_filter(Some(true));
    } else if args.unfinished {
        app.books.set_finished_filter(Some(false));
    }
    app.books.fetch_books().await;
    if let Some(err) = app.books.error() {
        bail!("Failed to fetch books: {err}");
    }
    println!("{}", render::book_table(&app.books.filtered_books()));
    Ok(())
}

async fn random(app: &App, count: u32) -> Result<()> {
    let picks = app.books.fetch_random_books(count).await;
    if let Some(err) = app.books.error() {
        bail!("Failed to fetch random books: {err}");
    }
    println!("{}", render::book_table(&picks));
    Ok(())
}

async fn login(app: &App, password: Option<String>) -> Result<()> {
    app.auth.init().await;
    if !app.auth.is_auth_enabled() {
        println!("This server does not require a password.");
        return Ok(());
    }
    let password = match password {
        Some(password) => password,
        None => {
            eprint!("Password: ");
            let mut line = String::new();
            BufReader::new(tokio::io::stdin())
                .read_line(&mut line)
                .await
                .context("Failed to read password")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };
    if !app.auth.login(&password).await {
        bail!("Sign in failed");
    }
    println!("Signed in.");
    Ok(())
}

async fn read(app: &App, book_id: i64, chapter: Option<usize>, interactive: bool) -> Result<()> {
    app.reader
        .load_book(book_id)
        .await
        .with_context(|| format!("Failed to open book {book_id}"))?;
    if let Some(index) = chapter {
        app.reader
            .load_chapter(index)
            .await
            .with_context(|| format!("Failed to open chapter {}", index + 1))?;
    }
    let appearance = AppearanceStore::load(app.storage.clone()).current();
    // Offset within the chapter the server last saved, if that is the one open.
    let saved_offset = app
        .reader
        .current_book()
        .filter(|book| book.chapter_index == app.reader.current_index())
        .map(|book| book.chapter_offset.unwrap_or(0));

    if !interactive {
        print_chapter(app, &appearance, None, false);
        if saved_offset.is_none() {
            app.reader.save_progress(0).await;
        }
        return Ok(());
    }

    let mut scroll = ScrollTracker::new().with_edge_tolerance(1.0);
    let mut fullscreen = FullscreenState::default();
    let resume = saved_offset.unwrap_or(0);
    reflow(app, &appearance, &mut scroll);
    scroll.scroll_to_at(0.0, resume as f64, Instant::now());

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_chapter(app, &appearance, Some(&scroll), fullscreen.is_fullscreen());
        if !fullscreen.is_fullscreen() {
            eprint!("[n]ext [p]rev [d]own [u]p [g N] [f]ullscreen [m]ark finished [q]uit > ");
        }
        let Some(line) = input.next_line().await.context("Failed to read input")? else {
            break;
        };
        let mut parts = line.split_whitespace();
        let outcome = match parts.next().unwrap_or("d") {
            "n" => app.reader.next_chapter().await.map(|_| true),
            "p" => app.reader.previous_chapter().await.map(|_| true),
            "g" => match parts.next().and_then(|n| n.parse::<usize>().ok()) {
                Some(number) if number > 0 => app.reader.load_chapter(number - 1).await.map(|_| true),
                _ => {
                    eprintln!("usage: g <chapter number>");
                    Ok(false)
                }
            },
            "d" => {
                scroll.scroll_to(0.0, scroll.scroll_y() + PAGE_LINES);
                Ok(false)
            }
            "u" => {
                scroll.scroll_to(0.0, scroll.scroll_y() - PAGE_LINES);
                Ok(false)
            }
            "f" => {
                fullscreen.toggle();
                Ok(false)
            }
            "m" => app.reader.mark_finished(true).await.map(|_| false),
            "q" => break,
            other => {
                eprintln!("unknown command {other:?}");
                Ok(false)
            }
        };
        match outcome {
            Ok(true) => {
                reflow(app, &appearance, &mut scroll);
                scroll.scroll_to(0.0, 0.0);
            }
            Ok(false) => {}
            Err(err) => warn!("Navigation failed: {err}"),
        }
        if scroll.is_at_bottom() && !app.reader.has_next_chapter() {
            debug!(book_id, "Reached the end of the book");
        }
    }

    app.reader.save_progress(scroll.scroll_y() as u64).await;
    Ok(())
}

fn reflow(app: &App, appearance: &glean_core::view::ReaderAppearance, scroll: &mut ScrollTracker) {
    let lines = render::layout_lines(&app.reader.content(), appearance).len();
    scroll.set_viewport(80.0, PAGE_LINES);
    scroll.set_content(80.0, lines as f64);
}

fn print_chapter(
    app: &App,
    appearance: &glean_core::view::ReaderAppearance,
    scroll: Option<&ScrollTracker>,
    fullscreen: bool,
) {
    let snapshot = app.reader.snapshot();
    let Some(book) = snapshot.book else {
        return;
    };
    if !fullscreen {
        let chapter = app
            .reader
            .current_chapter()
            .map(|chapter| chapter.title)
            .unwrap_or_else(|| "No chapters".to_string());
        let position = snapshot
            .current_index
            .map(|index| format!("{}/{}", index + 1, snapshot.chapters.len()))
            .unwrap_or_default();
        println!("{} - {chapter} {position}", book.title);
        if let Some(scroll) = scroll {
            println!("{:.0}%", scroll.progress() * 100.0);
        }
        println!();
    }
    let lines = render::layout_lines(&snapshot.content, appearance);
    match scroll {
        Some(scroll) => {
            let start = scroll.scroll_y() as usize;
            for line in lines.iter().skip(start).take(PAGE_LINES as usize) {
                println!("{line}");
            }
        }
        None => {
            for line in &lines {
                println!("{line}");
            }
        }
    }
}

async fn watch_scan(app: &App) -> Result<()> {
    let mut ticker = tokio::time::interval(SCAN_POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let status = scan::scan_status(&app.api).await.context("Failed to fetch scan status")?;
                println!("{}", render::scan_line(&status));
                if !status.is_running {
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted; stopping scan");
                scan::stop_scan(&app.api).await.context("Failed to stop scan")?;
                return Ok(());
            }
        }
    }
}

fn appearance(app: &App, args: AppearanceArgs) {
    let mut store = AppearanceStore::load(app.storage.clone());
    let patch = AppearancePatch {
        font_size: args.font_size,
        line_height: args.line_height,
        theme: args.theme,
        brightness: args.brightness,
        padding_horizontal: args.padding_horizontal,
        padding_vertical: args.padding_vertical,
        paragraph_spacing: args.paragraph_spacing,
        animations: args.animations,
    };
    let current = if args.reset {
        store.reset()
    } else if patch.is_empty() {
        store.current()
    } else {
        store.update(patch)
    };
    println!("font size         {} px", current.font_size);
    println!("line height       {}", current.line_height);
    println!("theme             {}", current.theme.as_str());
    println!("brightness        {}", current.brightness);
    println!("padding           {} x {}", current.padding_horizontal, current.padding_vertical);
    println!("paragraph spacing {}", current.paragraph_spacing);
    println!("animations        {}", if current.animations { "on" } else { "off" });
}

#[cfg(test)]
mod tests {
    use super::*;
    use glean_core::MemoryStorage;
    use glean_core::api::Method;
    use glean_core::api::mock::{MockReply, MockTransport};
    use glean_core::storage::ACCESS_TOKEN_KEY;
    use serde_json::json;

    fn app(token: Option<&str>) -> (App, Arc<MockTransport>, Arc<dyn Storage>) {
        let storage: Arc<dyn Storage> = Arc::new(match token {
            Some(token) => MemoryStorage::with_values([(ACCESS_TOKEN_KEY, token)]),
            None => MemoryStorage::new(),
        });
        let (api, transport) = MockTransport::client_with_session(Session::new(storage.clone()));
        (
            App::with_api(storage.clone(), api, ReaderPolicy::default()),
            transport,
            storage,
        )
    }

    fn script_resumed_book(transport: &MockTransport) {
        let book = json!({
            "id": 7,
            "hash_id": "hash-7",
            "title": "Emma",
            "path": "/library/Emma.txt",
            "is_starred": false,
            "last_read_time": 1700000500.0,
            "file_size": 4096,
            "file_mtime": 1700000000.0,
            "chapter_index": 1,
            "chapter_offset": 120,
            "is_finished": false
        });
        let chapters = json!([
            {"id": 1, "book_id": 7, "title": "Volume I", "order_index": 0},
            {"id": 2, "book_id": 7, "title": "Volume II", "order_index": 1}
        ]);
        transport
            .respond(Method::Get, "books/7", MockReply::json(200, book))
            .respond(Method::Get, "books/7/chapters", MockReply::json(200, chapters))
            .respond(Method::Get, "books/7/chapters/0", MockReply::text(200, "first"))
            .respond(Method::Get, "books/7/chapters/1", MockReply::text(200, "second"));
    }

    #[tokio::test]
    async fn unauthorized_reply_clears_the_stored_token() {
        let (app, transport, storage) = app(Some("expired"));
        transport.respond(
            Method::Get,
            "books",
            MockReply::json(401, json!({"detail": "Not authenticated"})),
        );
        assert!(app.auth.is_authenticated());

        let printer = EventPrinter::spawn(&app);
        app.books.fetch_books().await;
        printer.finish().await;

        assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
        assert!(!app.auth.is_authenticated());
    }

    #[tokio::test]
    async fn printing_the_saved_chapter_keeps_its_offset() {
        let (app, transport, _) = app(None);
        script_resumed_book(&transport);

        read(&app, 7, None, false).await.expect("read saved chapter");
        app.reader.settle_prefetch().await;
        assert_eq!(transport.count(Method::Patch, "books/7/progress"), 0);

        read(&app, 7, Some(0), false).await.expect("read other chapter");
        app.reader.settle_prefetch().await;
        assert_eq!(transport.count(Method::Patch, "books/7/progress"), 1);
    }

    #[tokio::test]
    async fn rejected_star_fails_the_command() {
        let (app, transport, _) = app(None);
        transport
            .respond(
                Method::Get,
                "system/auth-status",
                MockReply::json(200, json!({"enabled": false})),
            )
            .respond(
                Method::Patch,
                "books/3/star",
                MockReply::json(404, json!({"detail": "Book not found"})),
            );

        let outcome = dispatch(&app, Command::Star { book_id: 3, off: false }).await;
        assert!(outcome.is_err());
        assert_eq!(transport.count(Method::Patch, "books/3/star"), 1);
    }
}
