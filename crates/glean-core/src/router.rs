//! Route table and the auth-aware navigation guard.
//!
//! Locations are app-relative (`/reader/7`, `/login?redirect=%2Flibrary`).
//! [`Router::navigate`] resolves a location, runs the guard, and follows
//! guard redirects until a route is allowed.

use crate::store::{AuthSnapshot, AuthStore};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

pub const APP_TITLE: &str = "Glean";
pub const LOGIN_PATH: &str = "/login";
pub const MAX_REDIRECTS: usize = 5;

const LOCATION_BASE: &str = "http://glean.local/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteName {
    Bookshelf,
    Discovery,
    Library,
    Reader,
    Login,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDef {
    pub name: RouteName,
    pub pattern: &'static str,
    pub title: Option<&'static str>,
    pub hide_nav: bool,
}

pub static ROUTES: &[RouteDef] = &[
    RouteDef {
        name: RouteName::Bookshelf,
        pattern: "/",
        title: Some("Shelf"),
        hide_nav: false,
    },
    RouteDef {
        name: RouteName::Discovery,
        pattern: "/discovery",
        title: Some("Discover"),
        hide_nav: false,
    },
    RouteDef {
        name: RouteName::Library,
        pattern: "/library",
        title: Some("Library"),
        hide_nav: false,
    },
    RouteDef {
        name: RouteName::Reader,
        pattern: "/reader/:bookId",
        title: Some("Reading"),
        hide_nav: true,
    },
    RouteDef {
        name: RouteName::Login,
        pattern: LOGIN_PATH,
        title: Some("Sign in"),
        hide_nav: true,
    },
];

static COMPILED: Lazy<Vec<(RouteDef, Regex)>> = Lazy::new(|| {
    ROUTES
        .iter()
        .filter_map(|def| match Regex::new(&pattern_regex(def.pattern)) {
            Ok(regex) => Some((*def, regex)),
            Err(err) => {
                warn!(pattern = def.pattern, "Skipping invalid route pattern: {err}");
                None
            }
        })
        .collect()
});

/// `/reader/:bookId` becomes `^/reader/(?P<bookId>[^/]+)/?$`.
fn pattern_regex(pattern: &str) -> String {
    if pattern == "/" {
        return "^/$".to_string();
    }
    let mut out = String::from("^");
    for segment in pattern.trim_matches('/').split('/') {
        out.push('/');
        match segment.strip_prefix(':') {
            Some(param) => out.push_str(&format!("(?P<{param}>[^/]+)")),
            None => out.push_str(&regex::escape(segment)),
        }
    }
    out.push_str("/?$");
    out
}

/// Path plus decoded query pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl Location {
    pub fn parse(location: &str) -> Option<Self> {
        let base = Url::parse(LOCATION_BASE).ok()?;
        let url = base.join(location.trim()).ok()?;
        if url.host_str() != base.host_str() {
            return None;
        }
        Some(Self {
            path: url.path().to_string(),
            query: url
                .query_pairs()
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect(),
        })
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn full_path(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let mut url = match Url::parse(LOCATION_BASE) {
            Ok(url) => url,
            Err(_) => return self.path.clone(),
        };
        url.query_pairs_mut().extend_pairs(self.query.iter());
        match url.query() {
            Some(query) => format!("{}?{query}", self.path),
            None => self.path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub def: RouteDef,
    pub params: BTreeMap<String, String>,
    pub location: Location,
}

impl ResolvedRoute {
    pub fn name(&self) -> RouteName {
        self.def.name
    }

    pub fn hide_nav(&self) -> bool {
        self.def.hide_nav
    }

    pub fn book_id(&self) -> Option<i64> {
        self.params.get("bookId")?.parse().ok()
    }
}

/// Match `location` against the route table.
pub fn resolve(location: &str) -> Option<ResolvedRoute> {
    let location = Location::parse(location)?;
    COMPILED.iter().find_map(|(def, regex)| {
        let captures = regex.captures(&location.path)?;
        let params = regex
            .capture_names()
            .flatten()
            .filter_map(|name| {
                captures
                    .name(name)
                    .map(|value| (name.to_string(), value.as_str().to_string()))
            })
            .collect();
        Some(ResolvedRoute {
            def: *def,
            params,
            location: location.clone(),
        })
    })
}

/// `/login?redirect=<full path>`, with the target percent-encoded.
pub fn login_redirect(full_path: &str) -> String {
    let location = Location {
        path: LOGIN_PATH.to_string(),
        query: vec![("redirect".to_string(), full_path.to_string())],
    };
    location.full_path()
}

pub fn document_title(title: Option<&str>) -> String {
    match title {
        Some(title) => format!("{title} - {APP_TITLE}"),
        None => APP_TITLE.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(String),
}

pub fn guard(route: &ResolvedRoute, auth: &AuthSnapshot) -> GuardDecision {
    let is_login = route.name() == RouteName::Login;
    if !is_login && auth.is_auth_enabled && !auth.is_authenticated {
        return GuardDecision::Redirect(login_redirect(&route.location.full_path()));
    }
    if is_login && auth.is_authenticated {
        let target = route
            .location
            .query_value("redirect")
            .filter(|target| !target.is_empty())
            .unwrap_or("/");
        return GuardDecision::Redirect(target.to_string());
    }
    GuardDecision::Proceed
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Proceed {
        route: ResolvedRoute,
        title: String,
        redirected_from: Option<String>,
    },
    NotFound {
        location: String,
    },
    TooManyRedirects {
        last: String,
    },
}

#[derive(Debug, Default)]
struct RouterState {
    current: Option<ResolvedRoute>,
    title: Option<String>,
}

/// Clones share the current route, so a 401 handler sees where navigation got to.
#[derive(Clone)]
pub struct Router {
    auth: AuthStore,
    state: Arc<Mutex<RouterState>>,
}

impl Router {
    pub fn new(auth: AuthStore) -> Self {
        Self {
            auth,
            state: Arc::new(Mutex::new(RouterState::default())),
        }
    }

    pub fn auth(&self) -> &AuthStore {
        &self.auth
    }

    pub fn current_route(&self) -> Option<ResolvedRoute> {
        self.lock().current.clone()
    }

    pub fn document_title(&self) -> String {
        self.lock()
            .title
            .clone()
            .unwrap_or_else(|| APP_TITLE.to_string())
    }

    pub async fn navigate(&self, location: &str) -> Navigation {
        if !self.auth.is_initialized() {
            self.auth.init().await;
        }

        let mut target = location.to_string();
        for hop in 0..=MAX_REDIRECTS {
            let Some(route) = resolve(&target) else {
                info!(location = %target, "No route matches location");
                return Navigation::NotFound { location: target };
            };
            match guard(&route, &self.auth.snapshot()) {
                GuardDecision::Proceed => {
                    let title = document_title(route.def.title);
                    {
                        let mut state = self.lock();
                        state.current = Some(route.clone());
                        state.title = Some(title.clone());
                    }
                    debug!(location = %target, %title, hops = hop, "Navigation allowed");
                    return Navigation::Proceed {
                        route,
                        title,
                        redirected_from: (hop > 0).then(|| location.to_string()),
                    };
                }
                GuardDecision::Redirect(next) => {
                    debug!(from = %target, to = %next, "Navigation redirected");
                    target = next;
                }
            }
        }
        warn!(location, last = %target, "Gave up after too many redirects");
        Navigation::TooManyRedirects { last: target }
    }

    /// React to a 401: sign out and return where to send the user.
    pub fn handle_unauthorized(&self) -> String {
        self.auth.logout();
        let current = self.current_route();
        match current {
            Some(route) if route.name() == RouteName::Login => LOGIN_PATH.to_string(),
            Some(route) => login_redirect(&route.location.full_path()),
            None => LOGIN_PATH.to_string(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RouterState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::api::mock::{MockReply, MockTransport};
    use crate::session::Session;
    use crate::storage::{ACCESS_TOKEN_KEY, MemoryStorage};
    use serde_json::json;
    use std::sync::Arc;

    fn router(auth_enabled: bool, token: Option<&str>) -> Router {
        let storage = match token {
            Some(token) => MemoryStorage::with_values([(ACCESS_TOKEN_KEY, token)]),
            None => MemoryStorage::new(),
        };
        let (client, transport) =
            MockTransport::client_with_session(Session::new(Arc::new(storage)));
        transport.respond(
            Method::Get,
            "system/auth-status",
            MockReply::json(200, json!({"enabled": auth_enabled})),
        );
        Router::new(AuthStore::new(client))
    }

    #[test]
    fn resolves_the_route_table() {
        assert_eq!(resolve("/").map(|r| r.name()), Some(RouteName::Bookshelf));
        assert_eq!(resolve("/library/").map(|r| r.name()), Some(RouteName::Library));
        let reader = resolve("/reader/42?from=shelf").expect("reader");
        assert_eq!(reader.name(), RouteName::Reader);
        assert_eq!(reader.book_id(), Some(42));
        assert!(reader.hide_nav());
        assert_eq!(reader.location.query_value("from"), Some("shelf"));
        assert!(resolve("/reader").is_none());
        assert!(resolve("/settings").is_none());
    }

    #[test]
    fn redirect_target_round_trips() {
        let redirect = login_redirect("/reader/7?chapter=3");
        assert_eq!(redirect, "/login?redirect=%2Freader%2F7%3Fchapter%3D3");
        let login = resolve(&redirect).expect("login");
        assert_eq!(login.location.query_value("redirect"), Some("/reader/7?chapter=3"));
    }

    #[test]
    fn titles() {
        assert_eq!(document_title(Some("Library")), "Library - Glean");
        assert_eq!(document_title(None), "Glean");
    }

    #[tokio::test]
    async fn protected_route_redirects_to_login() {
        let router = router(true, None);
        match router.navigate("/reader/7").await {
            Navigation::Proceed {
                route,
                title,
                redirected_from,
            } => {
                assert_eq!(route.name(), RouteName::Login);
                assert_eq!(route.location.query_value("redirect"), Some("/reader/7"));
                assert_eq!(title, "Sign in - Glean");
                assert_eq!(redirected_from.as_deref(), Some("/reader/7"));
            }
            other => panic!("unexpected navigation {other:?}"),
        }
        assert_eq!(router.document_title(), "Sign in - Glean");
    }

    #[tokio::test]
    async fn signed_in_login_visit_follows_the_redirect() {
        let router = router(true, Some("jwt"));
        let nav = router.navigate("/login?redirect=%2Flibrary").await;
        assert!(matches!(
            nav,
            Navigation::Proceed { ref route, .. } if route.name() == RouteName::Library
        ));

        let nav = router.navigate("/login").await;
        assert!(matches!(
            nav,
            Navigation::Proceed { ref route, ref title, .. }
                if route.name() == RouteName::Bookshelf && title == "Shelf - Glean"
        ));
    }

    #[tokio::test]
    async fn open_server_lets_everything_through() {
        let router = router(false, None);
        let nav = router.navigate("/discovery").await;
        assert!(matches!(
            nav,
            Navigation::Proceed { redirected_from: None, ref title, .. } if title == "Discover - Glean"
        ));
        assert!(matches!(
            router.navigate("/nowhere").await,
            Navigation::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn deep_redirect_chains_are_cut_off() {
        let router = router(true, Some("jwt"));
        let mut location = "/library".to_string();
        for _ in 0..=MAX_REDIRECTS {
            location = login_redirect(&location);
        }
        let nav = router.navigate(&location).await;
        assert!(matches!(nav, Navigation::TooManyRedirects { .. }));

        let nested = login_redirect(&login_redirect("/library"));
        assert!(matches!(
            router.navigate(&nested).await,
            Navigation::Proceed { ref route, .. } if route.name() == RouteName::Library
        ));
    }

    #[tokio::test]
    async fn unauthorized_signs_out_and_returns_to_login() {
        let router = router(true, Some("jwt"));
        router.navigate("/library?starred=true").await;
        let next = router.handle_unauthorized();
        assert_eq!(next, "/login?redirect=%2Flibrary%3Fstarred%3Dtrue");
        assert!(!router.auth().is_authenticated());
    }
}
