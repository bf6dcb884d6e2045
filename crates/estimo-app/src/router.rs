// Declarative route table with a token guard.
//
// Routes are matched in declaration order on `/`-separated segments; a
// `:name` segment captures that part of the path. A route either names a
// page or redirects to another path.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Where unauthenticated visitors of a protected page are sent.
pub const LOGIN_PATH: &str = "/login";

const MAX_REDIRECTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Page {
    EstimatesList,
    EstimateCreate,
    EstimateDetail,
    ClientsList,
    ClientDetail,
    TemplatesList,
    TemplateDetail,
    Analytics,
    Profile,
    Login,
    Register,
    Verify,
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteTarget {
    Page { page: Page, requires_auth: bool },
    Redirect(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDef {
    pub pattern: &'static str,
    pub target: RouteTarget,
}

impl RouteDef {
    pub const fn protected(pattern: &'static str, page: Page) -> Self {
        Self {
            pattern,
            target: RouteTarget::Page {
                page,
                requires_auth: true,
            },
        }
    }

    pub const fn public(pattern: &'static str, page: Page) -> Self {
        Self {
            pattern,
            target: RouteTarget::Page {
                page,
                requires_auth: false,
            },
        }
    }

    pub const fn redirect(pattern: &'static str, to: &'static str) -> Self {
        Self {
            pattern,
            target: RouteTarget::Redirect(to),
        }
    }

    /// Match `segments` against this route's pattern, capturing `:name`
    /// parameters.
    fn matches(&self, segments: &[&str]) -> Option<Params> {
        let pattern: Vec<&str> = split(self.pattern);
        if pattern.len() != segments.len() {
            return None;
        }
        let mut params = Params::new();
        for (expected, actual) in pattern.iter().zip(segments) {
            match expected.strip_prefix(':') {
                Some(name) => {
                    params.insert(name.to_string(), (*actual).to_string());
                }
                None if expected == actual => {}
                None => return None,
            }
        }
        Some(params)
    }
}

pub type Params = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resolved {
    /// `path` is the final, normalised path after redirects.
    Page {
        page: Page,
        params: Params,
        path: String,
    },
    NotFound {
        path: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("too many redirects resolving {path}")]
    TooManyRedirects { path: String },
}

#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<RouteDef>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(vec![
            RouteDef::redirect("/", "/estimates"),
            RouteDef::protected("/estimates", Page::EstimatesList),
            RouteDef::protected("/estimates/create", Page::EstimateCreate),
            RouteDef::protected("/estimates/:id", Page::EstimateDetail),
            RouteDef::protected("/clients", Page::ClientsList),
            RouteDef::protected("/clients/:id", Page::ClientDetail),
            RouteDef::protected("/templates", Page::TemplatesList),
            RouteDef::protected("/templates/:id", Page::TemplateDetail),
            RouteDef::protected("/analytics", Page::Analytics),
            RouteDef::protected("/profile", Page::Profile),
            RouteDef::public(LOGIN_PATH, Page::Login),
            RouteDef::public("/register", Page::Register),
            RouteDef::public("/verify", Page::Verify),
        ])
    }
}

impl Router {
    pub fn new(routes: Vec<RouteDef>) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &[RouteDef] {
        &self.routes
    }

    /// Resolve `path` to a page, following redirects and sending
    /// unauthenticated visitors of protected pages to [`LOGIN_PATH`].
    pub fn resolve(&self, path: &str, authenticated: bool) -> Result<Resolved, RouteError> {
        let mut current = normalize(path);
        for _ in 0..=MAX_REDIRECTS {
            let segments = split(&current);
            let Some((route, params)) = self
                .routes
                .iter()
                .find_map(|r| r.matches(&segments).map(|p| (r, p)))
            else {
                return Ok(Resolved::NotFound { path: current });
            };

            match &route.target {
                RouteTarget::Redirect(to) => {
                    debug!(from = %current, to, "route redirect");
                    current = normalize(to);
                }
                RouteTarget::Page {
                    requires_auth: true,
                    ..
                } if !authenticated => {
                    debug!(path = %current, "guard: no token, redirecting to login");
                    current = LOGIN_PATH.to_string();
                }
                RouteTarget::Page { page, .. } => {
                    return Ok(Resolved::Page {
                        page: *page,
                        params,
                        path: current,
                    });
                }
            }
        }
        Err(RouteError::TooManyRedirects {
            path: normalize(path),
        })
    }
}

/// Drop the query string and fragment, and any trailing slashes. The root
/// stays `/`.
fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(resolved: Resolved) -> (Page, Params, String) {
        match resolved {
            Resolved::Page { page, params, path } => (page, params, path),
            other => panic!("expected a page, got {other:?}"),
        }
    }

    #[test]
    fn root_redirects_to_estimates() {
        let router = Router::default();
        let (p, _, path) = page(router.resolve("/", true).unwrap());
        assert_eq!(p, Page::EstimatesList);
        assert_eq!(path, "/estimates");
    }

    #[test]
    fn static_segment_wins_over_parameter() {
        let router = Router::default();
        let (p, params, _) = page(router.resolve("/estimates/create", true).unwrap());
        assert_eq!(p, Page::EstimateCreate);
        assert!(params.is_empty());
    }

    #[test]
    fn parameters_are_captured() {
        let router = Router::default();
        let (p, params, _) = page(router.resolve("/clients/42", true).unwrap());
        assert_eq!(p, Page::ClientDetail);
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn query_and_trailing_slash_are_ignored() {
        let router = Router::default();
        let (p, params, path) =
            page(router.resolve("/templates/7/?tab=notes", true).unwrap());
        assert_eq!(p, Page::TemplateDetail);
        assert_eq!(params["id"], "7");
        assert_eq!(path, "/templates/7");
    }

    #[test]
    fn guard_sends_anonymous_users_to_login() {
        let router = Router::default();
        let (p, _, path) = page(router.resolve("/estimates/3", false).unwrap());
        assert_eq!(p, Page::Login);
        assert_eq!(path, LOGIN_PATH);

        let (p, _, _) = page(router.resolve("/", false).unwrap());
        assert_eq!(p, Page::Login);
    }

    #[test]
    fn public_pages_need_no_token() {
        let router = Router::default();
        for (path, expected) in [
            ("/login", Page::Login),
            ("/register", Page::Register),
            ("/verify", Page::Verify),
        ] {
            let (p, _, _) = page(router.resolve(path, false).unwrap());
            assert_eq!(p, expected);
        }
    }

    #[test]
    fn unknown_path_is_not_found() {
        let router = Router::default();
        assert_eq!(
            router.resolve("/estimates/1/extra", true).unwrap(),
            Resolved::NotFound {
                path: "/estimates/1/extra".into()
            }
        );
    }

    #[test]
    fn redirect_loop_is_an_error() {
        let router = Router::new(vec![
            RouteDef::redirect("/a", "/b"),
            RouteDef::redirect("/b", "/a"),
        ]);
        assert_eq!(
            router.resolve("/a", true),
            Err(RouteError::TooManyRedirects { path: "/a".into() })
        );
    }

    #[test]
    fn redirect_chain_limit_is_eight_hops() {
        let router = Router::new(vec![
            RouteDef::redirect("/r0", "/r1"),
            RouteDef::redirect("/r1", "/r2"),
            RouteDef::redirect("/r2", "/r3"),
            RouteDef::redirect("/r3", "/r4"),
            RouteDef::redirect("/r4", "/r5"),
            RouteDef::redirect("/r5", "/r6"),
            RouteDef::redirect("/r6", "/r7"),
            RouteDef::redirect("/r7", "/r8"),
            RouteDef::redirect("/r8", "/r9"),
            RouteDef::public("/r9", Page::Login),
        ]);

        let (p, _, path) = page(router.resolve("/r1", true).unwrap());
        assert_eq!(p, Page::Login);
        assert_eq!(path, "/r9");

        assert_eq!(
            router.resolve("/r0", true),
            Err(RouteError::TooManyRedirects { path: "/r0".into() })
        );
    }

    #[test]
    fn default_table_lists_static_routes_before_parameters() {
        let router = Router::default();
        let patterns: Vec<&str> = router.routes().iter().map(|r| r.pattern).collect();
        assert_eq!(patterns.len(), 13);
        assert_eq!(router.routes()[0], RouteDef::redirect("/", "/estimates"));

        let position = |pattern: &str| patterns.iter().position(|p| *p == pattern).unwrap();
        assert!(position("/estimates/create") < position("/estimates/:id"));
        assert!(router
            .routes()
            .iter()
            .filter(|r| matches!(r.target, RouteTarget::Page { requires_auth: false, .. }))
            .all(|r| ["/login", "/register", "/verify"].contains(&r.pattern)));
    }

    #[test]
    fn guard_loop_through_protected_login_is_an_error() {
        let router = Router::new(vec![RouteDef::protected(LOGIN_PATH, Page::Login)]);
        assert!(router.resolve(LOGIN_PATH, false).is_err());
    }

    #[test]
    fn normalize_handles_relative_and_empty() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("///"), "/");
        assert_eq!(normalize("clients"), "/clients");
        assert_eq!(normalize("/a/b#frag"), "/a/b");
    }
}
