//! Route table lookup
//!
//! Pure lookups with a total fallback chain; no I/O.

use hyper::Method;
use std::collections::HashMap;

use super::target::RouteTarget;
use crate::config::{ConfigError, PostRoutes, RoutesConfig};

/// Path key of the index route
pub const INDEX: &str = "/";

/// Method-indexed route table
#[derive(Debug, Clone)]
pub struct Router {
    get: HashMap<String, RouteTarget>,
    post: HashMap<String, RouteTarget>,
    /// Common POST target, used when no POST path matches
    post_fallback: Option<RouteTarget>,
    index: RouteTarget,
}

impl Router {
    /// Build the table from configuration. The GET table must contain `/`,
    /// and `/` cannot be guarded since it is where failed auth lands.
    pub fn from_config(routes: &RoutesConfig) -> Result<Self, ConfigError> {
        let get = routes
            .get
            .iter()
            .map(|(key, spec)| Ok((key.clone(), RouteTarget::from_spec(key, spec)?)))
            .collect::<Result<HashMap<_, _>, ConfigError>>()?;

        let (post, post_fallback) = match &routes.post {
            Some(PostRoutes::Common(spec)) => (
                HashMap::new(),
                Some(RouteTarget::from_spec("POST", spec)?),
            ),
            Some(PostRoutes::Paths(table)) => (
                table
                    .iter()
                    .map(|(key, spec)| Ok((key.clone(), RouteTarget::from_spec(key, spec)?)))
                    .collect::<Result<HashMap<_, _>, ConfigError>>()?,
                None,
            ),
            None => (HashMap::new(), None),
        };

        let index = get.get(INDEX).cloned().ok_or(ConfigError::MissingIndex)?;
        check_index(&index)?;

        Ok(Self {
            get,
            post,
            post_fallback,
            index,
        })
    }

    /// GET lookup: `key`, then the 404 route, then the index route
    pub fn resolve_get(&self, key: &str) -> &RouteTarget {
        self.get
            .get(key)
            .or_else(|| self.get.get("404"))
            .unwrap_or(&self.index)
    }

    /// GET lookup for a status code route (`403`, `404`, `500`)
    pub fn resolve_status(&self, code: u16) -> &RouteTarget {
        self.resolve_get(&code.to_string())
    }

    /// POST lookup: `key`, then the common POST target, then the GET 404 chain
    pub fn resolve_post(&self, key: &str) -> &RouteTarget {
        self.post
            .get(key)
            .or(self.post_fallback.as_ref())
            .unwrap_or_else(|| self.resolve_status(404))
    }

    /// Exact lookup without fallback. Methods other than POST use the GET table.
    pub fn lookup(&self, method: &Method, path: &str) -> Option<&RouteTarget> {
        if *method == Method::POST {
            self.post.get(path)
        } else {
            self.get.get(path)
        }
    }

    pub const fn post_fallback(&self) -> Option<&RouteTarget> {
        self.post_fallback.as_ref()
    }

    pub const fn index(&self) -> &RouteTarget {
        &self.index
    }

    /// Register a GET target, replacing any configured one
    pub fn insert_get(
        &mut self,
        path: impl Into<String>,
        target: RouteTarget,
    ) -> Result<(), ConfigError> {
        let path = path.into();
        if path == INDEX {
            check_index(&target)?;
            self.index = target.clone();
        }
        self.get.insert(path, target);
        Ok(())
    }

    /// Register a POST target for one path. The common POST target is kept.
    pub fn insert_post(&mut self, path: impl Into<String>, target: RouteTarget) {
        self.post.insert(path.into(), target);
    }

    pub fn set_post_fallback(&mut self, target: Option<RouteTarget>) {
        self.post_fallback = target;
    }
}

fn check_index(target: &RouteTarget) -> Result<(), ConfigError> {
    match target {
        RouteTarget::Guarded(_) => Err(ConfigError::GuardedIndex),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteSpec;
    use crate::handler::{HandlerOutput, HandlerRequest};

    fn direct(body: &str) -> RouteSpec {
        RouteSpec::Direct {
            body: body.to_string(),
        }
    }

    fn body_of(target: &RouteTarget) -> String {
        match target {
            RouteTarget::Handler(handler) => match handler(&HandlerRequest::default()) {
                HandlerOutput::Body(body) => body,
                other => panic!("unexpected output {other:?}"),
            },
            other => panic!("expected handler, got {other:?}"),
        }
    }

    fn build(routes: RoutesConfig) -> Router {
        Router::from_config(&routes.merged_over_defaults()).unwrap()
    }

    #[test]
    fn test_resolve_get_hit() {
        let mut routes = RoutesConfig::default();
        routes.get.insert("/about/".to_string(), direct("about"));
        let router = build(routes);
        assert_eq!(body_of(router.resolve_get("/about/")), "about");
        assert_eq!(body_of(router.resolve_get("/")), "Welcome to Zy!");
    }

    #[test]
    fn test_resolve_get_falls_back_to_404_then_index() {
        let router = build(RoutesConfig::default());
        assert_eq!(body_of(router.resolve_get("/nope/")), "404");

        let mut routes = RoutesConfig::defaults();
        routes.get.remove("404");
        let router = Router::from_config(&routes).unwrap();
        assert_eq!(body_of(router.resolve_get("/nope/")), "Welcome to Zy!");
    }

    #[test]
    fn test_missing_index_is_rejected() {
        let mut routes = RoutesConfig::defaults();
        routes.get.remove("/");
        assert!(matches!(
            Router::from_config(&routes),
            Err(ConfigError::MissingIndex)
        ));
    }

    #[test]
    fn test_guarded_index_is_rejected() {
        let mut routes = RoutesConfig::defaults();
        routes.get.insert(
            "/".to_string(),
            RouteSpec::Guarded {
                auth: true,
                target: Box::new(direct("home")),
            },
        );
        assert!(matches!(
            Router::from_config(&routes),
            Err(ConfigError::GuardedIndex)
        ));

        let mut router = build(RoutesConfig::default());
        let home = RouteTarget::from_spec("/", &direct("home")).unwrap();
        let guarded = RouteTarget::guarded(true, home).unwrap();
        assert!(matches!(
            router.insert_get("/", guarded),
            Err(ConfigError::GuardedIndex)
        ));
        assert_eq!(body_of(router.index()), "Welcome to Zy!");
        assert_eq!(body_of(router.resolve_get("/")), "Welcome to Zy!");
    }

    #[test]
    fn test_resolve_post_common_target() {
        let router = build(RoutesConfig::default());
        assert_eq!(body_of(router.resolve_post("/anything/")), "Welcome to Zy! (POST)");
        assert!(router.lookup(&Method::POST, "/anything/").is_none());
    }

    #[test]
    fn test_resolve_post_path_table_falls_back_to_404() {
        let mut table = HashMap::new();
        table.insert("/login/".to_string(), direct("logged in"));
        let routes = RoutesConfig {
            get: HashMap::new(),
            post: Some(PostRoutes::Paths(table)),
        };
        let router = build(routes);

        assert_eq!(body_of(router.resolve_post("/login/")), "logged in");
        assert_eq!(body_of(router.resolve_post("/other/")), "404");
        assert!(router.post_fallback().is_none());
    }

    #[test]
    fn test_lookup_uses_get_table_for_other_methods() {
        let router = build(RoutesConfig::default());
        assert!(router.lookup(&Method::GET, "/").is_some());
        assert!(router.lookup(&Method::PUT, "/").is_some());
        assert!(router.lookup(&Method::GET, "/missing/").is_none());
    }

    #[test]
    fn test_insert_index_updates_fallback() {
        let mut routes = RoutesConfig::defaults();
        routes.get.remove("404");
        let mut router = Router::from_config(&routes).unwrap();
        router
            .insert_get("/", RouteTarget::handler(|_| HandlerOutput::Body("home".into())))
            .unwrap();
        assert_eq!(body_of(router.resolve_get("/missing/")), "home");
        assert_eq!(body_of(router.index()), "home");
    }

    #[test]
    fn test_registered_post_path_keeps_common_target() {
        let mut router = build(RoutesConfig::default());
        router.insert_post(
            "/login/",
            RouteTarget::handler(|_| HandlerOutput::Body("login".into())),
        );
        assert_eq!(body_of(router.resolve_post("/login/")), "login");
        assert_eq!(body_of(router.resolve_post("/other/")), "Welcome to Zy! (POST)");
    }
}
