//! Application builder
//!
//! Handler functions cannot be written in a config file, so applications
//! register them here on top of the configured route table, together with
//! the session store and template engine.
//!
//! ```no_run
//! use zy::{App, Config, HandlerOutput};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let app = App::new(Config::load_from("config")?)?
//!     .get("/hello/", |req| {
//!         let name = req.url.query("name").unwrap_or("world");
//!         HandlerOutput::Body(format!("Hello, {name}!"))
//!     });
//! app.serve().await
//! # }
//! ```

use hyper::Method;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::{AppState, Config, ConfigError};
use crate::handler::{HandlerOutput, HandlerRequest};
use crate::logger;
use crate::routing::{RouteTarget, Router};
use crate::server;
use crate::session::{SessionStore, UnavailableSessionStore};
use crate::template::{MiniJinjaEngine, TemplateEngine};

pub struct App {
    config: Config,
    router: Router,
    engine: Arc<dyn TemplateEngine>,
    sessions: Arc<dyn SessionStore>,
    /// First registration the router refused
    error: Option<ConfigError>,
}

impl App {
    /// Build the route table from `config`
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let router = Router::from_config(&config.routes)?;
        Ok(Self {
            config,
            router,
            engine: Arc::new(MiniJinjaEngine),
            sessions: Arc::new(UnavailableSessionStore),
            error: None,
        })
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Register a GET handler, replacing any configured target for `path`
    #[must_use]
    pub fn get<F>(self, path: impl Into<String>, f: F) -> Self
    where
        F: Fn(&HandlerRequest) -> HandlerOutput + Send + Sync + 'static,
    {
        self.route(&Method::GET, path, RouteTarget::handler(f))
    }

    /// Register a POST handler for one path
    #[must_use]
    pub fn post<F>(self, path: impl Into<String>, f: F) -> Self
    where
        F: Fn(&HandlerRequest) -> HandlerOutput + Send + Sync + 'static,
    {
        self.route(&Method::POST, path, RouteTarget::handler(f))
    }

    /// Handler for POST requests whose path has no POST route
    #[must_use]
    pub fn post_fallback<F>(mut self, f: F) -> Self
    where
        F: Fn(&HandlerRequest) -> HandlerOutput + Send + Sync + 'static,
    {
        self.router.set_post_fallback(Some(RouteTarget::handler(f)));
        self
    }

    /// Register any target. POST goes to the POST table, every other method to GET.
    ///
    /// A refused registration is reported by `into_state`.
    #[must_use]
    pub fn route(mut self, method: &Method, path: impl Into<String>, target: RouteTarget) -> Self {
        if *method == Method::POST {
            self.router.insert_post(path, target);
        } else if let Err(e) = self.router.insert_get(path, target) {
            self.error.get_or_insert(e);
        }
        self
    }

    #[must_use]
    pub fn session_store(mut self, store: impl SessionStore + 'static) -> Self {
        self.sessions = Arc::new(store);
        self
    }

    #[must_use]
    pub fn template_engine(mut self, engine: impl TemplateEngine + 'static) -> Self {
        self.engine = Arc::new(engine);
        self
    }

    /// Freeze the application into the state shared by every request
    pub fn into_state(self) -> Result<AppState, ConfigError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        Ok(AppState::new(
            self.config,
            self.router,
            self.engine,
            self.sessions,
        ))
    }

    /// Bind `server.host:server.port` and serve until SIGTERM or Ctrl+C
    pub async fn serve(self) -> Result<(), Box<dyn std::error::Error>> {
        let addr = self.config.get_socket_addr()?;
        let listener = server::create_reusable_listener(addr, self.config.performance.backlog)?;
        self.serve_on(listener, server::shutdown_signal()).await?;
        Ok(())
    }

    /// Serve on an already bound listener until `shutdown` completes
    pub async fn serve_on<S>(
        self,
        listener: TcpListener,
        shutdown: S,
    ) -> Result<(), Box<dyn std::error::Error>>
    where
        S: Future<Output = ()>,
    {
        let state = Arc::new(self.into_state()?);
        let addr = listener.local_addr()?;
        logger::log_server_start(&addr, &state.config);

        let local = tokio::task::LocalSet::new();
        local
            .run_until(server::start_server_loop(listener, state, shutdown))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new(Config::from_toml_str("").unwrap()).unwrap()
    }

    fn body(target: &RouteTarget, req: &HandlerRequest) -> String {
        match target {
            RouteTarget::Handler(handler) => match handler(req) {
                HandlerOutput::Body(body) => body,
                other => panic!("unexpected output {other:?}"),
            },
            other => panic!("unexpected target {other:?}"),
        }
    }

    #[test]
    fn test_registered_handlers_reach_the_router() {
        let state = app()
            .get("/", |_| "custom index".into())
            .post("/login/", |req| {
                HandlerOutput::Body(req.form.get("username").cloned().unwrap_or_default())
            })
            .into_state()
            .unwrap();

        let req = HandlerRequest::default();
        assert_eq!(body(state.router.index(), &req), "custom index");
        assert_eq!(body(state.router.resolve_get("/"), &req), "custom index");

        let mut login = HandlerRequest::default();
        login.form.insert("username".to_string(), "ada".to_string());
        assert_eq!(body(state.router.resolve_post("/login/"), &login), "ada");
    }

    #[test]
    fn test_post_fallback_replaces_configured_common_target() {
        let state = app()
            .post_fallback(|_| "fallback".into())
            .into_state()
            .unwrap();
        let req = HandlerRequest::default();
        assert_eq!(body(state.router.resolve_post("/anything/"), &req), "fallback");
    }

    #[test]
    fn test_guarded_route() {
        let target = RouteTarget::guarded(true, RouteTarget::handler(|_| "secret".into())).unwrap();
        let state = app()
            .route(&Method::GET, "/admin/", target)
            .into_state()
            .unwrap();
        assert!(matches!(
            state.router.resolve_get("/admin/"),
            RouteTarget::Guarded(guard) if guard.requires_auth()
        ));
    }

    #[test]
    fn test_guarded_index_is_refused() {
        let target = RouteTarget::guarded(true, RouteTarget::handler(|_| "home".into())).unwrap();
        let result = app()
            .route(&Method::GET, "/", target)
            .get("/about/", |_| "about".into())
            .into_state();
        assert!(matches!(result, Err(ConfigError::GuardedIndex)));
    }
}
