// Application state module
// Everything a request needs, built once at startup and shared behind an Arc

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::types::Config;
use crate::location;
use crate::routing::Router;
use crate::session::SessionStore;
use crate::template::{TemplateCache, TemplateEngine};

/// Application state
///
/// `config` and `router` are read-only once the server starts. `templates`
/// is filled lazily and never invalidated; restarting the process is the
/// only way to pick up edited template sources.
pub struct AppState {
    pub config: Config,
    pub router: Router,
    pub templates: TemplateCache,
    pub engine: Arc<dyn TemplateEngine>,
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        router: Router,
        engine: Arc<dyn TemplateEngine>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            config,
            router,
            templates: TemplateCache::new(),
            engine,
            sessions,
        }
    }

    /// Map a logical request/config path to a path on disk for this deployment
    pub fn filesystem_path(&self, logical: &str) -> PathBuf {
        location::to_filesystem_path(
            logical,
            self.config.deployment.live,
            &self.config.deployment.root,
        )
    }

    pub const fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.config.performance.io_timeout)
    }
}
