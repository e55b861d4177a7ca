//! Zy: a small HTTP framework that maps request paths to files, cached
//! templates, structure pages and handler functions.

pub mod app;
pub mod config;
pub mod handler;
pub mod http;
pub mod location;
pub mod logger;
pub mod output;
pub mod routing;
pub mod scripting;
pub mod server;
pub mod session;
pub mod template;

pub use app::App;
pub use config::{AppState, Config, ConfigError};
pub use handler::{HandlerOutput, HandlerRequest};
pub use routing::RouteTarget;
pub use session::{MemorySessionStore, Session, SessionError, SessionStore};
pub use template::{MiniJinjaEngine, TemplateEngine, Tokens};
