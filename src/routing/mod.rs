//! Routing module
//!
//! Maps an HTTP method and normalized path to a [`RouteTarget`]:
//! - Exact path lookup per method
//! - Total fallback chain (`404` route, then index)
//! - Common POST target

mod router;
mod target;

pub use router::{Router, INDEX};
pub use target::{Guard, Handler, OutputKind, RouteTarget, TEMPLATE_MARKER};
