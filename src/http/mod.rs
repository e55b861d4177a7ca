//! HTTP protocol layer module
//!
//! Response builders, `ETag` handling and content-type lookup, decoupled
//! from routing and output resolution.

pub mod cache;
pub mod mime;
pub mod response;

// Re-export commonly used builders
pub use response::{
    build_304_response, build_404_response, build_413_response, build_500_response,
    build_file_response, build_html_response, build_redirect_response,
};
