//! Talking to the plugin marketplace

pub mod resolver;
pub mod transport;

pub use resolver::{best_effort_version, resolve, rewrite_host, Marketplace, ResolutionResult, Strategy};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
