//! Tracing bootstrap shared by storefront-beacon and the hosts embedding it.

pub mod config;
pub mod otlp;
pub mod spans;

pub use config::{OtlpProtocol, TracingConfig};
pub use otlp::{init_tracing, TracingGuard};
