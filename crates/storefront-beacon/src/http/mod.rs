//! HTTP request/response helper.

pub mod client;
pub mod response;

pub use client::{append_query, HttpClient};
pub use response::HttpResponse;
