//! storefront-beacon: anonymous Measurement Protocol reporting for a
//! storefront plugin.
//!
//! A [`Reporter`] resolves the installation's client id from the host
//! [`ConfigStore`] (creating it on first use) and sends one form-encoded POST
//! per page view or event. Delivery is best effort and never surfaces as an
//! error.

pub mod config;
pub mod error;
pub mod hit;
pub mod http;
pub mod identity;
pub mod reporter;
pub mod stats;
pub mod store;

pub use config::BeaconConfig;
pub use error::StoreError;
pub use hit::{Event, PageView};
pub use http::{HttpClient, HttpResponse};
pub use identity::{generate_client_id, ClientIdentity};
pub use reporter::{Delivery, Reporter};
pub use store::{ConfigStore, FileStore, MemoryStore};
