//! Remote configuration source abstraction
//!
//! The agent only ever talks to the configuration service through the
//! [`ConfigClient`] trait: one call to fetch a full namespace snapshot and
//! one call to ask whether a namespace changed since the last observed
//! notification. Long-poll blocking behavior, transport, TLS and auth live
//! entirely inside the implementor.

mod http;
mod types;

pub use http::HttpConfigClient;
pub use types::{ConfigClient, ConfigSnapshot, FetchParams, NotificationUpdate, RemoteError};
