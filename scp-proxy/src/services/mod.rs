//! Outbound catalog services

pub mod catalog_client;
pub mod stream_resolver;

pub use catalog_client::CatalogClient;
pub use stream_resolver::{select_transcoding, StreamResolver};
