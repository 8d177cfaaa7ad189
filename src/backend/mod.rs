pub mod client;
pub mod models;
pub mod realtime;

use async_trait::async_trait;

pub use client::SupabaseClient;
pub use models::RawReading;
pub use realtime::{ConnectionStatus, RealtimeEvent, Subscription};

use crate::error::AppResult;

/// The slice of the backend the live pipeline depends on.
#[async_trait]
pub trait ReadingsBackend: Send + Sync {
    /// Newest `limit` readings, newest first; all devices when `device_id` is `None`.
    async fn fetch_latest_readings(
        &self,
        device_id: Option<&str>,
        limit: usize,
    ) -> AppResult<Vec<RawReading>>;

    /// Start a push subscription for inserted readings.
    fn subscribe_readings(&self) -> Subscription;
}
