//! Collaborator seams: prayer-time lookup and outbound messaging.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::{ResolveError, TransportError};
use crate::tenant::{Location, TenantId, TriggerSet};

/// Resolves a location to its five prayer times for a date.
#[async_trait]
pub trait TriggerResolver: Send + Sync {
    fn name(&self) -> &str;

    async fn resolve(&self, location: &Location, date: NaiveDate)
    -> Result<TriggerSet, ResolveError>;
}

/// Outbound delivery to a tenant's chat.
#[async_trait]
pub trait Transport: Send + Sync {
    fn name(&self) -> &str;

    /// Send a batch of images as one album; the caption goes on the first image.
    async fn send_album(
        &self,
        tenant: TenantId,
        image_urls: &[String],
        caption: &str,
    ) -> Result<(), TransportError>;

    async fn send_text(&self, tenant: TenantId, text: &str) -> Result<(), TransportError>;

    async fn send_photo(
        &self,
        tenant: TenantId,
        image_url: &str,
        caption: &str,
    ) -> Result<(), TransportError>;
}
