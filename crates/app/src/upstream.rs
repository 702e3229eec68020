//! Bounded calls to upstream collaborators.

use std::future::Future;
use std::time::Duration;

use adrules_domain::error::UpstreamError;

pub(crate) const CAMPAIGN_CLIENT: &str = "campaign_client";
pub(crate) const ALERT_SENDER: &str = "alert_sender";

/// Await `call` for at most `after`; expiry becomes [`UpstreamError::Timeout`].
pub(crate) async fn bounded<T, F>(
    service: &'static str,
    after: Duration,
    call: F,
) -> Result<T, UpstreamError>
where
    F: Future<Output = Result<T, UpstreamError>>,
{
    tokio::time::timeout(after, call)
        .await
        .unwrap_or(Err(UpstreamError::Timeout { service, after }))
}
