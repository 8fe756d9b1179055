use checkview_types::{ChangeData, FetchResponse};
use futures::future::BoxFuture;

/// A registered source of check data.
///
/// Responsibilities:
/// - Fetch runs, actions and links for one change + patchset
/// - Classify its own failures as `FetchResponse::Error` / `NotLoggedIn`
///
/// Returning `Err` (or panicking) is treated as an unrecoverable failure:
/// the provider is marked failed for that patchset context and never polled
/// again for the lifetime of the model.
pub trait CheckProvider: Send + Sync {
    fn fetch(&self, data: ChangeData) -> BoxFuture<'static, anyhow::Result<FetchResponse>>;
}

impl<F> CheckProvider for F
where
    F: Fn(ChangeData) -> BoxFuture<'static, anyhow::Result<FetchResponse>> + Send + Sync,
{
    fn fetch(&self, data: ChangeData) -> BoxFuture<'static, anyhow::Result<FetchResponse>> {
        self(data)
    }
}
