use std::future::Future;
use std::pin::Pin;

use crate::{GenerationRequest, GenerationResult, ProviderError, ProviderId};

pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Something that turns one generation request into one result.
///
/// Implementations perform exactly one upstream call per `generate`; retry
/// decisions belong to the caller.
pub trait ModelProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn generate<'a>(
        &'a self,
        request: GenerationRequest,
    ) -> ProviderFuture<'a, Result<GenerationResult, ProviderError>>;
}
