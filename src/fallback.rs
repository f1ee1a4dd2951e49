//! Primary/secondary routing for provider-driven stages.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::error::ProviderError;
use crate::providers::{Provider, ProviderSet};

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Extraction,
    Transcription,
    Summarization,
    Translation,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extraction => "extraction",
            Stage::Transcription => "transcription",
            Stage::Summarization => "summarization",
            Stage::Translation => "translation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Extraction => "Audio extraction",
            Stage::Transcription => "Transcription",
            Stage::Summarization => "Summarization",
            Stage::Translation => "Translation",
        })
    }
}

/// Runs stage work on the primary provider and, for retryable failures when
/// fallback is enabled, exactly once on the secondary.
pub struct FallbackRouter<P: ?Sized> {
    stage: Stage,
    providers: ProviderSet<P>,
    fallback_enabled: bool,
    call_timeout: Duration,
}

impl<P: Provider + ?Sized> FallbackRouter<P> {
    pub fn new(stage: Stage, providers: ProviderSet<P>, fallback_enabled: bool, call_timeout: Duration) -> Self {
        Self {
            stage,
            providers,
            fallback_enabled,
            call_timeout,
        }
    }

    /// Run `call` against the configured providers.
    pub async fn route<T, F, Fut>(&self, call: F) -> Result<T, ProviderError>
    where
        F: Fn(Arc<P>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let primary = Arc::clone(&self.providers.primary);
        let primary_error = match self.attempt(primary, &call).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        let secondary = match (&self.providers.secondary, self.fallback_enabled, primary_error.is_retryable()) {
            (Some(secondary), true, true) => Arc::clone(secondary),
            _ => return Err(primary_error),
        };

        warn!(
            stage = self.stage.as_str(),
            primary = %primary_error.provider,
            secondary = secondary.name(),
            "🔄 {} failed on primary, falling back: {}",
            self.stage,
            primary_error.message
        );

        self.attempt(secondary, &call).await.map_err(|secondary_error| ProviderError {
            provider: secondary_error.provider.clone(),
            message: format!(
                "{}; fallback {} also failed: {}",
                primary_error, secondary_error.provider, secondary_error.message
            ),
            retryable: secondary_error.retryable,
        })
    }

    async fn attempt<T, F, Fut>(&self, provider: Arc<P>, call: &F) -> Result<T, ProviderError>
    where
        F: Fn(Arc<P>) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let name = provider.name().to_string();
        let started = Instant::now();

        let result = match tokio::time::timeout(self.call_timeout, call(provider)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::retryable(
                name.clone(),
                format!("timed out after {}s", self.call_timeout.as_secs_f64()),
            )),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => info!(stage = self.stage.as_str(), provider = %name, elapsed_ms, "provider call succeeded"),
            Err(e) => warn!(
                stage = self.stage.as_str(),
                provider = %name,
                elapsed_ms,
                retryable = e.retryable,
                "provider call failed: {}",
                e.message
            ),
        }
        result
    }
}
