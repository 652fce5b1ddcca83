//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait, a local implementation using
//! all-MiniLM-L6-v2 (384 dimensions, L2-normalized), and [`Embedder`], the lazily
//! initialized handle the rest of the crate goes through. A missing or broken provider
//! never fails a request: [`Embedder::embed`] returns `None` and callers fall back to
//! keyword-only scoring.

pub mod local;

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config::{EmbeddingConfig, ProviderKind};

/// Number of dimensions in the embedding vectors (all-MiniLM-L6-v2).
pub const EMBEDDING_DIM: usize = 384;

/// Trait for embedding text into vectors.
///
/// All methods are synchronous; [`Embedder`] moves calls onto the blocking pool.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of text strings. Implementations may override for batched inference.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Return the number of dimensions this provider produces.
    fn dimensions(&self) -> usize {
        EMBEDDING_DIM
    }
}

type Loader = Arc<dyn Fn() -> Result<Arc<dyn EmbeddingProvider>> + Send + Sync>;

/// Cached outcome of provider initialization.
enum ProviderState {
    Disabled,
    Ready(Arc<dyn EmbeddingProvider>),
    Failed(String),
}

/// Where an [`Embedder`] stands. Drives the user-facing "why no vectors" message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedderStatus {
    /// Provider configured but not loaded yet.
    Pending,
    /// No provider configured.
    NotConfigured,
    Ready,
    /// Provider configured but the load failed.
    Failed(String),
}

impl EmbedderStatus {
    /// Message explaining why semantic search is off, or `None` when it is on (or not tried).
    pub fn unavailable_message(&self) -> Option<String> {
        match self {
            Self::NotConfigured => Some(
                "semantic search not configured: set [embedding] provider = \"local\"".into(),
            ),
            Self::Failed(reason) => Some(format!(
                "embedding model failed to load ({reason}); using keyword search only"
            )),
            Self::Pending | Self::Ready => None,
        }
    }
}

/// Single-flight, lazily loaded embedding provider.
///
/// The first caller of [`initialize`](Self::initialize) (or [`embed`](Self::embed)) runs
/// the loader; concurrent callers await that same load, and every later caller reuses
/// the cached ready/failed state.
pub struct Embedder {
    model: Option<String>,
    loader: Option<Loader>,
    state: OnceCell<ProviderState>,
}

impl Embedder {
    /// Build from configuration. Nothing is loaded until first use.
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        match config.provider {
            ProviderKind::None => Self::disabled(),
            ProviderKind::Local => {
                let config = config.clone();
                Self::with_loader(config.model.clone(), move || {
                    let provider = local::LocalEmbeddingProvider::new(&config)?;
                    Ok(Arc::new(provider) as Arc<dyn EmbeddingProvider>)
                })
            }
        }
    }

    /// An embedder with no provider. `embed` always returns `None`.
    pub fn disabled() -> Self {
        Self {
            model: None,
            loader: None,
            state: OnceCell::new(),
        }
    }

    /// An embedder whose provider is produced by `loader` on first use.
    pub fn with_loader<F>(model: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn EmbeddingProvider>> + Send + Sync + 'static,
    {
        Self {
            model: Some(model.into()),
            loader: Some(Arc::new(loader)),
            state: OnceCell::new(),
        }
    }

    /// Label of the configured model, recorded in the index header.
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    async fn state(&self) -> &ProviderState {
        self.state
            .get_or_init(|| async {
                let Some(loader) = self.loader.clone() else {
                    return ProviderState::Disabled;
                };
                match tokio::task::spawn_blocking(move || loader()).await {
                    Ok(Ok(provider)) => {
                        tracing::info!(model = ?self.model, "embedding provider ready");
                        ProviderState::Ready(provider)
                    }
                    Ok(Err(e)) => {
                        tracing::warn!(model = ?self.model, "embedding provider failed to load: {e:#}");
                        ProviderState::Failed(format!("{e:#}"))
                    }
                    Err(e) => {
                        tracing::warn!("embedding provider load task failed: {e}");
                        ProviderState::Failed(e.to_string())
                    }
                }
            })
            .await
    }

    /// Load the provider if needed. Returns `true` when it is ready.
    pub async fn initialize(&self) -> bool {
        matches!(self.state().await, ProviderState::Ready(_))
    }

    /// Current status without triggering a load.
    pub fn status(&self) -> EmbedderStatus {
        match self.state.get() {
            None if self.loader.is_none() => EmbedderStatus::NotConfigured,
            None => EmbedderStatus::Pending,
            Some(ProviderState::Disabled) => EmbedderStatus::NotConfigured,
            Some(ProviderState::Ready(_)) => EmbedderStatus::Ready,
            Some(ProviderState::Failed(reason)) => EmbedderStatus::Failed(reason.clone()),
        }
    }

    /// Embed `text`, or `None` if no provider is available, inference failed, or the
    /// vector does not have the provider's declared dimensionality.
    pub async fn embed(&self, text: &str) -> Option<Vec<f32>> {
        let ProviderState::Ready(provider) = self.state().await else {
            return None;
        };
        let provider = Arc::clone(provider);
        let expected = provider.dimensions();
        let text = text.to_string();
        match tokio::task::spawn_blocking(move || provider.embed(&text)).await {
            Ok(Ok(vector)) if vector.len() == expected => Some(vector),
            Ok(Ok(vector)) => {
                tracing::warn!(
                    expected,
                    got = vector.len(),
                    "embedding has wrong dimensionality, discarding"
                );
                None
            }
            Ok(Err(e)) => {
                tracing::warn!("embedding failed: {e:#}");
                None
            }
            Err(e) => {
                tracing::warn!("embedding task failed: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Constant;

    impl EmbeddingProvider for Constant {
        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.5; EMBEDDING_DIM])
        }
    }

    #[tokio::test]
    async fn disabled_embedder_reports_not_configured() {
        let embedder = Embedder::disabled();
        assert_eq!(embedder.status(), EmbedderStatus::NotConfigured);
        assert!(!embedder.initialize().await);
        assert!(embedder.embed("hello").await.is_none());
        assert!(embedder
            .status()
            .unavailable_message()
            .unwrap()
            .contains("not configured"));
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_load() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let embedder = Embedder::with_loader("test-model", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(50));
            Ok(Arc::new(Constant) as Arc<dyn EmbeddingProvider>)
        });
        assert_eq!(embedder.status(), EmbedderStatus::Pending);

        let (a, b, c) = tokio::join!(
            embedder.initialize(),
            embedder.initialize(),
            embedder.embed("x")
        );
        assert!(a && b);
        assert_eq!(c.unwrap().len(), EMBEDDING_DIM);
        assert!(embedder.initialize().await);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(embedder.status(), EmbedderStatus::Ready);
    }

    /// Declares the standard width but returns a short vector.
    struct Truncated;

    impl EmbeddingProvider for Truncated {
        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0; 8])
        }
    }

    #[tokio::test]
    async fn wrong_length_vectors_are_discarded() {
        let embedder = Embedder::with_loader("truncated", || {
            Ok(Arc::new(Truncated) as Arc<dyn EmbeddingProvider>)
        });
        assert!(embedder.initialize().await);
        assert!(embedder.embed("x").await.is_none());
    }

    #[tokio::test]
    async fn failed_load_is_cached_and_distinct() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        let embedder = Embedder::with_loader("missing", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("model.onnx not found")
        });

        assert!(!embedder.initialize().await);
        assert!(embedder.embed("x").await.is_none());
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        let message = embedder.status().unavailable_message().unwrap();
        assert!(message.contains("failed to load"));
        assert!(message.contains("model.onnx not found"));
    }

    #[test]
    fn none_provider_from_config() {
        let config = EmbeddingConfig {
            provider: ProviderKind::None,
            ..EmbeddingConfig::default()
        };
        let embedder = Embedder::from_config(&config);
        assert!(embedder.model().is_none());
        assert_eq!(embedder.status(), EmbedderStatus::NotConfigured);
    }
}
