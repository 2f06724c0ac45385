//! Backend selection.

use std::fmt;
use std::sync::Arc;

use poster_studio_sdk::{AuthService, DataService};
use tracing::{info, warn};

use crate::config::BackendConfig;
use crate::infra::memory::InMemoryBackend;
use crate::infra::rest::RestBackend;
use crate::infra::unavailable::UnavailableBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Hosted service over HTTP.
    Remote,
    /// In-process tables.
    Embedded,
    /// Nothing configured; every call fails.
    Unavailable,
}

/// Data and auth halves of one backend.
#[derive(Clone)]
pub struct Backend {
    pub data: Arc<dyn DataService>,
    pub auth: Arc<dyn AuthService>,
    pub kind: BackendKind,
}

impl Backend {
    /// Uses `backend` for both data and auth.
    #[must_use]
    pub fn from_shared<B>(backend: Arc<B>, kind: BackendKind) -> Self
    where
        B: DataService + AuthService + 'static,
    {
        Self {
            data: backend.clone(),
            auth: backend,
            kind,
        }
    }

    #[must_use]
    pub fn embedded(backend: Arc<InMemoryBackend>) -> Self {
        Self::from_shared(backend, BackendKind::Embedded)
    }

    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::from_shared(
            Arc::new(UnavailableBackend::new(reason)),
            BackendKind::Unavailable,
        )
    }
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Builds the remote backend from `config`.
///
/// Never fails: without a usable url and key the unavailable backend is
/// returned and every store runs on its fallback path.
#[must_use]
pub fn connect(config: &BackendConfig) -> Backend {
    match RestBackend::new(config) {
        Ok(rest) => {
            info!(
                url = config.url.as_ref().map_or("", url::Url::as_str),
                "Using remote backend"
            );
            Backend::from_shared(Arc::new(rest), BackendKind::Remote)
        }
        Err(e) => {
            warn!(error = %e, "Remote backend not available, using local fallbacks");
            Backend::unavailable(e.to_string())
        }
    }
}
