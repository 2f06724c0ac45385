use std::sync::Arc;

use tracing::{info, warn};

use crate::backend::{Backend, BackendKind, connect};
use crate::config::{StudioConfig, WriteMode};
use crate::domain::design_store::DesignStore;
use crate::domain::repo::PosterRepository;
use crate::domain::session_store::SessionStore;
use crate::infra::storage::TableRepository;

/// The two stores wired to one backend. Hand this to UI surfaces instead of
/// reaching for global state.
#[derive(Clone)]
pub struct Studio {
    pub session: Arc<SessionStore>,
    pub designs: Arc<DesignStore>,
    backend_kind: BackendKind,
}

impl Studio {
    #[must_use]
    pub fn new(backend: &Backend, write_mode: WriteMode) -> Self {
        let repo: Arc<dyn PosterRepository> = Arc::new(TableRepository::new(backend.data.clone()));
        let session = SessionStore::new(backend.auth.clone(), repo.clone());
        let designs = Arc::new(DesignStore::new(repo, session.clone(), write_mode));
        Self {
            session,
            designs,
            backend_kind: backend.kind,
        }
    }

    /// Connects to the configured backend; falls back to the unavailable one.
    #[must_use]
    pub fn connect(config: &StudioConfig) -> Self {
        Self::new(&connect(&config.backend), config.write_mode)
    }

    #[must_use]
    pub fn backend_kind(&self) -> BackendKind {
        self.backend_kind
    }

    /// Restores the session, loads the catalog, and loads the user's designs
    /// when a session was restored.
    pub async fn start(&self) {
        self.session.initialize().await;
        self.designs.fetch_templates().await;
        if self.session.user().is_some()
            && let Err(e) = self.designs.fetch_designs().await
        {
            warn!(error = %e, "Initial design load failed");
        }
        info!(backend = ?self.backend_kind, phase = ?self.session.snapshot().phase(), "Studio started");
    }

    /// Detaches from auth notifications.
    pub fn shutdown(&self) {
        self.session.shutdown();
    }
}
