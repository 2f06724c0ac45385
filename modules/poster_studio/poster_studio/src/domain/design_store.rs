//! Design collection store: the template catalog, the current user's
//! designs, and the design open in the editor.
//!
//! Mutations are not sequenced against each other. Two overlapping calls
//! resolve last-writer-wins in completion order.

use std::sync::Arc;

use poster_studio_sdk::{
    DesignContent, Profile, ServiceError, StoreError, Template, TemplateCategory, UserDesign,
    UserDesignPatch,
};
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::access;
use super::demo;
use super::editor;
use super::repo::PosterRepository;
use super::session_store::SessionStore;
use super::{DataSource, WriteOutcome};
use crate::config::WriteMode;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesignState {
    pub templates: Vec<Template>,
    /// Most recently updated first, as last fetched; new designs are prepended.
    pub designs: Vec<UserDesign>,
    pub current_design: Option<UserDesign>,
    /// True while [`DesignStore::fetch_designs`] runs.
    pub loading: bool,
}

/// Gallery filter. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateFilter {
    pub category: Option<TemplateCategory>,
    /// Case-insensitive substring of the template name.
    pub search: Option<String>,
}

impl TemplateFilter {
    #[must_use]
    pub fn matches(&self, template: &Template) -> bool {
        let category_ok = self.category.is_none_or(|c| c == template.category);
        let search_ok = self.search.as_deref().is_none_or(|term| {
            template
                .name
                .to_lowercase()
                .contains(&term.trim().to_lowercase())
        });
        category_ok && search_ok
    }
}

pub struct DesignStore {
    repo: Arc<dyn PosterRepository>,
    session: Arc<SessionStore>,
    write_mode: WriteMode,
    state: watch::Sender<DesignState>,
}

impl DesignStore {
    #[must_use]
    pub fn new(
        repo: Arc<dyn PosterRepository>,
        session: Arc<SessionStore>,
        write_mode: WriteMode,
    ) -> Self {
        Self {
            repo,
            session,
            write_mode,
            state: watch::Sender::new(DesignState::default()),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> DesignState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DesignState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn write_mode(&self) -> WriteMode {
        self.write_mode
    }

    #[must_use]
    pub fn designs(&self) -> Vec<UserDesign> {
        self.state.borrow().designs.clone()
    }

    #[must_use]
    pub fn current_design(&self) -> Option<UserDesign> {
        self.state.borrow().current_design.clone()
    }

    /// Loaded catalog entry with the given id.
    #[must_use]
    pub fn template(&self, id: &str) -> Option<Template> {
        self.state
            .borrow()
            .templates
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }

    #[must_use]
    pub fn filter_templates(&self, filter: &TemplateFilter) -> Vec<Template> {
        self.state
            .borrow()
            .templates
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect()
    }

    /// Templates `profile` may open.
    #[must_use]
    pub fn accessible_templates(&self, profile: Option<&Profile>) -> Vec<Template> {
        self.state
            .borrow()
            .templates
            .iter()
            .filter(|t| access::can_use_template(t, profile))
            .cloned()
            .collect()
    }

    /// Loads the catalog, substituting the built-in one when the backend fails.
    #[tracing::instrument(skip_all)]
    pub async fn fetch_templates(&self) -> DataSource {
        let (templates, source) = match self.repo.list_templates().await {
            Ok(templates) => (templates, DataSource::Remote),
            Err(e) => {
                warn!(error = %e, "Template fetch failed, using built-in catalog");
                (demo::templates(), DataSource::Fallback)
            }
        };
        debug!(count = templates.len(), ?source, "Templates loaded");
        self.state.send_modify(|s| s.templates = templates);
        source
    }

    /// Loads the current user's designs. A backend failure leaves the list
    /// empty.
    ///
    /// # Errors
    /// `AuthenticationRequired` when signed out; the list is cleared.
    #[tracing::instrument(skip_all)]
    pub async fn fetch_designs(&self) -> Result<DataSource, StoreError> {
        self.state.send_modify(|s| s.loading = true);

        let Some(user) = self.session.user() else {
            self.state.send_modify(|s| {
                s.designs.clear();
                s.loading = false;
            });
            return Err(StoreError::AuthenticationRequired);
        };

        let (designs, source) = match self.repo.list_designs(&user.id).await {
            Ok(designs) => (designs, DataSource::Remote),
            Err(e) => {
                warn!(error = %e, user_id = %user.id, "Design fetch failed, showing none");
                (Vec::new(), DataSource::Fallback)
            }
        };
        debug!(count = designs.len(), ?source, "Designs loaded");
        self.state.send_modify(|s| {
            s.designs = designs;
            s.loading = false;
        });
        Ok(source)
    }

    /// Creates a design from defaults and opens it. When the backend fails
    /// the design is synthesized locally.
    ///
    /// # Errors
    /// `AuthenticationRequired` when signed out.
    #[tracing::instrument(skip_all, fields(template_id = ?template_id))]
    pub async fn create_design(&self, template_id: Option<&str>) -> Result<UserDesign, StoreError> {
        let user = self
            .session
            .user()
            .ok_or(StoreError::AuthenticationRequired)?;
        let template = template_id.and_then(|id| self.template(id));
        let new = demo::new_design(&user.id, template_id, template.as_ref());

        let design = match self.repo.insert_design(&new).await {
            Ok(design) => {
                info!(design_id = %design.id, "Design created");
                design
            }
            Err(e) => {
                let now = OffsetDateTime::now_utc();
                let id = self.local_design_id(now);
                warn!(error = %e, design_id = %id, "Design insert failed, created locally");
                demo::design(id, new, template, now)
            }
        };

        self.state.send_modify(|s| {
            s.designs.insert(0, design.clone());
            s.current_design = Some(design.clone());
        });
        Ok(design)
    }

    /// Merges `patch` into the design with `id` in the list and, if open,
    /// in the current design.
    ///
    /// # Errors
    /// In confirmed mode, the backend failure; local state is then untouched.
    #[tracing::instrument(skip_all, fields(design_id = %id))]
    pub async fn update_design(
        &self,
        id: &str,
        patch: &UserDesignPatch,
    ) -> Result<WriteOutcome, StoreError> {
        if patch.is_empty() {
            return Ok(WriteOutcome::Synced);
        }
        let result = self.repo.update_design(id, patch).await;
        let stamped = result.as_ref().ok().copied();
        let outcome = self.settle(result.map(|_| ()), "update")?;

        // A synced write also takes the backend's `updated_at`.
        let merge = |design: &mut UserDesign| {
            design.apply(patch);
            if let Some(at) = stamped {
                design.updated_at = at;
            }
        };
        self.state.send_if_modified(|s| {
            let mut changed = false;
            for design in s.designs.iter_mut().filter(|d| d.id == id) {
                merge(design);
                changed = true;
            }
            if let Some(current) = s.current_design.as_mut().filter(|d| d.id == id) {
                merge(current);
                changed = true;
            }
            changed
        });
        Ok(outcome)
    }

    /// Removes the design with `id`, closing it if it is open.
    ///
    /// # Errors
    /// In confirmed mode, the backend failure; local state is then untouched.
    #[tracing::instrument(skip_all, fields(design_id = %id))]
    pub async fn delete_design(&self, id: &str) -> Result<WriteOutcome, StoreError> {
        let outcome = self.settle(self.repo.delete_design(id).await, "delete")?;

        self.state.send_if_modified(|s| {
            let before = s.designs.len();
            s.designs.retain(|d| d.id != id);
            let mut changed = s.designs.len() != before;
            if s.current_design.as_ref().is_some_and(|d| d.id == id) {
                s.current_design = None;
                changed = true;
            }
            changed
        });
        Ok(outcome)
    }

    pub fn set_current_design(&self, design: Option<UserDesign>) {
        self.state.send_modify(|s| s.current_design = design);
    }

    /// Persists editor content into the open design. Returns `None` when no
    /// design is open.
    ///
    /// # Errors
    /// As [`update_design`](Self::update_design).
    pub async fn save_design(
        &self,
        content: DesignContent,
    ) -> Result<Option<WriteOutcome>, StoreError> {
        let Some(id) = self.current_design().map(|d| d.id) else {
            debug!("No open design to save");
            return Ok(None);
        };
        let patch = editor::save_patch(content);
        self.update_design(&id, &patch).await.map(Some)
    }

    fn settle(
        &self,
        result: Result<(), ServiceError>,
        action: &'static str,
    ) -> Result<WriteOutcome, StoreError> {
        match (result, self.write_mode) {
            (Ok(()), _) => Ok(WriteOutcome::Synced),
            (Err(e), WriteMode::Optimistic) => {
                warn!(error = %e, action, "Backend write failed, applying locally");
                Ok(WriteOutcome::LocalOnly)
            }
            (Err(e), WriteMode::Confirmed) => {
                warn!(error = %e, action, "Backend write failed, local state kept");
                Err(e.into())
            }
        }
    }

    // Millisecond ids collide when two designs are synthesized in the same
    // millisecond.
    fn local_design_id(&self, now: OffsetDateTime) -> String {
        let base = demo::design_id(now);
        let state = self.state.borrow();
        let taken = |id: &str| state.designs.iter().any(|d| d.id == id);

        let mut id = base.clone();
        let mut n = 1u32;
        while taken(&id) {
            id = format!("{base}-{n}");
            n += 1;
        }
        id
    }
}
