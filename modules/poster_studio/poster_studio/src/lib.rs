//! Poster Studio Module Implementation
//!
//! The public contract is defined in `poster-studio-sdk` and re-exported here.
//! This crate provides the two state containers the UI talks to
//! ([`SessionStore`], [`DesignStore`]), bundled in a [`Studio`] context, plus
//! the backends they run against.

pub use poster_studio_sdk::{
    AuthService, DataService, DesignContent, Profile, ProfilePatch, ServiceError, Session,
    StoreError, SubscriptionPlan, SubscriptionStatus, Template, TemplateCategory, User,
    UserDesign, UserDesignPatch,
};

pub mod backend;
pub mod config;
pub mod studio;

pub use backend::{Backend, BackendKind, connect};
pub use config::{BackendConfig, StudioConfig, WriteMode};
pub use domain::design_store::{DesignState, DesignStore, TemplateFilter};
pub use domain::editor::{ExportFormat, editor_content, export_file_name};
pub use domain::session_store::{
    CreditCharge, SessionPhase, SessionState, SessionStore, SignInOutcome, SignUpOutcome,
};
pub use domain::{DataSource, WriteOutcome};
pub use infra::memory::InMemoryBackend;
pub use studio::Studio;

#[doc(hidden)]
pub mod domain;
#[doc(hidden)]
pub mod infra;
