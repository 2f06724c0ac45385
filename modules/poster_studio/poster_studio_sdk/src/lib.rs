//! Poster Studio SDK
//!
//! Transport-agnostic contract between the poster-studio stores and the
//! remote data/auth service they sit in front of:
//! - record types for profiles, templates and user designs
//! - table query types and the [`DataService`] / [`AuthService`] traits
//! - the auth-change subscription handle
//! - error types shared by every backend and store

pub mod auth;
pub mod backend;
pub mod errors;
pub mod models;
pub mod query;
pub mod secret;

pub use auth::{AuthChange, AuthEvent, AuthListener, AuthListeners, AuthSubscription};
pub use backend::{AuthService, DataService, SignUpResult};
pub use errors::{ServiceError, StoreError};
pub use models::{
    DesignContent, NewUserDesign, Profile, ProfilePatch, Session, SubscriptionPlan,
    SubscriptionStatus, Template, TemplateCategory, User, UserDesign, UserDesignPatch,
};
pub use query::{Embed, Filter, Order, Query, Row, Table};
pub use secret::Secret;
