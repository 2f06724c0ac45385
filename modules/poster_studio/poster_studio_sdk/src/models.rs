//! Public models for the poster-studio module.
//!
//! These are transport-agnostic data structures that define the contract
//! between the stores, the backends, and the UI surfaces consuming them.
//! Wire shapes live with the backends; nothing here derives serde.

use serde_json::Value;
use time::OffsetDateTime;

use crate::secret::Secret;

/// Authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// An authenticated session as issued by the auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
    pub access_token: Secret,
    pub refresh_token: Option<Secret>,
    pub expires_at: Option<OffsetDateTime>,
}

impl Session {
    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionPlan {
    Free,
    Weekly,
    Monthly,
}

impl SubscriptionPlan {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "free" => Some(Self::Free),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Cancelled,
}

impl SubscriptionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Per-user billing profile, keyed by user id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub subscription_plan: SubscriptionPlan,
    pub subscription_status: SubscriptionStatus,
    pub subscription_end_date: Option<OffsetDateTime>,
    pub credits_remaining: u32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Profile {
    #[must_use]
    pub fn has_active_subscription(&self) -> bool {
        self.subscription_status == SubscriptionStatus::Active
    }

    /// Display label of the plan the user is effectively on.
    #[must_use]
    pub fn plan_label(&self) -> &'static str {
        if !self.has_active_subscription() {
            return "Free Plan";
        }
        match self.subscription_plan {
            SubscriptionPlan::Free => "Free Plan",
            SubscriptionPlan::Weekly => "Weekly Plan",
            SubscriptionPlan::Monthly => "Monthly Plan",
        }
    }

    /// Merges the fields present in `patch`; everything else is kept.
    pub fn apply(&mut self, patch: &ProfilePatch) {
        if let Some(full_name) = &patch.full_name {
            self.full_name.clone_from(full_name);
        }
        if let Some(avatar_url) = &patch.avatar_url {
            self.avatar_url.clone_from(avatar_url);
        }
        if let Some(plan) = patch.subscription_plan {
            self.subscription_plan = plan;
        }
        if let Some(status) = patch.subscription_status {
            self.subscription_status = status;
        }
        if let Some(end_date) = patch.subscription_end_date {
            self.subscription_end_date = end_date;
        }
        if let Some(credits) = patch.credits_remaining {
            self.credits_remaining = credits;
        }
    }
}

/// Partial profile update. `None` leaves a field untouched; for nullable
/// fields `Some(None)` clears it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProfilePatch {
    pub full_name: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
    pub subscription_plan: Option<SubscriptionPlan>,
    pub subscription_status: Option<SubscriptionStatus>,
    pub subscription_end_date: Option<Option<OffsetDateTime>>,
    pub credits_remaining: Option<u32>,
}

impl ProfilePatch {
    #[must_use]
    pub fn credits(credits_remaining: u32) -> Self {
        Self {
            credits_remaining: Some(credits_remaining),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateCategory {
    Restaurant,
    Event,
    Beauty,
    Business,
    Sale,
    Service,
}

impl TemplateCategory {
    pub const ALL: [Self; 6] = [
        Self::Restaurant,
        Self::Event,
        Self::Beauty,
        Self::Business,
        Self::Sale,
        Self::Service,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Restaurant => "Restaurant",
            Self::Event => "Event",
            Self::Beauty => "Beauty",
            Self::Business => "Business",
            Self::Sale => "Sale",
            Self::Service => "Service",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == value)
    }
}

/// Immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub category: TemplateCategory,
    pub preview_url: Option<String>,
    pub color_scheme: String,
    pub is_premium: bool,
    pub is_popular: bool,
    pub usage_count: u64,
    pub created_at: OffsetDateTime,
}

/// A user's editable poster instance.
#[derive(Debug, Clone, PartialEq)]
pub struct UserDesign {
    pub id: String,
    pub user_id: String,
    pub template_id: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub price: String,
    pub original_price: String,
    pub contact: String,
    pub bg_color: String,
    pub text_color: String,
    pub logo_url: Option<String>,
    /// Full editor state snapshot; opaque to the core.
    pub design_data: Value,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    /// Originating template, joined in by reads that request it.
    pub template: Option<Template>,
}

impl UserDesign {
    /// Merges the fields present in `patch`; everything else is kept.
    pub fn apply(&mut self, patch: &UserDesignPatch) {
        fn set(target: &mut String, value: Option<&String>) {
            if let Some(value) = value {
                target.clone_from(value);
            }
        }

        set(&mut self.title, patch.title.as_ref());
        set(&mut self.subtitle, patch.subtitle.as_ref());
        set(&mut self.description, patch.description.as_ref());
        set(&mut self.price, patch.price.as_ref());
        set(&mut self.original_price, patch.original_price.as_ref());
        set(&mut self.contact, patch.contact.as_ref());
        set(&mut self.bg_color, patch.bg_color.as_ref());
        set(&mut self.text_color, patch.text_color.as_ref());
        if let Some(template_id) = &patch.template_id {
            self.template_id.clone_from(template_id);
        }
        if let Some(logo_url) = &patch.logo_url {
            self.logo_url.clone_from(logo_url);
        }
        if let Some(design_data) = &patch.design_data {
            self.design_data.clone_from(design_data);
        }
    }
}

/// Fields of a design row to insert. Identity and timestamps are assigned by
/// the service.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUserDesign {
    pub user_id: String,
    pub template_id: Option<String>,
    pub content: DesignContent,
    pub design_data: Value,
}

/// Partial design update. `None` leaves a field untouched; for nullable
/// fields `Some(None)` clears it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserDesignPatch {
    pub template_id: Option<Option<String>>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub original_price: Option<String>,
    pub contact: Option<String>,
    pub bg_color: Option<String>,
    pub text_color: Option<String>,
    pub logo_url: Option<Option<String>>,
    pub design_data: Option<Value>,
}

impl UserDesignPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// The editable field set the visual editor renders and hands back on save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesignContent {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub price: String,
    pub original_price: String,
    pub contact: String,
    pub bg_color: String,
    pub text_color: String,
    pub logo_url: Option<String>,
}
