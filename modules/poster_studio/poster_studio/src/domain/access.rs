//! Derived access rules.
//!
//! Advisory only: they decide what the UI offers, the backend still enforces
//! its own authorization.

use poster_studio_sdk::{Profile, Template};

/// Subscription active or at least one credit left.
#[must_use]
pub fn has_paid_access(profile: Option<&Profile>) -> bool {
    profile.is_some_and(|p| p.has_active_subscription() || p.credits_remaining > 0)
}

/// Non-premium templates are open to everyone; premium ones need paid access.
#[must_use]
pub fn can_use_template(template: &Template, profile: Option<&Profile>) -> bool {
    !template.is_premium || has_paid_access(profile)
}

/// Exporting a poster consumes paid access.
#[must_use]
pub fn can_export(profile: Option<&Profile>) -> bool {
    has_paid_access(profile)
}
