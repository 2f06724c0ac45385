//! Locally synthesized records used when the backend cannot answer.
//!
//! Every value here is deterministic except the timestamps passed in, so
//! repeated fallbacks produce identical data.

use poster_studio_sdk::{
    DesignContent, NewUserDesign, Profile, SubscriptionPlan, SubscriptionStatus, Template,
    TemplateCategory, User, UserDesign,
};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::macros::datetime;

pub const DEMO_USER_ID: &str = "demo-user-id";
pub const DEMO_EMAIL: &str = "demo@example.com";
pub const DEMO_FULL_NAME: &str = "Demo User";
pub const DEMO_CREDITS: u32 = 3;

pub const DEFAULT_TITLE: &str = "Your Amazing Offer";
pub const DEFAULT_SUBTITLE: &str = "Limited Time Only";
pub const DEFAULT_DESCRIPTION: &str = "Get the best deals and offers from our amazing collection.";
pub const DEFAULT_PRICE: &str = "KES 2,999";
pub const DEFAULT_ORIGINAL_PRICE: &str = "KES 4,999";
pub const DEFAULT_CONTACT: &str = "+254 700 123 456";
pub const DEFAULT_BG_COLOR: &str = "from-purple-600 to-blue-600";
pub const DEFAULT_TEXT_COLOR: &str = "text-white";

const CATALOG_CREATED_AT: OffsetDateTime = datetime!(2024-01-01 0:00 UTC);

/// Identity used when sign-in or sign-up cannot reach the auth service.
#[must_use]
pub fn user(email: &str, now: OffsetDateTime) -> User {
    User {
        id: DEMO_USER_ID.to_owned(),
        email: Some(email.to_owned()),
        created_at: now,
        updated_at: now,
    }
}

/// Free-plan profile with the starter credit balance.
#[must_use]
pub fn profile_for(user: &User, now: OffsetDateTime) -> Profile {
    Profile {
        id: user.id.clone(),
        email: user.email.clone().unwrap_or_else(|| DEMO_EMAIL.to_owned()),
        full_name: Some(DEMO_FULL_NAME.to_owned()),
        avatar_url: None,
        subscription_plan: SubscriptionPlan::Free,
        subscription_status: SubscriptionStatus::Inactive,
        subscription_end_date: None,
        credits_remaining: DEMO_CREDITS,
        created_at: now,
        updated_at: now,
    }
}

/// Placeholder content of a fresh design, colored by its template if any.
#[must_use]
pub fn default_content(template: Option<&Template>) -> DesignContent {
    DesignContent {
        title: DEFAULT_TITLE.to_owned(),
        subtitle: DEFAULT_SUBTITLE.to_owned(),
        description: DEFAULT_DESCRIPTION.to_owned(),
        price: DEFAULT_PRICE.to_owned(),
        original_price: DEFAULT_ORIGINAL_PRICE.to_owned(),
        contact: DEFAULT_CONTACT.to_owned(),
        bg_color: template.map_or_else(
            || DEFAULT_BG_COLOR.to_owned(),
            |t| t.color_scheme.clone(),
        ),
        text_color: DEFAULT_TEXT_COLOR.to_owned(),
        logo_url: None,
    }
}

/// Insert payload for a new design owned by `user_id`.
#[must_use]
pub fn new_design(
    user_id: &str,
    template_id: Option<&str>,
    template: Option<&Template>,
) -> NewUserDesign {
    NewUserDesign {
        user_id: user_id.to_owned(),
        template_id: template_id.map(ToOwned::to_owned),
        content: default_content(template),
        design_data: Value::Object(Map::new()),
    }
}

/// Local id for a synthesized design, derived from the creation time.
#[must_use]
pub fn design_id(now: OffsetDateTime) -> String {
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    format!("demo-design-{millis}")
}

/// Builds the design the service would have returned for `new`.
#[must_use]
pub fn design(
    id: String,
    new: NewUserDesign,
    template: Option<Template>,
    now: OffsetDateTime,
) -> UserDesign {
    let NewUserDesign {
        user_id,
        template_id,
        content,
        design_data,
    } = new;
    UserDesign {
        id,
        user_id,
        template_id,
        title: content.title,
        subtitle: content.subtitle,
        description: content.description,
        price: content.price,
        original_price: content.original_price,
        contact: content.contact,
        bg_color: content.bg_color,
        text_color: content.text_color,
        logo_url: content.logo_url,
        design_data,
        created_at: now,
        updated_at: now,
        template,
    }
}

/// The fixed offline catalog, popular entries first.
#[must_use]
pub fn templates() -> Vec<Template> {
    let entry = |id: &str,
                 name: &str,
                 category: TemplateCategory,
                 photo: u32,
                 color_scheme: &str,
                 is_premium: bool,
                 is_popular: bool,
                 usage_count: u64| Template {
        id: id.to_owned(),
        name: name.to_owned(),
        category,
        preview_url: Some(format!(
            "https://images.pexels.com/photos/{photo}/pexels-photo-{photo}.jpeg?auto=compress&cs=tinysrgb&w=400"
        )),
        color_scheme: color_scheme.to_owned(),
        is_premium,
        is_popular,
        usage_count,
        created_at: CATALOG_CREATED_AT,
    };

    vec![
        entry(
            "1",
            "Restaurant Special",
            TemplateCategory::Restaurant,
            1_640_777,
            "from-red-500 to-orange-500",
            false,
            true,
            150,
        ),
        entry(
            "2",
            "Grand Opening",
            TemplateCategory::Event,
            1_190_298,
            "from-purple-500 to-pink-500",
            false,
            true,
            120,
        ),
        entry(
            "3",
            "Beauty Salon",
            TemplateCategory::Beauty,
            3_993_449,
            "from-pink-500 to-rose-500",
            true,
            false,
            80,
        ),
        entry(
            "4",
            "Business Promo",
            TemplateCategory::Business,
            3_184_291,
            "from-blue-500 to-cyan-500",
            false,
            true,
            200,
        ),
        entry(
            "5",
            "Flash Sale",
            TemplateCategory::Sale,
            3_962_294,
            "from-yellow-500 to-orange-500",
            false,
            false,
            95,
        ),
        entry(
            "6",
            "Service Offer",
            TemplateCategory::Service,
            3_184_338,
            "from-green-500 to-teal-500",
            true,
            true,
            110,
        ),
    ]
}
