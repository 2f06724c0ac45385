//! Row encoding and decoding at the data-service boundary.
//!
//! Rows are decoded through serde row structs and then checked against the
//! record invariants; anything that does not fit becomes
//! [`ServiceError::InvalidRecord`].

use poster_studio_sdk::{
    NewUserDesign, Profile, ProfilePatch, Row, ServiceError, SubscriptionPlan, SubscriptionStatus,
    Table, Template, TemplateCategory, UserDesign, UserDesignPatch,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Serialize, Deserialize)]
struct ProfileRow {
    id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    avatar_url: Option<String>,
    subscription_plan: String,
    subscription_status: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    subscription_end_date: Option<OffsetDateTime>,
    credits_remaining: i64,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
}

#[derive(Debug, Serialize, Deserialize)]
struct TemplateRow {
    id: String,
    name: String,
    category: String,
    #[serde(default)]
    preview_url: Option<String>,
    color_scheme: String,
    #[serde(default)]
    is_premium: bool,
    #[serde(default)]
    is_popular: bool,
    #[serde(default)]
    usage_count: u64,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
struct DesignRow {
    id: String,
    user_id: String,
    #[serde(default)]
    template_id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    subtitle: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    price: String,
    #[serde(default)]
    original_price: String,
    #[serde(default)]
    contact: String,
    #[serde(default)]
    bg_color: String,
    #[serde(default)]
    text_color: String,
    #[serde(default)]
    logo_url: Option<String>,
    #[serde(default)]
    design_data: Value,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    updated_at: OffsetDateTime,
    #[serde(default)]
    template: Option<TemplateRow>,
}

#[derive(Debug, Serialize)]
struct NewDesignRow<'a> {
    user_id: &'a str,
    template_id: Option<&'a str>,
    title: &'a str,
    subtitle: &'a str,
    description: &'a str,
    price: &'a str,
    original_price: &'a str,
    contact: &'a str,
    bg_color: &'a str,
    text_color: &'a str,
    logo_url: Option<&'a str>,
    design_data: &'a Value,
}

fn decode<T: DeserializeOwned>(table: Table, row: Row) -> Result<T, ServiceError> {
    serde_json::from_value(Value::Object(row))
        .map_err(|e| ServiceError::invalid_record(table, e.to_string()))
}

fn encode<T: Serialize>(table: Table, value: &T) -> Result<Row, ServiceError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(other) => Err(ServiceError::invalid_record(
            table,
            format!("expected an object, got {other}"),
        )),
        Err(e) => Err(ServiceError::invalid_record(table, e.to_string())),
    }
}

/// RFC 3339 text of `at`, as stored in timestamp columns.
pub fn timestamp(table: Table, at: OffsetDateTime) -> Result<Value, ServiceError> {
    at.format(&Rfc3339)
        .map(Value::String)
        .map_err(|e| ServiceError::invalid_record(table, e.to_string()))
}

/// Server-stamped `updated_at` of a stored row, if it carries a readable one.
pub fn updated_at_from_row(row: &Row) -> Option<OffsetDateTime> {
    let text = row.get("updated_at")?.as_str()?;
    OffsetDateTime::parse(text, &Rfc3339).ok()
}

pub fn profile_from_row(row: Row) -> Result<Profile, ServiceError> {
    let r: ProfileRow = decode(Table::Profiles, row)?;
    let invalid = |message: String| ServiceError::invalid_record(Table::Profiles, message);

    let subscription_plan = SubscriptionPlan::parse(&r.subscription_plan)
        .ok_or_else(|| invalid(format!("unknown plan '{}'", r.subscription_plan)))?;
    let subscription_status = SubscriptionStatus::parse(&r.subscription_status)
        .ok_or_else(|| invalid(format!("unknown status '{}'", r.subscription_status)))?;
    let credits_remaining = u32::try_from(r.credits_remaining)
        .map_err(|_| invalid(format!("credits out of range: {}", r.credits_remaining)))?;

    Ok(Profile {
        id: r.id,
        email: r.email,
        full_name: r.full_name,
        avatar_url: r.avatar_url,
        subscription_plan,
        subscription_status,
        subscription_end_date: r.subscription_end_date,
        credits_remaining,
        created_at: r.created_at,
        updated_at: r.updated_at,
    })
}

pub fn profile_to_row(profile: &Profile) -> Result<Row, ServiceError> {
    let row = ProfileRow {
        id: profile.id.clone(),
        email: profile.email.clone(),
        full_name: profile.full_name.clone(),
        avatar_url: profile.avatar_url.clone(),
        subscription_plan: profile.subscription_plan.as_str().to_owned(),
        subscription_status: profile.subscription_status.as_str().to_owned(),
        subscription_end_date: profile.subscription_end_date,
        credits_remaining: i64::from(profile.credits_remaining),
        created_at: profile.created_at,
        updated_at: profile.updated_at,
    };
    encode(Table::Profiles, &row)
}

pub fn profile_patch_to_row(patch: &ProfilePatch) -> Result<Row, ServiceError> {
    let mut row = Map::new();
    if let Some(full_name) = &patch.full_name {
        row.insert("full_name".to_owned(), full_name.clone().into());
    }
    if let Some(avatar_url) = &patch.avatar_url {
        row.insert("avatar_url".to_owned(), avatar_url.clone().into());
    }
    if let Some(plan) = patch.subscription_plan {
        row.insert("subscription_plan".to_owned(), plan.as_str().into());
    }
    if let Some(status) = patch.subscription_status {
        row.insert("subscription_status".to_owned(), status.as_str().into());
    }
    if let Some(end_date) = patch.subscription_end_date {
        let value = match end_date {
            Some(at) => timestamp(Table::Profiles, at)?,
            None => Value::Null,
        };
        row.insert("subscription_end_date".to_owned(), value);
    }
    if let Some(credits) = patch.credits_remaining {
        row.insert("credits_remaining".to_owned(), credits.into());
    }
    Ok(row)
}

fn template_from_record(r: TemplateRow) -> Result<Template, ServiceError> {
    let category = TemplateCategory::parse(&r.category).ok_or_else(|| {
        ServiceError::invalid_record(
            Table::Templates,
            format!("unknown category '{}'", r.category),
        )
    })?;
    Ok(Template {
        id: r.id,
        name: r.name,
        category,
        preview_url: r.preview_url,
        color_scheme: r.color_scheme,
        is_premium: r.is_premium,
        is_popular: r.is_popular,
        usage_count: r.usage_count,
        created_at: r.created_at,
    })
}

pub fn template_from_row(row: Row) -> Result<Template, ServiceError> {
    template_from_record(decode(Table::Templates, row)?)
}

pub fn template_to_row(template: &Template) -> Result<Row, ServiceError> {
    let row = TemplateRow {
        id: template.id.clone(),
        name: template.name.clone(),
        category: template.category.as_str().to_owned(),
        preview_url: template.preview_url.clone(),
        color_scheme: template.color_scheme.clone(),
        is_premium: template.is_premium,
        is_popular: template.is_popular,
        usage_count: template.usage_count,
        created_at: template.created_at,
    };
    encode(Table::Templates, &row)
}

pub fn design_from_row(row: Row) -> Result<UserDesign, ServiceError> {
    let r: DesignRow = decode(Table::UserDesigns, row)?;
    let template = r.template.map(template_from_record).transpose()?;
    let design_data = match r.design_data {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };

    Ok(UserDesign {
        id: r.id,
        user_id: r.user_id,
        template_id: r.template_id,
        title: r.title,
        subtitle: r.subtitle,
        description: r.description,
        price: r.price,
        original_price: r.original_price,
        contact: r.contact,
        bg_color: r.bg_color,
        text_color: r.text_color,
        logo_url: r.logo_url,
        design_data,
        created_at: r.created_at,
        updated_at: r.updated_at,
        template,
    })
}

pub fn new_design_to_row(design: &NewUserDesign) -> Result<Row, ServiceError> {
    let c = &design.content;
    let row = NewDesignRow {
        user_id: &design.user_id,
        template_id: design.template_id.as_deref(),
        title: &c.title,
        subtitle: &c.subtitle,
        description: &c.description,
        price: &c.price,
        original_price: &c.original_price,
        contact: &c.contact,
        bg_color: &c.bg_color,
        text_color: &c.text_color,
        logo_url: c.logo_url.as_deref(),
        design_data: &design.design_data,
    };
    encode(Table::UserDesigns, &row)
}

/// Update row for `patch`, stamped with `updated_at = now`.
pub fn design_patch_to_row(
    patch: &UserDesignPatch,
    now: OffsetDateTime,
) -> Result<Row, ServiceError> {
    let mut row = Map::new();
    let mut put = |key: &str, value: Option<&String>| {
        if let Some(value) = value {
            row.insert(key.to_owned(), value.clone().into());
        }
    };
    put("title", patch.title.as_ref());
    put("subtitle", patch.subtitle.as_ref());
    put("description", patch.description.as_ref());
    put("price", patch.price.as_ref());
    put("original_price", patch.original_price.as_ref());
    put("contact", patch.contact.as_ref());
    put("bg_color", patch.bg_color.as_ref());
    put("text_color", patch.text_color.as_ref());

    if let Some(template_id) = &patch.template_id {
        row.insert("template_id".to_owned(), template_id.clone().into());
    }
    if let Some(logo_url) = &patch.logo_url {
        row.insert("logo_url".to_owned(), logo_url.clone().into());
    }
    if let Some(design_data) = &patch.design_data {
        row.insert("design_data".to_owned(), design_data.clone());
    }
    row.insert("updated_at".to_owned(), timestamp(Table::UserDesigns, now)?);
    Ok(row)
}

#[cfg(test)]
#[path = "mapper_test.rs"]
mod mapper_test;
