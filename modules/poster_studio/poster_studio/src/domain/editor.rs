//! Editor handoff: the field set the editor renders, the patch it saves, and
//! the file name its export produces.

use poster_studio_sdk::{DesignContent, Template, UserDesign, UserDesignPatch};
use serde_json::{Value, json};

use super::demo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
    Pdf,
}

impl ExportFormat {
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Pdf => "pdf",
        }
    }
}

/// Content to open the editor with.
///
/// Each field comes from the design if it holds a non-empty value, else from
/// the template (background only), else from the placeholders.
#[must_use]
pub fn editor_content(design: Option<&UserDesign>, template: Option<&Template>) -> DesignContent {
    let defaults = demo::default_content(template);
    let Some(design) = design else {
        return defaults;
    };

    let pick = |value: &str, fallback: String| {
        if value.is_empty() {
            fallback
        } else {
            value.to_owned()
        }
    };

    DesignContent {
        title: pick(&design.title, defaults.title),
        subtitle: pick(&design.subtitle, defaults.subtitle),
        description: pick(&design.description, defaults.description),
        price: pick(&design.price, defaults.price),
        original_price: pick(&design.original_price, defaults.original_price),
        contact: pick(&design.contact, defaults.contact),
        bg_color: pick(&design.bg_color, defaults.bg_color),
        text_color: pick(&design.text_color, defaults.text_color),
        logo_url: design.logo_url.clone().filter(|url| !url.is_empty()),
    }
}

/// JSON snapshot of the editor fields, stored as `design_data`.
#[must_use]
pub fn content_snapshot(content: &DesignContent) -> Value {
    json!({
        "title": content.title,
        "subtitle": content.subtitle,
        "description": content.description,
        "price": content.price,
        "original_price": content.original_price,
        "contact": content.contact,
        "bg_color": content.bg_color,
        "text_color": content.text_color,
        "logo_url": content.logo_url,
    })
}

/// Patch persisting `content` both as discrete fields and as a snapshot.
#[must_use]
pub fn save_patch(content: DesignContent) -> UserDesignPatch {
    let design_data = content_snapshot(&content);
    UserDesignPatch {
        template_id: None,
        title: Some(content.title),
        subtitle: Some(content.subtitle),
        description: Some(content.description),
        price: Some(content.price),
        original_price: Some(content.original_price),
        contact: Some(content.contact),
        bg_color: Some(content.bg_color),
        text_color: Some(content.text_color),
        logo_url: Some(content.logo_url),
        design_data: Some(design_data),
    }
}

/// File name for an exported poster: every character outside ASCII
/// letters and digits becomes `_`, then the whole stem is lowercased.
#[must_use]
pub fn export_file_name(title: &str, format: ExportFormat) -> String {
    let stem: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{stem}.{}", format.extension())
}
