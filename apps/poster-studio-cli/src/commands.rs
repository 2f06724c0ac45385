use anyhow::{Context, Result, bail};
use clap::Args;
use poster_studio::{
    BackendKind, DataSource, ExportFormat, SignInOutcome, SignUpOutcome, Studio, StudioConfig,
    TemplateCategory, TemplateFilter, UserDesign, UserDesignPatch, WriteMode, WriteOutcome,
    editor_content, export_file_name,
};

/// List the template catalog
#[derive(Args)]
pub struct TemplatesArgs {
    /// Only templates in this category
    #[arg(long, value_parser = parse_category)]
    category: Option<TemplateCategory>,

    /// Case-insensitive substring of the template name
    #[arg(long)]
    search: Option<String>,

    /// Hide templates the signed-in profile may not open
    #[arg(long)]
    accessible: bool,
}

/// Create a design and print it
#[derive(Args)]
pub struct CreateArgs {
    /// Template to start from
    #[arg(long)]
    template: Option<String>,
}

/// Change the title of a design
#[derive(Args)]
pub struct RenameArgs {
    id: String,
    title: String,
}

/// Delete a design
#[derive(Args)]
pub struct DeleteArgs {
    id: String,
}

/// Pay for an export of a design and print the file name it would get
#[derive(Args)]
pub struct ExportArgs {
    id: String,

    /// png or pdf
    #[arg(long, default_value = "png", value_parser = parse_format)]
    format: ExportFormat,
}

/// Create an account with --email and --password
#[derive(Args)]
pub struct SignUpArgs {
    #[arg(long)]
    full_name: String,
}

pub fn check(config: &StudioConfig) {
    let url = config
        .backend
        .url
        .as_ref()
        .map_or_else(|| "(unset)".to_owned(), ToString::to_string);
    println!("Configuration is valid");
    println!("backend url:     {url}");
    println!("backend ready:   {}", config.backend.is_configured());
    println!("request timeout: {}s", config.backend.request_timeout.as_secs());
    println!("write mode:      {}", write_mode_label(config.write_mode));
}

pub async fn sign_in(studio: &Studio, email: &str, password: &str) -> Result<()> {
    match studio.session.sign_in(email, password).await? {
        SignInOutcome::Authenticated => tracing::info!(email, "Signed in"),
        SignInOutcome::Demo => eprintln!("warning: sign-in failed, continuing as a local demo user"),
    }
    Ok(())
}

pub async fn sign_up(studio: &Studio, email: &str, password: &str, args: &SignUpArgs) -> Result<()> {
    match studio.session.sign_up(email, password, &args.full_name).await? {
        SignUpOutcome::Authenticated => println!("Account created, signed in as {email}"),
        SignUpOutcome::ConfirmationPending => {
            println!("Account created, check {email} for a confirmation link");
        }
        SignUpOutcome::Demo => {
            println!("Sign-up failed, continuing as a local demo user ({email})");
        }
    }
    Ok(())
}

pub fn templates(studio: &Studio, args: &TemplatesArgs) {
    let filter = TemplateFilter {
        category: args.category,
        search: args.search.clone(),
    };
    let profile = studio.session.profile();
    for template in studio.designs.filter_templates(&filter) {
        let open = poster_studio::domain::access::can_use_template(&template, profile.as_ref());
        if args.accessible && !open {
            continue;
        }
        let mut tags = Vec::new();
        if template.is_popular {
            tags.push("popular");
        }
        if template.is_premium {
            tags.push(if open { "premium" } else { "premium, locked" });
        }
        let tags = if tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", tags.join(", "))
        };
        println!(
            "{:>4}  {:<22} {:<11} uses={}{tags}",
            template.id,
            template.name,
            template.category.as_str(),
            template.usage_count
        );
    }
}

pub async fn designs(studio: &Studio) -> Result<()> {
    let source = studio.designs.fetch_designs().await?;
    if source == DataSource::Fallback {
        eprintln!("warning: backend unreachable, no designs loaded");
    }
    let designs = studio.designs.designs();
    if designs.is_empty() {
        println!("No designs yet");
    }
    for design in &designs {
        print_design(design);
    }
    Ok(())
}

pub async fn create(studio: &Studio, args: &CreateArgs) -> Result<()> {
    let design = studio
        .designs
        .create_design(args.template.as_deref())
        .await?;
    print_design(&design);
    Ok(())
}

pub async fn rename(studio: &Studio, args: &RenameArgs) -> Result<()> {
    let patch = UserDesignPatch {
        title: Some(args.title.clone()),
        ..UserDesignPatch::default()
    };
    let outcome = studio.designs.update_design(&args.id, &patch).await?;
    report(outcome, "renamed");
    Ok(())
}

pub async fn delete(studio: &Studio, args: &DeleteArgs) -> Result<()> {
    let outcome = studio.designs.delete_design(&args.id).await?;
    report(outcome, "deleted");
    Ok(())
}

pub async fn export(studio: &Studio, args: &ExportArgs) -> Result<()> {
    studio.designs.fetch_designs().await?;
    let design = studio
        .designs
        .designs()
        .into_iter()
        .find(|d| d.id == args.id)
        .with_context(|| format!("design {} not found", args.id))?;
    if !studio.session.can_export() {
        bail!("no credits left and no active subscription");
    }

    let template = design
        .template_id
        .as_deref()
        .and_then(|id| studio.designs.template(id));
    let content = editor_content(Some(&design), template.as_ref());
    let charge = studio.session.consume_export_credit().await?;
    tracing::debug!(?charge, "Export paid");

    println!("{}", export_file_name(&content.title, args.format));
    Ok(())
}

pub fn profile(studio: &Studio) -> Result<()> {
    let Some(profile) = studio.session.profile() else {
        bail!("not signed in (pass --email and --password)");
    };
    println!("email:    {}", profile.email);
    println!("name:     {}", profile.full_name.as_deref().unwrap_or("-"));
    println!("plan:     {}", profile.plan_label());
    println!("status:   {}", profile.subscription_status.as_str());
    println!("credits:  {}", profile.credits_remaining);
    println!("export:   {}", if studio.session.can_export() { "yes" } else { "no" });
    println!("backend:  {}", backend_label(studio.backend_kind()));
    Ok(())
}

fn print_design(design: &UserDesign) {
    println!(
        "{}  {:<28} {:<12} template={}",
        design.id,
        design.title,
        design.price,
        design.template_id.as_deref().unwrap_or("-")
    );
}

fn report(outcome: WriteOutcome, action: &str) {
    match outcome {
        WriteOutcome::Synced => println!("Design {action}"),
        WriteOutcome::LocalOnly => println!("Design {action} locally; the backend did not accept it"),
    }
}

fn parse_category(value: &str) -> Result<TemplateCategory, String> {
    TemplateCategory::ALL
        .into_iter()
        .find(|c| c.as_str().eq_ignore_ascii_case(value))
        .ok_or_else(|| format!("unknown category '{value}'"))
}

fn parse_format(value: &str) -> Result<ExportFormat, String> {
    match value.to_ascii_lowercase().as_str() {
        "png" => Ok(ExportFormat::Png),
        "pdf" => Ok(ExportFormat::Pdf),
        _ => Err(format!("unknown export format '{value}'")),
    }
}

fn write_mode_label(mode: WriteMode) -> &'static str {
    match mode {
        WriteMode::Optimistic => "optimistic",
        WriteMode::Confirmed => "confirmed",
    }
}

fn backend_label(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::Remote => "remote",
        BackendKind::Embedded => "embedded",
        BackendKind::Unavailable => "unavailable (demo fallbacks)",
    }
}
