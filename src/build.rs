use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use serde::Serialize;

use crate::cli::BuildArgs;
use crate::config::SiteConfig;
use crate::fetch::{FetchReport, HttpSectionSource, LocaleFetch, fetch_all};
use crate::locale::parse_locale_list;
use crate::mapping::build_mappings;
use crate::paths::generate_section_paths;

#[derive(Debug, Serialize)]
struct FetchSummary<'a> {
    generated_at: String,
    api_base_url: &'a str,
    fetched: Vec<FetchedLocale<'a>>,
    failed: Vec<FailedLocale<'a>>,
}

#[derive(Debug, Serialize)]
struct FetchedLocale<'a> {
    locale: &'a str,
    sections: usize,
}

#[derive(Debug, Serialize)]
struct FailedLocale<'a> {
    locale: &'a str,
    reason: &'a str,
}

impl<'a> FetchSummary<'a> {
    fn new(api_base_url: &'a str, report: &'a FetchReport) -> Self {
        let mut fetched = Vec::new();
        let mut failed = Vec::new();
        for (locale, fetch) in &report.locales {
            match fetch {
                LocaleFetch::Fetched { sections } => fetched.push(FetchedLocale {
                    locale,
                    sections: sections.len(),
                }),
                LocaleFetch::Failed { reason } => failed.push(FailedLocale { locale, reason }),
            }
        }

        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            api_base_url,
            fetched,
            failed,
        }
    }
}

/// Fetches every locale and writes the site data files into `args.out`.
pub async fn run(args: BuildArgs) -> anyhow::Result<()> {
    let out_dir = PathBuf::from(&args.out);
    crate::store::ensure_output_dir_does_not_exist(&out_dir)
        .context("check build output directory")?;

    let locales = parse_locale_list(&args.locales).context("parse --locales")?;
    let config = SiteConfig::from_env()
        .context("load config")?
        .with_overrides(args.api_base_url.as_deref(), args.primary_color.as_deref());

    tracing::info!(api = %config.api_base_url, locales = %locales.join(","), "build: fetch sections");
    let source = HttpSectionSource::new(&config.api_base_url, config.http_timeout)
        .context("build section source")?;
    let report = fetch_all(Arc::new(source), &locales).await;
    for (locale, reason) in report.failures() {
        tracing::warn!(locale, reason, "build: continuing without locale");
    }

    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("create build output dir: {}", out_dir.display()))?;

    let sections_by_locale = report.sections_by_locale();
    crate::store::write_json(&out_dir.join("sections.json"), &sections_by_locale, false)
        .context("write sections.json")?;

    tracing::info!("build: mappings");
    let mappings = build_mappings(&sections_by_locale);
    crate::store::write_json(&out_dir.join("mappings.json"), &mappings, false)
        .context("write mappings.json")?;

    tracing::info!("build: page paths");
    let paths = generate_section_paths(
        &sections_by_locale,
        &mappings.section_mappings,
        &locales,
        args.locale_param,
    );
    crate::store::write_json(&out_dir.join("paths.json"), &paths, false)
        .context("write paths.json")?;

    tracing::info!(color = %config.primary_color, "build: theme");
    let css = crate::palette::theme_stylesheet(&config.primary_color);
    crate::store::write_output(&out_dir.join("theme.css"), css.as_bytes(), false)
        .context("write theme.css")?;

    let summary = FetchSummary::new(&config.api_base_url, &report);
    crate::store::write_json(&out_dir.join("fetch-report.json"), &summary, false)
        .context("write fetch-report.json")?;

    tracing::info!(
        out = %out_dir.display(),
        sections = mappings.section_mappings.len(),
        paths = paths.len(),
        failed_locales = summary.failed.len(),
        "build: done"
    );
    Ok(())
}
