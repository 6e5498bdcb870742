use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use askama::Template;

use crate::domain::AnalysisResult;

#[derive(Template)]
#[template(path = "report.html")]
struct ReportTemplate {
    company_name: String,
    website: String,
    analysis_date: String,
    sections: Vec<ReportSection>,
}

struct ReportSection {
    title: &'static str,
    body: String,
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    company_name: String,
    website: String,
    error: String,
}

/// Failed results get an error document so every requested company still
/// produces a report file.
pub fn render_report(result: &AnalysisResult) -> Result<String, anyhow::Error> {
    let company_name = result.identifier.name.clone();
    let website = result.identifier.website.to_string();

    let html = match &result.error {
        None => ReportTemplate {
            company_name,
            website,
            analysis_date: chrono::Local::now().format("%Y-%m-%d").to_string(),
            sections: result
                .sections
                .iter()
                .map(|(kind, body)| ReportSection {
                    title: kind.title(),
                    body: body.clone(),
                })
                .collect(),
        }
        .render()
        .context("Failed to render report template")?,
        Some(error) => ErrorTemplate {
            company_name,
            website,
            error: error.to_string(),
        }
        .render()
        .context("Failed to render error template")?,
    };

    Ok(html)
}

pub fn save_report(
    html: &str,
    output_dir: &Path,
    company_name: &str,
) -> Result<PathBuf, anyhow::Error> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output dir: {}", output_dir.display()))?;

    let path = output_dir.join(report_filename(company_name));

    fs::write(&path, html)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    log::info!("Report saved to {}", path.display());

    Ok(path)
}

// Named after the company; a name with no usable slug falls back to a
// timestamped default.
fn report_filename(company_name: &str) -> String {
    let slug: String = company_name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    match slug.chars().any(|c| c.is_ascii_alphanumeric()) {
        true => format!("{}_analysis.html", slug),
        false => format!(
            "competitor_analysis_{}.html",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        ),
    }
}
