use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use rival::{
    configuration::get_configuration,
    domain::CompanyIdentifier,
    services::{render_report, save_report, Analyst, BatchConfig, OpenaiClient, Orchestrator},
};

#[derive(Parser)]
#[command(name = "rival", about = "Competitor analysis reports from batched AI calls")]
struct Cli {
    /// Company website url for a single analysis
    website: Option<String>,

    /// Company name for the single analysis form
    name: Option<String>,

    /// Company to analyze as `url,name`; repeat for a small inline set
    #[arg(short, long = "company", action = clap::ArgAction::Append, conflicts_with_all = ["website", "file"])]
    company: Vec<String>,

    /// File of `url,name` lines, one company per line (# starts a comment)
    #[arg(short, long, conflicts_with = "website")]
    file: Option<PathBuf>,

    /// Maximum companies per underlying generation call
    #[arg(long)]
    batch_size: Option<usize>,

    /// Overall time budget for the whole batch, in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Directory the HTML reports are written to
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn collect_companies(cli: &Cli) -> Result<Vec<CompanyIdentifier>, anyhow::Error> {
    if !cli.company.is_empty() {
        return cli
            .company
            .iter()
            .map(|line| CompanyIdentifier::from_line(line))
            .collect();
    }

    if let Some(file) = &cli.file {
        let contents = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read companies file: {}", file.display()))?;

        let companies = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(CompanyIdentifier::from_line)
            .collect::<Result<Vec<_>, _>>()?;

        if companies.is_empty() {
            anyhow::bail!("No companies found in file: {}", file.display());
        }
        return Ok(companies);
    }

    match (&cli.website, &cli.name) {
        (Some(website), Some(name)) => Ok(vec![CompanyIdentifier::new(name, website)?]),
        (Some(website), None) => Ok(vec![CompanyIdentifier::from_line(website)?]),
        (None, _) => anyhow::bail!("Provide a company website or --file <path>"),
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let configuration = get_configuration().context("Failed to read configuration")?;

    if configuration.api_keys.openai.trim().is_empty() {
        anyhow::bail!("OpenAI api key is not configured (RIVAL__API_KEYS__OPENAI)");
    }

    let companies = collect_companies(&cli)?;

    let mut batch_config = BatchConfig::from_settings(&configuration.analysis);
    if let Some(batch_size) = cli.batch_size {
        batch_config.max_batch_size = batch_size;
    }
    if let Some(timeout) = cli.timeout {
        batch_config.timeout = Some(Duration::from_secs(timeout));
    }

    let client = OpenaiClient::new(
        configuration.api_keys.openai.clone(),
        configuration.analysis.model.clone(),
    );
    let orchestrator = Orchestrator::new(Analyst::new(Arc::new(client)), batch_config)?;

    log::info!("Analyzing {} company(ies)", companies.len());
    let outcome = orchestrator.analyze_many(&companies).await;

    let output_dir = cli
        .output_dir
        .unwrap_or_else(|| PathBuf::from(&configuration.analysis.output_dir));

    for result in &outcome.results {
        if let Some(error) = &result.error {
            log::warn!("Analysis failed for {}: {}", result.identifier.name, error);
        }
        let html = render_report(result)?;
        save_report(&html, &output_dir, &result.identifier.name)?;
    }

    log::info!(
        "Done: {}/{} companies succeeded with {} underlying call(s) (naive baseline: {})",
        outcome.succeeded_count(),
        outcome.results.len(),
        outcome.total_calls_made,
        outcome.results.len()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{collect_companies, Cli};

    #[test]
    fn inline_set_of_companies_is_accepted_in_order() {
        let cli = Cli::try_parse_from([
            "rival",
            "-c",
            "https://stripe.com,Stripe",
            "-c",
            "https://square.com,Square",
        ])
        .unwrap();

        let companies = collect_companies(&cli).unwrap();
        assert_eq!(companies.len(), 2);
        assert_eq!(companies[0].name, "Stripe");
        assert_eq!(companies[1].name, "Square");
    }

    #[test]
    fn inline_companies_conflict_with_single_company_form() {
        let result = Cli::try_parse_from([
            "rival",
            "https://stripe.com",
            "-c",
            "https://square.com,Square",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn single_company_form_still_parses() {
        let cli = Cli::try_parse_from(["rival", "https://stripe.com", "Stripe"]).unwrap();

        let companies = collect_companies(&cli).unwrap();
        assert_eq!(companies.len(), 1);
        assert_eq!(companies[0].name, "Stripe");
    }
}
