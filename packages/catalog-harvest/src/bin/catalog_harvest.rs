// Command-line entry point for catalog harvesting

use anyhow::{bail, Context, Result};
use catalog_harvest::config::secs_to_duration;
use catalog_harvest::{
    ai, degree_requirements_instruction, worklist, BatchDriver, ContentTarget, Extractor,
    HttpFetcher, Ledger, LinkRule, MergeMode, PagerRule, ResponseShape, RunOptions, Settings,
    WorklistBuilder, WorklistSource, COURSE_CATALOG_INSTRUCTION, PREREQUISITES_INSTRUCTION,
};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Content container on Acalog course detail pages.
const COURSE_PREVIEW_SELECTOR: &str = "div#acalog-course-preview";

#[derive(Parser)]
#[command(name = "catalog-harvest")]
#[command(about = "Scrape a course catalog and extract structured records with an LLM")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover every course in the catalog index and extract one record per course
    Catalog {
        /// Catalog index URL (defaults to CATALOG_URL)
        #[arg(long)]
        url: Option<String>,

        /// Output ledger (.csv or .json)
        #[arg(short, long, default_value = "courses.csv")]
        output: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Extract requirement rules from a single degree-requirements page
    Page {
        /// Page URL (defaults to DEGREE_REQS_URL)
        #[arg(long)]
        url: Option<String>,

        /// Major code written into every rule
        #[arg(long)]
        major_code: String,

        /// Output ledger (.csv or .json)
        #[arg(short, long, default_value = "degree_requirements.json")]
        output: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Parse a field of an existing ledger and merge the result into each row
    Enrich {
        /// Existing ledger to read (.csv or .json)
        #[arg(short, long)]
        input: PathBuf,

        /// Field holding the text to parse
        #[arg(long, default_value = "prerequisites")]
        field: String,

        /// Field identifying each row in logs
        #[arg(long, default_value = "course_number")]
        id_field: String,

        /// Output ledger (.csv or .json)
        #[arg(short, long, default_value = "courses_parsed.csv")]
        output: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Process at most N items, counted from --start-at
    #[arg(long)]
    limit: Option<usize>,

    /// 1-based position of the first item to process
    #[arg(long)]
    start_at: Option<usize>,

    /// Append to the output ledger instead of overwriting it
    #[arg(long)]
    append: bool,

    /// Requests per minute (overrides RPM_LIMIT)
    #[arg(long)]
    rpm: Option<u32>,

    /// Tokens per minute (overrides TPM_LIMIT)
    #[arg(long)]
    tpm: Option<u64>,

    /// Requests per day (overrides RPD_LIMIT)
    #[arg(long)]
    rpd: Option<u32>,

    /// Seconds to wait after each page fetch (overrides WEBSITE_SCRAPE_DELAY)
    #[arg(long)]
    scrape_delay: Option<f64>,

    /// Replace the built-in task instruction with the contents of this file
    #[arg(long)]
    instruction_file: Option<PathBuf>,

    /// Append the input text of failed extractions to this file
    #[arg(long)]
    failed_log: Option<PathBuf>,

    /// Skip the startup reachability check of the LLM provider
    #[arg(long)]
    skip_probe: bool,
}

impl RunArgs {
    fn apply(&self, settings: &mut Settings) -> Result<()> {
        if let Some(rpm) = self.rpm {
            settings.throttle.rpm = rpm;
        }
        if let Some(tpm) = self.tpm {
            settings.throttle.tpm = tpm;
        }
        if let Some(rpd) = self.rpd {
            settings.throttle.rpd = rpd;
        }
        settings.throttle.validate()?;

        if let Some(secs) = self.scrape_delay {
            settings.scrape.delay = secs_to_duration("--scrape-delay", secs)?;
        }
        Ok(())
    }

    fn options(&self) -> RunOptions {
        RunOptions {
            limit: self.limit,
            start_at: self.start_at,
            append: self.append,
        }
    }

    fn instruction(&self, builtin: String) -> Result<String> {
        match &self.instruction_file {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read instruction file {}", path.display())),
            None => Ok(builtin),
        }
    }
}

/// Enrich may only rewrite its own input as a whole: appending would repeat
/// every row, and a sliced run would drop the rows outside the slice.
fn check_enrich_paths(input: &Path, output: &Path, run: &RunArgs) -> Result<()> {
    let same = input == output
        || matches!(
            (input.canonicalize(), output.canonicalize()),
            (Ok(a), Ok(b)) if a == b
        );
    if !same {
        return Ok(());
    }
    if run.append {
        bail!("--append cannot write into --input; choose a different --output");
    }
    if run.start_at.is_some() || run.limit.is_some() {
        bail!("--start-at/--limit cannot rewrite --input in place; choose a different --output");
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,catalog_harvest=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::from_env().context("Failed to load configuration")?;

    let run = match &cli.command {
        Commands::Catalog { run, .. } | Commands::Page { run, .. } | Commands::Enrich { run, .. } => run,
    };
    run.apply(&mut settings)?;

    let fetcher = Arc::new(HttpFetcher::new(&settings.scrape).context("Failed to build HTTP client")?);
    let service = ai::from_settings(&settings).context("Failed to configure LLM provider")?;
    tracing::info!(
        provider = %settings.provider,
        model = %settings.model,
        rpm = settings.throttle.rpm,
        tpm = settings.throttle.tpm,
        rpd = settings.throttle.rpd,
        "Configuration loaded"
    );

    let (source, extractor, content, merge, output) = match &cli.command {
        Commands::Catalog { url, output, run } => {
            let Some(url) = url.clone().or_else(|| settings.catalog_url.clone()) else {
                bail!("No catalog URL: pass --url or set CATALOG_URL");
            };
            let builder = WorklistBuilder::new(fetcher.clone(), url, LinkRule::acalog_course()?)
                .with_pager(PagerRule::acalog()?)
                .with_delay(settings.scrape.delay);
            let extractor = Extractor::new(
                service,
                run.instruction(COURSE_CATALOG_INSTRUCTION.to_string())?,
            );
            (
                WorklistSource::Discover(builder),
                extractor,
                ContentTarget::selector(COURSE_PREVIEW_SELECTOR)?,
                MergeMode::Records,
                output.clone(),
            )
        }
        Commands::Page {
            url,
            major_code,
            output,
            run,
        } => {
            let Some(url) = url.clone().or_else(|| settings.degree_reqs_url.clone()) else {
                bail!("No page URL: pass --url or set DEGREE_REQS_URL");
            };
            let extractor = Extractor::new(
                service,
                run.instruction(degree_requirements_instruction(major_code))?,
            )
            .with_shape(ResponseShape::Array);
            (
                WorklistSource::Items(worklist::single_page(url)?),
                extractor,
                ContentTarget::MainContent,
                MergeMode::Records,
                output.clone(),
            )
        }
        Commands::Enrich {
            input,
            field,
            id_field,
            output,
            run,
        } => {
            check_enrich_paths(input, output, run)?;
            let items = worklist::from_ledger(input, field, Some(id_field.as_str()))
                .with_context(|| format!("Failed to load {}", input.display()))?;
            let extractor =
                Extractor::new(service, run.instruction(PREREQUISITES_INSTRUCTION.to_string())?);
            (
                WorklistSource::Items(items),
                extractor,
                ContentTarget::MainContent,
                MergeMode::Enrich,
                output.clone(),
            )
        }
    };

    let ledger = Ledger::new(&output)
        .with_context(|| format!("Unsupported output file {}", output.display()))?;

    let mut driver = BatchDriver::new(fetcher, extractor, settings.throttle, ledger)
        .with_options(run.options())
        .with_content(content)
        .with_merge(merge)
        .with_scrape_delay(settings.scrape.delay)
        .with_probe(!run.skip_probe);
    if let Some(path) = &run.failed_log {
        driver = driver.with_failed_log(path);
    }

    let report = driver.run(source).await.context("Run failed")?;

    println!("{}", report);
    if !report.failed.is_empty() {
        println!("Failed items:");
        for url in &report.failed {
            println!("  {}", url);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["catalog-harvest", "enrich", "--input", "courses.csv"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Enrich { run, .. } => run,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_enrich_in_place_rejected_with_append() {
        let same = Path::new("courses.csv");
        assert!(check_enrich_paths(same, same, &run_args(&["--append"])).is_err());
    }

    #[test]
    fn test_enrich_in_place_rejected_when_sliced() {
        let same = Path::new("courses.csv");
        assert!(check_enrich_paths(same, same, &run_args(&["--limit", "5"])).is_err());
        assert!(check_enrich_paths(same, same, &run_args(&["--start-at", "2"])).is_err());
    }

    #[test]
    fn test_enrich_in_place_allowed_for_full_overwrite() {
        let same = Path::new("courses.csv");
        assert!(check_enrich_paths(same, same, &run_args(&[])).is_ok());
    }

    #[test]
    fn test_enrich_to_other_file_always_allowed() {
        let args = run_args(&["--append", "--limit", "5"]);
        assert!(check_enrich_paths(Path::new("courses.csv"), Path::new("parsed.csv"), &args).is_ok());
    }

    #[test]
    fn test_same_file_through_different_spelling() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courses.csv");
        std::fs::write(&path, "course_number\n").unwrap();
        let dotted = dir.path().join(".").join("courses.csv");

        assert!(check_enrich_paths(&path, &dotted, &run_args(&["--append"])).is_err());
    }
}
