mod clauses;
mod config;
mod discovery;
mod error;
mod export;
mod fetcher;
mod html;
mod report;
mod risk;
mod sitemap;
mod urls;

#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Settings;
use crate::discovery::LegalScout;
use crate::fetcher::HttpFetcher;
use crate::report::CrawlRequest;

#[derive(Parser)]
#[command(name = "legal-scout", about = "Find a site's legal pages and rank their worst data clauses")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover, combine and rank a site's legal documents
    Scan {
        /// Page the user is looking at
        url: String,
        /// Saved HTML of that page (fetched when omitted)
        #[arg(long)]
        html_file: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
        /// Max candidate pages to fetch (overrides SCOUT_MAX_PAGES)
        #[arg(short = 'n', long)]
        max_pages: Option<usize>,
        /// Skip the /sitemap.xml probe
        #[arg(long)]
        no_sitemap: bool,
    },
    /// List candidate legal URLs without fetching their text
    Discover {
        url: String,
        #[arg(long)]
        html_file: Option<PathBuf>,
    },
    /// Print the ranked clause candidates of a plain-text file
    Clauses {
        file: PathBuf,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::from_env()?;

    let result = match cli.command {
        Commands::Scan {
            url,
            html_file,
            format,
            max_pages,
            no_sitemap,
        } => {
            let mut crawl = settings.crawl_config();
            if let Some(n) = max_pages.filter(|n| *n > 0) {
                crawl.max_pages = n;
            }
            if no_sitemap {
                crawl.use_sitemap = false;
            }
            let classifier_config = settings.classifier()?;
            if classifier_config.is_enabled() {
                info!("Risk classifier: {}", classifier_config.label());
            } else {
                info!("No risk classifier configured (set SCOUT_PROVIDER); findings will be empty");
            }

            let timeout = settings.request_timeout();
            let fetcher = Arc::new(HttpFetcher::new(timeout)?);
            let classifier = risk::build_classifier(&classifier_config, timeout)?;
            let scout = LegalScout::new(fetcher, crawl).with_classifier(classifier);

            let request = load_request(url, html_file.as_deref())?;
            let cancel = cancel_on_ctrl_c();
            let pb = spinner(&format!("Scanning {}", request.url));
            let report = scout.crawl(&request, &cancel).await;
            pb.finish_and_clear();
            info!("Scan {}: {}", report.status.as_str(), report.summary);

            match format {
                Format::Text => println!("{}", export::to_text(&report)),
                Format::Json => println!("{}", export::to_json(&report)?),
            }
            match report.error {
                Some(e) => bail!(e),
                None => Ok(()),
            }
        }
        Commands::Discover { url, html_file } => {
            let fetcher = Arc::new(HttpFetcher::new(settings.request_timeout())?);
            let scout = LegalScout::new(fetcher, settings.crawl_config());
            let request = load_request(url, html_file.as_deref())?;
            let cancel = cancel_on_ctrl_c();

            let pb = spinner(&format!("Discovering legal pages for {}", request.url));
            let found = scout.discover(&request, &cancel).await;
            pb.finish_and_clear();
            let found = found?;

            if found.candidates.is_empty() {
                println!("No candidate pages on {}.", found.origin);
                return Ok(());
            }
            let categories: Vec<_> = found.candidates.iter().map(|c| urls::categorize(c)).collect();
            for (candidate, category) in found.candidates.iter().zip(&categories) {
                println!("[{:<10}] {}", category.as_str(), candidate);
            }
            let breakdown: Vec<String> = urls::Category::ALL
                .iter()
                .filter_map(|cat| {
                    let n = categories.iter().filter(|c| *c == cat).count();
                    (n > 0).then(|| format!("{} {}", n, cat))
                })
                .collect();
            println!(
                "\n{} candidates on {} ({}; {} URLs fetched)",
                found.candidates.len(),
                found.origin,
                breakdown.join(", "),
                found.fetched
            );
            Ok(())
        }
        Commands::Clauses { file, limit } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let candidates = clauses::extract_clauses(&text);
            if candidates.is_empty() {
                println!("No sentences found.");
                return Ok(());
            }

            println!("{:>3} | {:>5} | {:<28} | Sentence", "#", "Score", "Clusters");
            println!("{}", "-".repeat(100));
            for (i, sentence) in candidates.iter().take(limit).enumerate() {
                let clusters = clauses::matching_clusters(sentence).join(",");
                println!(
                    "{:>3} | {:>5} | {:<28} | {}",
                    i + 1,
                    clauses::score_sentence(sentence),
                    truncate(&clusters, 28),
                    truncate(sentence, 120)
                );
            }
            println!(
                "\n{} candidates (showing {})",
                candidates.len(),
                limit.min(candidates.len())
            );
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn load_request(url: String, html_file: Option<&std::path::Path>) -> anyhow::Result<CrawlRequest> {
    let request = CrawlRequest::new(url);
    match html_file {
        Some(path) => {
            let html = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(request.with_snapshot(html))
        }
        None => Ok(request),
    }
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling scan");
            token.cancel();
        }
    });
    cancel
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
