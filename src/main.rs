use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rent_scout::{FnSink, LocalityTable, ScoutConfig, ScrapeRequest, SearchParams};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Rent Scout - rental listing scraper")]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape search results for one or more districts
    Scrape {
        /// District names, space separated ("大安區 信義", "all")
        #[clap(short, long)]
        targets: String,

        /// Minimum monthly rent
        #[clap(long = "min", default_value = "8000")]
        min_rent: u32,

        /// Maximum monthly rent
        #[clap(long = "max", default_value = "12000")]
        max_rent: u32,

        /// Free-text keyword filter
        #[clap(short, long)]
        keywords: Option<String>,

        /// Maximum number of listings to return
        #[clap(short, long, default_value = "30")]
        limit: usize,

        /// Write listings to this JSON file instead of stdout
        #[clap(short, long)]
        output: Option<PathBuf>,
    },

    /// Fetch contact details for one listing
    Contact {
        /// Listing id, e.g. 17654321
        listing_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = ScoutConfig::from_env()?;

    match args.command {
        Command::Scrape {
            targets,
            min_rent,
            max_rent,
            keywords,
            limit,
            output,
        } => {
            let mut table = match &config.locality_table {
                Some(path) => LocalityTable::load(path)?,
                None => LocalityTable::builtin(),
            };
            if let Some(name) = &config.default_locality {
                table = table.with_default_locality(name)?;
            }

            let resolution = table.resolve(&targets);
            if !resolution.unresolved.is_empty() {
                warn!("Unknown districts: {}", resolution.unresolved.join(", "));
            }
            if resolution.targets.is_empty() {
                bail!("No districts resolved from {targets:?}");
            }

            let request = ScrapeRequest {
                targets: resolution.targets,
                params: SearchParams::new(min_rent, max_rent, keywords.as_deref())?,
                max_results: limit,
            };

            info!("🏠 Rent Scout");
            info!("Scraping {} districts...", request.targets.len());

            let progress = FnSink(|line: &str| eprintln!("» {line}"));
            let report = rent_scout::scrape(&config, &request, Some(&progress)).await?;

            info!("✅ Scraped {} listings", report.listings.len());

            let json = serde_json::to_string_pretty(&report.listings)?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, json)
                        .await
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("💾 Saved listings to {}", path.display());
                }
                None => println!("{json}"),
            }
        }

        Command::Contact { listing_id } => {
            let contact = rent_scout::fetch_contact(&config, &listing_id).await;
            if contact.is_empty() {
                warn!("No contact details found for {listing_id}");
            }
            println!("{}", serde_json::to_string_pretty(&contact)?);
        }
    }

    Ok(())
}
