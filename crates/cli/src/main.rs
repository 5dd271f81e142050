//! specshard CLI - tag filtering and weighted sharding of feature specs.

mod config;
mod specs;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use specshard_core::{Browser, WorkerBucket, MANIFEST_FILE_NAME};
use specshard_manifest::ManifestBuilder;
use specshard_scheduler::{load_weight_table, read_weight_table, update_weights_file, Distributor, SuffixRule};
use specshard_tags::{Grammar, PolicyMode};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{Settings, TAGS_ENV};

#[derive(Parser)]
#[command(name = "specshard")]
#[command(about = "Tag filtering and weighted sharding of feature specs", version, long_about = None)]
struct Cli {
    /// JSON settings file
    #[arg(long, global = true, env = "SPECSHARD_CONFIG")]
    config: Option<PathBuf>,

    /// Tag expression, overrides the TAGS environment variable
    #[arg(long, global = true)]
    tags: Option<String>,

    /// Expression grammar (precedence or legacy)
    #[arg(long, global = true)]
    grammar: Option<Grammar>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SpecArgs {
    /// Spec paths
    specs: Vec<PathBuf>,

    /// File listing spec paths, one per line
    #[arg(long)]
    list: Option<PathBuf>,
}

#[derive(Args)]
struct DistributeArgs {
    /// Worker count
    #[arg(long)]
    threads: Option<usize>,

    /// Weight table file
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Weight of specs missing from the table
    #[arg(long)]
    default_weight: Option<f64>,

    /// Overlapping key resolution (longest or last)
    #[arg(long)]
    suffix_rule: Option<SuffixRule>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the specs matching the tag expression
    Filter {
        #[command(flatten)]
        specs: SpecArgs,
    },
    /// Filter, then print worker buckets as JSON
    Distribute {
        #[command(flatten)]
        specs: SpecArgs,
        #[command(flatten)]
        options: DistributeArgs,
    },
    /// Filter, then write the scenario manifest
    Manifest {
        #[command(flatten)]
        specs: SpecArgs,
        /// Output directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Print the browser for the tag expression
    Browser {
        /// Selection mode (expression or pattern)
        #[arg(long)]
        policy: Option<PolicyMode>,
        /// Marker tag
        #[arg(long)]
        marker: Option<String>,
    },
    /// Filter, distribute, write the manifest and select the browser
    Plan {
        #[command(flatten)]
        specs: SpecArgs,
        #[command(flatten)]
        options: DistributeArgs,
        /// Manifest output directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Generate weights from recorded timings and merge them into the weight file
    Weights {
        /// Timings JSON shaped as {"<spec>": {"time": ms}}
        timings: PathBuf,
        /// Weight file to update
        #[arg(long)]
        output: Option<PathBuf>,
        /// Total run duration, defaults to the sum of all timings
        #[arg(long)]
        total_duration: Option<f64>,
        /// Weight budget
        #[arg(long)]
        total_weight: Option<f64>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Plan {
    tag_expression: Option<String>,
    browser: Option<Browser>,
    specs: Vec<PathBuf>,
    buckets: Vec<WorkerBucket>,
    manifest: PathBuf,
    total_scenarios: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let mut settings = Settings::load(cli.config.as_deref()).await?;
    settings.apply_tags(std::env::var(TAGS_ENV).ok(), cli.tags);
    if let Some(grammar) = cli.grammar {
        settings.grammar = grammar;
    }

    match cli.command {
        Commands::Filter { specs } => {
            let specs = specs.resolve(&settings).await?;
            for spec in specs {
                println!("{}", spec.display());
            }
        }
        Commands::Distribute { specs, options } => {
            options.apply(&mut settings);
            let specs = specs.resolve(&settings).await?;
            let buckets = distribute(&settings, &specs).await;
            println!("{}", serde_json::to_string_pretty(&buckets)?);
        }
        Commands::Manifest { specs, out_dir } => {
            if let Some(dir) = out_dir {
                settings.manifest_dir = dir;
            }
            let specs = specs.resolve(&settings).await?;
            let manifest = ManifestBuilder::default()
                .generate(&specs, settings.tag_expression(), &settings.manifest_dir)
                .await?;
            println!("{}", settings.manifest_dir.join(MANIFEST_FILE_NAME).display());
            info!("{} scenarios across {} specs", manifest.total_scenarios, manifest.total_specs);
        }
        Commands::Browser { policy, marker } => {
            if let Some(policy) = policy {
                settings.browser_policy = policy;
            }
            if let Some(marker) = marker {
                settings.backend_tag = marker;
            }
            let browser = settings.browser().select(settings.tag_expression());
            println!("{}", browser.map_or("default", |b| b.as_str()));
        }
        Commands::Plan { specs, options, out_dir } => {
            options.apply(&mut settings);
            if let Some(dir) = out_dir {
                settings.manifest_dir = dir;
            }

            let specs = specs.resolve(&settings).await?;
            let buckets = distribute(&settings, &specs).await;
            let manifest = ManifestBuilder::default()
                .generate(&specs, settings.tag_expression(), &settings.manifest_dir)
                .await?;
            let browser = settings.browser().select(settings.tag_expression());

            let plan = Plan {
                tag_expression: settings.tag_expression().map(str::to_string),
                browser,
                specs,
                buckets,
                manifest: settings.manifest_dir.join(MANIFEST_FILE_NAME),
                total_scenarios: manifest.total_scenarios,
            };
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Commands::Weights { timings, output, total_duration, total_weight } => {
            let output = output.unwrap_or_else(|| settings.weights_json.clone());
            let total_weight = total_weight.unwrap_or(settings.total_weight);

            let timings = read_weight_table(&timings)
                .await
                .with_context(|| format!("Failed to read timings from {}", timings.display()))?;
            let merged = update_weights_file(&output, &timings, total_duration, total_weight)
                .await
                .with_context(|| format!("Failed to update weights file {}", output.display()))?;

            println!("{}: {} specs", output.display(), merged.len());
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

impl DistributeArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(threads) = self.threads {
            settings.thread_count = threads;
        }
        if let Some(weights) = &self.weights {
            settings.weights_json = weights.clone();
        }
        if let Some(weight) = self.default_weight {
            settings.default_weight = weight;
        }
        if let Some(rule) = self.suffix_rule {
            settings.suffix_rule = rule;
        }
    }
}

impl SpecArgs {
    /// Collected and filtered spec paths.
    async fn resolve(&self, settings: &Settings) -> Result<Vec<PathBuf>> {
        let specs = specs::collect_specs(&self.specs, self.list.as_deref()).await?;
        specs::filter_specs(settings, specs).await
    }
}

async fn distribute(settings: &Settings, specs: &[PathBuf]) -> Vec<WorkerBucket> {
    let threads = settings.thread_count.max(1);
    if threads > specs.len() {
        info!(
            "Thread count {} exceeds spec count {}, using {} workers",
            threads,
            specs.len(),
            specs.len()
        );
    }

    let table = load_weight_table(&settings.weights_json).await;
    Distributor::new(table)
        .with_default_weight(settings.default_weight)
        .with_suffix_rule(settings.suffix_rule)
        .distribute(specs, threads)
}
