// corpusboard - main.rs
//
// Command-line entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading and logging initialisation
// 3. Seed dataset loading (built-in or user file)
// 4. Dispatch to the requested subcommand

use clap::{Parser, Subcommand, ValueEnum};
use corpusboard::app::backend::{CollectionConfig, CollectorTiming};
use corpusboard::app::dashboard::{Dashboard, Notice, SimulationTiming};
use corpusboard::app::dataset;
use corpusboard::app::store::{DomainConfigUpdate, ViewStateStore};
use corpusboard::core::balance;
use corpusboard::core::corpus;
use corpusboard::core::export;
use corpusboard::core::filter::{self, ActivityFilter};
use corpusboard::core::model::{ActivityStatus, CorpusDocument, EntityKind, QueueLane};
use corpusboard::platform::config::{self, AppConfig, PlatformPaths};
use corpusboard::util::constants;
use corpusboard::util::error::{CorpusBoardError, Result, StoreError};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

/// CorpusBoard - corpus builder dashboard, simulated in memory.
///
/// Loads a sample corpus (collectors, domains, processing queue, activity
/// log) and drives simulated collection, processing and rebalancing
/// against it. Nothing is persisted.
#[derive(Parser, Debug)]
#[command(name = "corpusboard", version, about)]
struct Cli {
    /// Dataset file to load instead of the built-in sample.
    #[arg(short = 's', long = "seed", global = true)]
    seed: Option<PathBuf>,

    /// Config file to use instead of the platform default.
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show corpus statistics, collectors, domain balance and the queue.
    Status,

    /// List recent activity, newest first.
    Activity {
        /// Only show entries with this status (repeatable).
        #[arg(long = "status", value_parser = parse_status)]
        statuses: Vec<ActivityStatus>,

        /// Only show warnings and errors.
        #[arg(long, conflicts_with = "statuses")]
        problems: bool,

        /// Case-insensitive text search over action and details.
        #[arg(long)]
        search: Option<String>,

        /// Regular expression matched against the action.
        #[arg(long)]
        regex: Option<String>,

        /// Maximum entries to print.
        #[arg(short = 'n', long, default_value_t = constants::DEFAULT_ACTIVITY_LIMIT)]
        limit: usize,
    },

    /// Run a scripted session: collectors, queue processors, a batch
    /// operation and a rebalance, printing notices as they arrive.
    Demo {
        /// Collectors to start (repeatable).
        #[arg(long = "collector", default_values_t = ["arXiv".to_string()])]
        collectors: Vec<String>,

        /// Batch operation to run (repeatable).
        #[arg(long = "batch", default_values_t = ["Deduplicate".to_string()])]
        batches: Vec<String>,

        /// Skip the corpus rebalance.
        #[arg(long)]
        no_rebalance: bool,

        /// Give up waiting after this many seconds.
        #[arg(long, default_value_t = constants::DEFAULT_DEMO_TIMEOUT_SECS)]
        timeout: u64,
    },

    /// Set target allocations, e.g. `set-allocation DeFi=0.15 "Risk Management=0.12"`.
    SetAllocation {
        /// DOMAIN=FRACTION pairs.
        #[arg(required = true, value_parser = parse_allocation)]
        allocations: Vec<(String, f64)>,
    },

    /// List the document catalogue.
    Corpus {
        /// Only list documents filed under this domain.
        #[arg(long)]
        domain: Option<String>,

        /// Only list documents below their domain's minimum quality.
        #[arg(long)]
        below_threshold: bool,
    },

    /// Show one document in full, including where it is stored.
    Document {
        /// Document title (case-insensitive).
        title: String,
    },

    /// Show or change a domain's quality threshold and keywords.
    DomainConfig {
        domain: String,

        /// Minimum quality as a fraction (0.75) or a percentage (75%).
        #[arg(long, value_parser = parse_quality)]
        min_quality: Option<f64>,

        /// Comma-separated keywords; replaces the current list.
        #[arg(long)]
        keywords: Option<String>,
    },

    /// Export the activity log (CSV) or a full snapshot (JSON).
    Export {
        #[arg(short = 'f', long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Output file.
        #[arg(short = 'o', long)]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ExportFormat {
    Csv,
    Json,
}

fn parse_status(token: &str) -> std::result::Result<ActivityStatus, String> {
    ActivityStatus::from_token(token).ok_or_else(|| {
        let valid: Vec<&str> = ActivityStatus::all().iter().map(|s| s.label()).collect();
        format!("unknown status '{token}' (expected one of: {})", valid.join(", "))
    })
}

fn parse_allocation(arg: &str) -> std::result::Result<(String, f64), String> {
    let (name, value) = arg
        .rsplit_once('=')
        .ok_or_else(|| format!("'{arg}' is not DOMAIN=FRACTION"))?;
    let fraction = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("'{value}' is not a number: {e}"))?;
    Ok((name.trim().to_string(), fraction))
}

fn parse_quality(arg: &str) -> std::result::Result<f64, String> {
    let trimmed = arg.trim();
    let (number, scale) = match trimmed.strip_suffix('%') {
        Some(number) => (number, 100.0),
        None => (trimmed, 1.0),
    };
    number
        .trim()
        .parse::<f64>()
        .map(|value| value / scale)
        .map_err(|e| format!("'{arg}' is not a number: {e}"))
}

fn main() {
    let cli = Cli::parse();

    // Config comes first so its log level can seed the subscriber.
    let (app_config, config_warnings) = match cli.config.as_deref() {
        Some(path) => match config::load_config_file(path) {
            Ok(loaded) => loaded,
            Err(e) => {
                eprintln!("Error: {e}");
                std::process::exit(2);
            }
        },
        None => config::load_config(&PlatformPaths::resolve().config_dir),
    };

    corpusboard::util::logging::init(cli.debug, app_config.log_level.as_deref());

    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        "corpusboard starting"
    );
    for warning in &config_warnings {
        tracing::warn!("{}", warning);
    }

    if let Err(e) = run(cli, &app_config) {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli, app_config: &AppConfig) -> Result<()> {
    // CLI override > config file > built-in.
    let seed_path = cli.seed.as_deref().or(app_config.seed_file.as_deref());
    let store = ViewStateStore::from_dataset(dataset::load_dataset(seed_path)?);

    match cli.command {
        Command::Status => {
            print_status(&store, app_config.balance_tolerance);
            Ok(())
        }
        Command::Activity {
            statuses,
            problems,
            search,
            regex,
            limit,
        } => {
            let mut activity_filter = if problems {
                ActivityFilter::problems_only()
            } else {
                ActivityFilter {
                    statuses: statuses.into_iter().collect(),
                    ..Default::default()
                }
            };
            activity_filter.text_search = search.unwrap_or_default();
            if let Some(pattern) = regex {
                activity_filter.set_regex(&pattern)?;
            }
            print_activity(&store, &activity_filter, limit);
            Ok(())
        }
        Command::Demo {
            collectors,
            batches,
            no_rebalance,
            timeout,
        } => run_demo(
            store,
            app_config,
            &collectors,
            &batches,
            !no_rebalance,
            Duration::from_secs(timeout),
        ),
        Command::SetAllocation { allocations } => {
            let mut dashboard = Dashboard::simulated(
                store,
                timing_from(app_config),
                app_config.balance_tolerance,
            );
            let result = dashboard.save_allocations(&allocations);
            print_notices(&dashboard.take_notices());
            result?;
            print_domains(dashboard.store(), dashboard.tolerance());
            Ok(())
        }
        Command::Corpus {
            domain,
            below_threshold,
        } => {
            if let Some(name) = domain.as_deref() {
                require_domain(&store, name)?;
            }
            let mut documents = corpus::documents_in(store.documents(), domain.as_deref());
            if below_threshold {
                let flagged = corpus::below_threshold(store.documents(), store.domains());
                documents.retain(|d| flagged.iter().any(|f| f.title == d.title));
            }
            print_documents(&documents);
            Ok(())
        }
        Command::Document { title } => {
            let document = store.document(&title).ok_or_else(|| StoreError::NotFound {
                kind: EntityKind::Document.label(),
                name: title.clone(),
            })?;
            print_document(&store, document);
            Ok(())
        }
        Command::DomainConfig {
            domain,
            min_quality,
            keywords,
        } => {
            require_domain(&store, &domain)?;
            let mut dashboard = Dashboard::simulated(
                store,
                timing_from(app_config),
                app_config.balance_tolerance,
            );
            if min_quality.is_some() || keywords.is_some() {
                let update = DomainConfigUpdate {
                    min_quality,
                    keywords: keywords.as_deref().map(corpus::parse_keywords),
                };
                let result = dashboard.save_domain_config(&domain, update);
                print_notices(&dashboard.take_notices());
                result?;
            }
            print_domain_config(dashboard.store(), &domain);
            Ok(())
        }
        Command::Export { format, output } => export_to(&store, format, &output),
    }
}

fn require_domain(store: &ViewStateStore, name: &str) -> Result<()> {
    if store.domain(name).is_none() {
        return Err(StoreError::NotFound {
            kind: EntityKind::Domain.label(),
            name: name.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Map validated config values onto simulation pacing.
fn timing_from(config: &AppConfig) -> SimulationTiming {
    SimulationTiming {
        collector: CollectorTiming {
            connect_delay: Duration::from_millis(config.collector_connect_delay_ms),
            tick: Duration::from_millis(config.collector_tick_ms),
            step: config.collector_step,
        },
        pdf_tick: Duration::from_millis(config.pdf_tick_ms),
        pdf_step: config.pdf_step,
        nonpdf_tick: Duration::from_millis(config.nonpdf_tick_ms),
        nonpdf_step: config.nonpdf_step,
        batch_delay: Duration::from_millis(config.batch_delay_ms),
        rebalance_delay: Duration::from_millis(config.rebalance_delay_ms),
    }
}

// =============================================================================
// demo
// =============================================================================

fn run_demo(
    store: ViewStateStore,
    app_config: &AppConfig,
    collectors: &[String],
    batches: &[String],
    rebalance: bool,
    timeout: Duration,
) -> Result<()> {
    let mut dashboard = Dashboard::simulated(
        store,
        timing_from(app_config),
        app_config.balance_tolerance,
    );

    let changes = Rc::new(Cell::new(0usize));
    let counter = Rc::clone(&changes);
    dashboard
        .store_mut()
        .subscribe(move |_| counter.set(counter.get() + 1));

    let collection = CollectionConfig {
        max_documents: app_config.collector_documents,
        ..Default::default()
    };
    for name in collectors {
        // A refused or unknown collector is reported and the demo goes on.
        if let Err(e) = dashboard.start_collector(name, &collection) {
            eprintln!("  ! {e}");
        }
    }
    for lane in QueueLane::all() {
        dashboard.start_processor(*lane);
    }
    for operation in batches {
        dashboard.run_batch_operation(operation);
    }
    if rebalance {
        if let Some(plan) = dashboard.rebalance_corpus() {
            for action in &plan.actions {
                println!("  plan: {action}");
            }
        }
    }
    print_notices(&dashboard.take_notices());

    let started = Instant::now();
    while dashboard.is_busy() {
        if started.elapsed() >= timeout {
            println!("Timed out after {}s; cancelling outstanding work", timeout.as_secs());
            break;
        }
        dashboard.pump_for(Duration::from_millis(250));
        print_notices(&dashboard.take_notices());
    }
    dashboard.shutdown();
    print_notices(&dashboard.take_notices());

    println!();
    println!("{} store changes observed", changes.get());
    print_status(dashboard.store(), dashboard.tolerance());
    Ok(())
}

// =============================================================================
// export
// =============================================================================

fn export_to(store: &ViewStateStore, format: ExportFormat, output: &Path) -> Result<()> {
    let file = std::fs::File::create(output).map_err(|e| CorpusBoardError::Io {
        path: output.to_path_buf(),
        operation: "create export file",
        source: e,
    })?;
    let writer = std::io::BufWriter::new(file);

    match format {
        ExportFormat::Csv => {
            let count = export::export_activity_csv(store.activity(), writer, output)?;
            println!("Exported {count} activity entries to {}", output.display());
        }
        ExportFormat::Json => {
            export::export_snapshot_json(&store.snapshot(), writer, output)?;
            println!("Exported snapshot to {}", output.display());
        }
    }
    Ok(())
}

// =============================================================================
// Output
// =============================================================================

fn print_notices(notices: &[Notice]) {
    for notice in notices {
        println!("[{:<7}] {}", notice.level.label(), notice.message);
    }
}

fn print_status(store: &ViewStateStore, tolerance: f64) {
    let stats = store.stats();
    println!("{} v{}", constants::APP_NAME, constants::APP_VERSION);
    println!(
        "Documents: {}   Size: {:.1} GB   Avg quality: {:.1}%",
        stats.total_documents,
        stats.total_size_gb,
        stats.average_quality * 100.0
    );
    println!(
        "Queue: {} queued, {} processing, {} completed   Running collectors: {}",
        stats.queued, stats.processing, stats.completed, stats.running_collectors
    );

    println!();
    println!("COLLECTORS");
    for c in store.collectors() {
        let last_run = c
            .last_run
            .map(|d| d.to_string())
            .unwrap_or_else(|| "never".to_string());
        let progress = if c.progress > 0 {
            format!(" {:>3}%", c.progress)
        } else {
            String::new()
        };
        println!(
            "  {:<16} {:<14} {:<8} {:>6} docs  last run {}{}",
            c.name,
            c.source_type.label(),
            c.status.label(),
            c.documents,
            last_run,
            progress
        );
    }

    println!();
    print_domains(store, tolerance);

    println!();
    println!("QUEUE");
    for q in store.queue() {
        println!(
            "  {:<36} {:<8} {:<10} {:>3}%",
            q.file,
            q.lane.label(),
            q.status.label(),
            q.progress
        );
    }
}

fn print_domains(store: &ViewStateStore, tolerance: f64) {
    println!("DOMAINS");
    for d in store.domains() {
        println!(
            "  {:<26} target {:>5.1}%  current {:>5.1}%  {:>5} docs  {}",
            d.name,
            d.target_allocation * 100.0,
            d.current_allocation * 100.0,
            d.documents,
            balance::allocation_status(d, tolerance)
        );
    }
    let total = balance::target_total(store.domains());
    if !balance::is_normalised(store.domains(), tolerance) {
        println!("  (targets sum to {:.1}%)", total * 100.0);
    }
}

fn print_documents(documents: &[&CorpusDocument]) {
    if documents.is_empty() {
        println!("No documents");
        return;
    }
    for doc in documents {
        println!(
            "{:<52} {:<24} {:<8} {}  {:>5.1} MB  {:>3}%",
            doc.title,
            doc.domain,
            doc.kind.label(),
            doc.date,
            doc.size_mb,
            (doc.quality * 100.0).round()
        );
        if !doc.snippet.is_empty() {
            println!("    {}", doc.snippet);
        }
    }
}

fn print_document(store: &ViewStateStore, doc: &CorpusDocument) {
    println!("{}", doc.title);
    println!("  Domain:        {}", doc.domain);
    println!("  Type:          {}", doc.kind);
    println!("  Date:          {}", doc.date);
    println!("  Size:          {:.1} MB", doc.size_mb);
    println!("  Quality Score: {}%", (doc.quality * 100.0).round());
    println!("  Path:          {}", corpus::storage_path(store.corpus_root(), doc));
    if let Some(domain) = store.domain(&doc.domain) {
        if doc.quality < domain.min_quality {
            println!(
                "  Below the {:.0}% minimum for {}",
                domain.min_quality * 100.0,
                domain.name
            );
        }
        let hits = corpus::keyword_hits(doc, &domain.keywords);
        if !hits.is_empty() {
            println!("  Keywords:      {}", hits.join(", "));
        }
    }
    if !doc.snippet.is_empty() {
        println!();
        println!("  {}", doc.snippet);
    }
}

fn print_domain_config(store: &ViewStateStore, name: &str) {
    let Some(domain) = store.domain(name) else {
        return;
    };
    println!("{}", domain.name);
    println!("  Target allocation: {:.1}%", domain.target_allocation * 100.0);
    println!("  Minimum quality:   {:.0}%", domain.min_quality * 100.0);
    let keywords = if domain.keywords.is_empty() {
        "(none)".to_string()
    } else {
        domain.keywords.join(", ")
    };
    println!("  Keywords:          {keywords}");
    let documents = corpus::documents_in(store.documents(), Some(&domain.name));
    println!("  Catalogued:        {} documents", documents.len());
}

fn print_activity(store: &ViewStateStore, activity_filter: &ActivityFilter, limit: usize) {
    let entries = store.activity();
    let matches = filter::apply_filters(entries, activity_filter);
    for &idx in matches.iter().take(limit) {
        let entry = &entries[idx];
        let details = entry
            .details
            .as_deref()
            .map(|d| format!(" ({d})"))
            .unwrap_or_default();
        println!(
            "{}  {:<7}  {}{}",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.status.label(),
            entry.action,
            details
        );
    }
    if matches.len() > limit {
        println!("... {} more", matches.len() - limit);
    }
}
