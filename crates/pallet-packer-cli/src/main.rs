use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pallet_packer_core::batch::{order_seed, pack_orders, BatchOptions, FailedOrder};
use pallet_packer_core::config::{PackerConfig, StabilitySchedule};
use pallet_packer_core::export::{
    pallet_rows, placement_rows, summary_row, PalletRow, PlacementRow, SummaryRow,
};
use pallet_packer_core::model::{Item, Order, OrderSolution};
use pallet_packer_core::pipeline::pack_order;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "pallet-packer",
    about = "Pack order datasets onto pallets",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --no-progress or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pack a whole dataset across the worker pool
    Batch(BatchArgs),
    /// Pack a dataset in fixed-size chunks, writing results after each chunk
    Chunked(ChunkedArgs),
    /// Pack a dataset one order at a time on the current thread
    Sequential(BatchArgs),
    /// Pack a single order selected by id
    Order(OrderArgs),
    /// Dump per-order dataset statistics without packing
    Stats(StatsArgs),
}

#[derive(Parser, Debug, Clone)]
struct BatchArgs {
    // Input/Output
    /// Orders CSV (Order,Product,Quantity,Length,Width,Height,Weight)
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Output directory
    #[arg(short, long, default_value = "out", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// Report base name (files will be name_summary.csv etc.)
    #[arg(short, long, default_value = "results", help_heading = "Input/Output")]
    name: String,
    /// JSON config file path (overrides packing/search options)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,

    // Packing
    /// Pallet length (mm)
    #[arg(long, default_value_t = 1200.0, help_heading = "Packing")]
    pallet_length: f64,
    /// Pallet width (mm)
    #[arg(long, default_value_t = 800.0, help_heading = "Packing")]
    pallet_width: f64,
    /// Maximum stack height (mm)
    #[arg(long, default_value_t = 1400.0, help_heading = "Packing")]
    pallet_max_height: f64,
    /// Allow 90 degree rotation
    #[arg(long, default_value_t = true, action=ArgAction::Set, help_heading = "Packing")]
    allow_rotation: bool,
    /// Base pallet budget per order
    #[arg(long, default_value_t = 5, help_heading = "Packing")]
    max_pallets: usize,
    /// Stability schedule: count | fill
    #[arg(long, default_value = "count", help_heading = "Packing")]
    stability: String,

    // Run control
    /// Base seed; each order derives its own stream
    #[arg(long, default_value_t = 42, help_heading = "Run")]
    seed: u64,
    /// Worker threads (default: machine parallelism clamped to 2..=8)
    #[arg(short, long, help_heading = "Run")]
    threads: Option<usize>,
}

#[derive(Parser, Debug, Clone)]
struct ChunkedArgs {
    #[command(flatten)]
    batch: BatchArgs,
    /// Orders per chunk
    #[arg(long, default_value_t = 50, help_heading = "Run")]
    chunk_size: usize,
}

#[derive(Parser, Debug, Clone)]
struct OrderArgs {
    #[command(flatten)]
    batch: BatchArgs,
    /// Order id to pack
    #[arg(long, help_heading = "Run")]
    order_id: String,
}

#[derive(Parser, Debug, Clone)]
struct StatsArgs {
    /// Orders CSV
    input: PathBuf,
    /// Optional CSV output path (stdout when omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    match &cli.command {
        Commands::Batch(args) => run_batch(args, cli.progress && !cli.quiet),
        Commands::Chunked(args) => run_chunked(args, cli.progress && !cli.quiet),
        Commands::Sequential(args) => run_sequential(args, cli.progress && !cli.quiet),
        Commands::Order(args) => run_single_order(args),
        Commands::Stats(args) => run_stats(args),
    }
}

fn run_batch(args: &BatchArgs, _show_progress: bool) -> anyhow::Result<()> {
    let cfg = build_config(args)?;
    let orders = read_orders(&args.input)?;
    info!(orders = orders.len(), "loaded dataset");

    let opts = BatchOptions {
        base_seed: args.seed,
        parallelism: args.threads,
    };
    let report = pack_orders(&orders, &cfg, &opts)?;

    write_reports(args, &report.solutions)?;
    print_failures(&report.failed);
    Ok(())
}

fn run_chunked(args: &ChunkedArgs, _show_progress: bool) -> anyhow::Result<()> {
    anyhow::ensure!(args.chunk_size > 0, "chunk_size must be positive");
    let cfg = build_config(&args.batch)?;
    let orders = read_orders(&args.batch.input)?;
    info!(
        orders = orders.len(),
        chunk_size = args.chunk_size,
        "loaded dataset"
    );

    let opts = BatchOptions {
        base_seed: args.batch.seed,
        parallelism: args.batch.threads,
    };

    // Per-order seeds depend only on the base seed and the order id, so
    // chunking never changes any order's result.
    let mut solutions = Vec::with_capacity(orders.len());
    let mut failed = Vec::new();
    for (i, chunk) in orders.chunks(args.chunk_size).enumerate() {
        let report = pack_orders(chunk, &cfg, &opts)?;
        info!(
            chunk = i,
            done = solutions.len() + report.solutions.len(),
            "chunk finished"
        );
        solutions.extend(report.solutions);
        failed.extend(report.failed);
        // Rewritten after every chunk, always in sorted order.
        solutions.sort_by(|a, b| a.order_id.cmp(&b.order_id));
        write_reports(&args.batch, &solutions)?;
    }
    if orders.is_empty() {
        write_reports(&args.batch, &[])?;
    }
    print_failures(&failed);
    Ok(())
}

fn run_sequential(args: &BatchArgs, show_progress: bool) -> anyhow::Result<()> {
    let cfg = build_config(args)?;
    let orders = read_orders(&args.input)?;
    info!(orders = orders.len(), "loaded dataset (sequential run)");

    let bar = progress_bar(orders.len(), show_progress);
    let mut solutions = Vec::with_capacity(orders.len());
    let mut failed = Vec::new();
    for order in &orders {
        if let Some(b) = &bar {
            b.set_message(order.order_id.clone());
        }
        // Same per-order seed as the parallel driver, so both modes emit
        // identical results.
        let seed = order_seed(args.seed, &order.order_id);
        match pack_order(order, &cfg, seed) {
            Ok(solution) => solutions.push(solution),
            Err(e) => {
                warn!(order_id = %order.order_id, error = %e, "order failed");
                failed.push(FailedOrder {
                    order_id: order.order_id.clone(),
                    message: e.to_string(),
                });
            }
        }
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }

    solutions.sort_by(|a, b| a.order_id.cmp(&b.order_id));
    write_reports(args, &solutions)?;
    print_failures(&failed);
    Ok(())
}

fn run_single_order(args: &OrderArgs) -> anyhow::Result<()> {
    let cfg = build_config(&args.batch)?;
    let orders = read_orders(&args.batch.input)?;
    let order = orders
        .iter()
        .find(|o| o.order_id == args.order_id)
        .with_context(|| format!("order {} not found in dataset", args.order_id))?;

    let seed = order_seed(args.batch.seed, &order.order_id);
    let solution = pack_order(order, &cfg, seed)?;
    let stats = solution.stats();
    info!(
        order_id = %solution.order_id,
        pallets = stats.pallets_used,
        placed = stats.items_placed,
        unplaced = stats.items_unplaced,
        volume_utilization = format!("{:.4}", stats.avg_volume_utilization),
        "order packed"
    );
    write_reports(&args.batch, std::slice::from_ref(&solution))?;
    Ok(())
}

fn run_stats(args: &StatsArgs) -> anyhow::Result<()> {
    let orders = read_orders(&args.input)?;

    #[derive(serde::Serialize)]
    struct StatsRow {
        #[serde(rename = "OrderId")]
        order_id: String,
        #[serde(rename = "ItemCount")]
        item_count: usize,
        #[serde(rename = "ProductTypes")]
        product_types: usize,
        #[serde(rename = "Entropy")]
        entropy: String,
        #[serde(rename = "Complexity")]
        complexity: String,
        #[serde(rename = "SizeClass")]
        size_class: String,
    }

    let rows: Vec<StatsRow> = orders
        .iter()
        .map(|o| StatsRow {
            order_id: o.order_id.clone(),
            item_count: o.items.len(),
            product_types: o.distinct_products().len(),
            entropy: format!("{:.4}", o.entropy()),
            complexity: o.complexity_class().as_str().to_string(),
            size_class: o.size_class().as_str().to_string(),
        })
        .collect();

    match &args.out {
        Some(path) => {
            let mut wtr = csv::Writer::from_path(path)
                .with_context(|| format!("create {}", path.display()))?;
            for row in &rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
            info!(?path, orders = rows.len(), "stats written");
        }
        None => {
            let mut wtr = csv::Writer::from_writer(std::io::stdout());
            for row in &rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
    }
    Ok(())
}

/// Packing config from CLI flags, or from the JSON config file when one is
/// given; the file replaces the flag-derived settings en bloc.
fn build_config(args: &BatchArgs) -> anyhow::Result<PackerConfig> {
    let mut cfg = PackerConfig {
        pallet_length: args.pallet_length,
        pallet_width: args.pallet_width,
        pallet_max_height: args.pallet_max_height,
        allow_rotation: args.allow_rotation,
        base_max_pallets: args.max_pallets,
        stability: args
            .stability
            .parse::<StabilitySchedule>()
            .map_err(|_| anyhow::anyhow!("unknown stability schedule: {}", args.stability))?,
        ..PackerConfig::default()
    };
    if let Some(path) = &args.config {
        let file = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        cfg = serde_json::from_str(&file)
            .with_context(|| format!("parse config {}", path.display()))?;
    }
    cfg.validate()?;
    Ok(cfg)
}

/// Reads the order CSV. One row is one product line; `Quantity` items are
/// materialized with sequential ids. Rows with fewer than 7 fields or
/// unparsable numbers are skipped.
fn read_orders(path: &Path) -> anyhow::Result<Vec<Order>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;

    // Orders keep their first-appearance position; the drivers sort results
    // by order id on emission.
    let mut order_ids: Vec<String> = Vec::new();
    let mut items_by_order: std::collections::HashMap<String, Vec<Item>> =
        std::collections::HashMap::new();

    for (line, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("read {}", path.display()))?;
        if record.len() < 7 {
            continue;
        }
        let parsed = (|| -> Option<(String, String, usize, f64, f64, f64, f64)> {
            Some((
                record.get(0)?.trim().to_string(),
                record.get(1)?.trim().to_string(),
                record.get(2)?.trim().parse().ok()?,
                record.get(3)?.trim().parse().ok()?,
                record.get(4)?.trim().parse().ok()?,
                record.get(5)?.trim().parse().ok()?,
                record.get(6)?.trim().parse().ok()?,
            ))
        })();
        let Some((order_id, product_id, quantity, length, width, height, weight)) = parsed
        else {
            warn!(line = line + 2, "skipping malformed row");
            continue;
        };
        if [length, width, height, weight]
            .iter()
            .any(|v| !v.is_finite() || *v <= 0.0)
        {
            warn!(line = line + 2, "skipping row with non-positive values");
            continue;
        }

        let items = items_by_order.entry(order_id.clone()).or_insert_with(|| {
            order_ids.push(order_id.clone());
            Vec::new()
        });
        for _ in 0..quantity {
            let item_id = items.len() as u32 + 1;
            items.push(Item::new(
                product_id.clone(),
                item_id,
                length,
                width,
                height,
                weight,
            ));
        }
    }

    order_ids
        .into_iter()
        .map(|id| {
            let items = items_by_order.remove(&id).unwrap_or_default();
            Order::try_new(id, items).map_err(Into::into)
        })
        .collect()
}

fn write_reports(args: &BatchArgs, solutions: &[OrderSolution]) -> anyhow::Result<()> {
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create out_dir {}", args.out_dir.display()))?;

    let summary_path = args.out_dir.join(format!("{}_summary.csv", args.name));
    let pallets_path = args.out_dir.join(format!("{}_pallets.csv", args.name));
    let placements_path = args.out_dir.join(format!("{}_placements.csv", args.name));

    write_csv::<SummaryRow>(&summary_path, solutions.iter().map(summary_row).collect())?;
    write_csv::<PalletRow>(
        &pallets_path,
        solutions.iter().flat_map(pallet_rows).collect(),
    )?;
    write_csv::<PlacementRow>(
        &placements_path,
        solutions.iter().flat_map(placement_rows).collect(),
    )?;

    info!(
        summary = %summary_path.display(),
        pallets = %pallets_path.display(),
        placements = %placements_path.display(),
        orders = solutions.len(),
        "reports written"
    );
    Ok(())
}

fn write_csv<T: serde::Serialize>(path: &Path, rows: Vec<T>) -> anyhow::Result<()> {
    let mut wtr =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    for row in &rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn print_failures(failed: &[FailedOrder]) {
    if failed.is_empty() {
        return;
    }
    warn!(count = failed.len(), "orders failed");
    for f in failed.iter().take(10) {
        warn!(order_id = %f.order_id, message = %f.message, "failed order");
    }
    if failed.len() > 10 {
        warn!(suppressed = failed.len() - 10, "further failures omitted");
    }
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

fn progress_bar(len: usize, progress: bool) -> Option<ProgressBar> {
    if !progress {
        return None;
    }
    let b = ProgressBar::new(len as u64);
    b.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} packing {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )
        .unwrap(),
    );
    Some(b)
}
