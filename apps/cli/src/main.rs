#![deny(warnings)]

//! Backfill CLI: generates the dimension tables, then simulates every day
//! from the start date to the end date into date-partitioned tables.

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate};
use persistence::{load_checkpoint, Format, PartitionWriter, TableSink};
use sim_runtime::{run_backfill, RunOptions, SimParams, Simulation};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
usage: fulfillment-cli [options]
  --config <yaml>           run parameters (missing fields use defaults)
  --out <dir>               output root (default: data)
  --format <fmt>            csv | parquet | jsonl (default: parquet)
  --seed <n>                override the seed
  --start <YYYY-MM-DD>      override the first simulated day
  --end <YYYY-MM-DD>        override the last simulated day
  --days <n>                simulate n days from the start (or from the checkpoint)
  --resume <path>           continue from a checkpoint
  --checkpoint <path>       save a checkpoint at the end (defaults to --resume path)
  --checkpoint-every <n>    also save every n days
  --progress-every <n>      log progress every n days (default: 30)";

#[derive(Debug)]
struct Args {
    config: Option<PathBuf>,
    out: PathBuf,
    format: Format,
    seed: Option<u64>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    days: Option<u32>,
    resume: Option<PathBuf>,
    checkpoint: Option<PathBuf>,
    checkpoint_every: Option<u32>,
    progress_every: u32,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            config: None,
            out: PathBuf::from("data"),
            format: Format::Parquet,
            seed: None,
            start: None,
            end: None,
            days: None,
            resume: None,
            checkpoint: None,
            checkpoint_every: None,
            progress_every: 30,
        }
    }
}

fn value(it: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    it.next().with_context(|| format!("{flag} expects a value"))
}

fn parsed<T>(it: &mut impl Iterator<Item = String>, flag: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = value(it, flag)?;
    raw.parse()
        .map_err(|e| anyhow::anyhow!("invalid value {raw:?} for {flag}: {e}"))
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => args.config = Some(value(&mut it, &arg)?.into()),
            "--out" => args.out = value(&mut it, &arg)?.into(),
            "--format" => args.format = parsed(&mut it, &arg)?,
            "--seed" => args.seed = Some(parsed(&mut it, &arg)?),
            "--start" => args.start = Some(parsed(&mut it, &arg)?),
            "--end" => args.end = Some(parsed(&mut it, &arg)?),
            "--days" => args.days = Some(parsed(&mut it, &arg)?),
            "--resume" => args.resume = Some(value(&mut it, &arg)?.into()),
            "--checkpoint" => args.checkpoint = Some(value(&mut it, &arg)?.into()),
            "--checkpoint-every" => args.checkpoint_every = Some(parsed(&mut it, &arg)?),
            "--progress-every" => args.progress_every = parsed(&mut it, &arg)?,
            "-h" | "--help" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => bail!("unknown argument {other:?}\n{USAGE}"),
        }
    }
    if args.days == Some(0) {
        bail!("--days must be at least 1");
    }
    Ok(args)
}

fn load_params(args: &Args) -> Result<SimParams> {
    let mut params = match &args.config {
        Some(path) => SimParams::from_yaml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SimParams::default(),
    };
    if let Some(seed) = args.seed {
        params.seed = seed;
    }
    if let Some(start) = args.start {
        params.start_date = start;
    }
    if let Some(end) = args.end {
        params.end_date = end;
    }
    Ok(params)
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args()?;
    info!(git_sha = env!("GIT_SHA"), ?args, "starting backfill CLI");
    let mut params = load_params(&args)?;

    let mut sim = match &args.resume {
        Some(path) => {
            let cp = load_checkpoint(path)
                .with_context(|| format!("loading checkpoint {}", path.display()))?;
            if let Some(days) = args.days {
                params.end_date = cp.next_date + Duration::days(i64::from(days) - 1);
            }
            Simulation::resume(params, &cp)?
        }
        None => {
            if let Some(days) = args.days {
                params.end_date = params.start_date + Duration::days(i64::from(days) - 1);
            }
            Simulation::seeded(params)?
        }
    };

    let mut writer = PartitionWriter::new(&args.out, args.format);
    writer
        .write_dimensions(sim.dims())
        .with_context(|| format!("writing dimensions under {}", args.out.display()))?;

    let opts = RunOptions {
        progress_every: args.progress_every,
        checkpoint_every: args.checkpoint_every,
        checkpoint_path: args.checkpoint.clone().or_else(|| args.resume.clone()),
    };
    let summary = run_backfill(&mut sim, &mut writer, &opts)?;

    match (summary.first_date, summary.last_date) {
        (Some(first), Some(last)) => println!(
            "Backfill OK | days: {} | {} .. {} | rows: {} | out: {}",
            summary.days,
            first,
            last,
            summary.total_rows(),
            args.out.display()
        ),
        _ => println!("Backfill OK | nothing to simulate (next date {})", sim.next_date()),
    }
    println!(
        "Tables | orders: {} | items: {} | snapshots: {} | shipments: {} | deliveries: {} | driver days: {} | assignments: {}",
        summary.orders,
        summary.order_items,
        summary.inventory_snapshots,
        summary.shipments,
        summary.deliveries,
        summary.driver_activity,
        summary.assignments
    );
    if let Some(path) = &opts.checkpoint_path {
        println!("Checkpoint | {} | next date: {}", path.display(), sim.next_date());
    }

    Ok(())
}
