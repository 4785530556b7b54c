//! synth-runner: headless dataset synthesizer.
//!
//! Usage:
//!   synth-runner
//!   synth-runner --seed 7 --out-dir ./output --db synth.db
//!   synth-runner --config overrides.json --json
//!   synth-runner --repair-only --out-dir ./output

use advisory_synth_core::{
    config::{SynthConfig, DEFAULT_SEED},
    integrity::check_dataset,
    pipeline::{PersistedTables, ReconciledViews, SynthPipeline, TableSummary},
    sink::CsvSink,
    store::SynthStore,
};
use anyhow::{bail, Context, Result};
use std::{env, path::Path};

#[derive(serde::Serialize)]
struct RunSummary<'a> {
    run_id: &'a str,
    seed: u64,
    mode: &'a str,
    out_dir: &'a str,
    db: Option<&'a str>,
    tables: Vec<TableCount>,
}

#[derive(serde::Serialize)]
struct TableCount {
    stage: &'static str,
    table: String,
    rows: usize,
}

impl From<&TableSummary> for TableCount {
    fn from(s: &TableSummary) -> Self {
        Self {
            stage: s.stage,
            table: s.table.clone(),
            rows: s.rows,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", DEFAULT_SEED);
    let out_dir = string_arg(&args, "--out-dir").unwrap_or("./output");
    let db = string_arg(&args, "--db");
    let config_path = string_arg(&args, "--config");
    let repair_only = args.iter().any(|a| a == "--repair-only");
    let json = args.iter().any(|a| a == "--json");
    let mode = if repair_only { "repair-only" } else { "generate" };

    let config = match config_path {
        Some(path) => SynthConfig::load(Path::new(path))?,
        None => SynthConfig::default(),
    };

    if !json {
        println!("advisory synth-runner");
        println!("  seed:      {seed}");
        println!("  mode:      {mode}");
        println!("  out_dir:   {out_dir}");
        println!("  db:        {}", db.unwrap_or("(none)"));
        println!();
    }

    let run_id = format!("run-{seed}-{}", chrono::Local::now().format("%Y%m%d%H%M%S"));
    let pipeline = SynthPipeline::new(seed, config)?;
    let mut csv = CsvSink::create(out_dir)
        .with_context(|| format!("creating output directory {out_dir}"))?;

    let mut store = match db {
        Some(path) => {
            let store = SynthStore::open(path)?;
            store.migrate()?;
            let started_at = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
            store.insert_run(&run_id, seed, env!("CARGO_PKG_VERSION"), mode, &started_at)?;
            Some(store)
        }
        None => None,
    };

    let mut tables = Vec::new();
    if repair_only {
        let persisted = PersistedTables::load_csv(Path::new(out_dir))
            .with_context(|| format!("reading base tables from {out_dir}"))?;
        let views = pipeline.reconcile(persisted.sources())?;
        tables.extend(write_views(&views, &mut csv, store.as_mut())?);
    } else {
        let dataset = pipeline.generate()?;
        let violations = check_dataset(&dataset);
        if !violations.is_empty() {
            bail!("{} integrity violations, first: {}", violations.len(), violations[0]);
        }
        let views = pipeline.reconcile(dataset.repair_sources())?;

        dataset.write_to(&mut csv)?;
        if let Some(store) = store.as_mut() {
            dataset.write_to(store)?;
        }
        tables.extend(dataset.summary());
        tables.extend(write_views(&views, &mut csv, store.as_mut())?);
    }

    if let Some(store) = &store {
        for summary in &tables {
            store.append_stage_log(&run_id, summary)?;
        }
    }

    let summary = RunSummary {
        run_id: &run_id,
        seed,
        mode,
        out_dir,
        db,
        tables: tables.iter().map(TableCount::from).collect(),
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    log::info!(
        "run {run_id} complete: seed={} {} tables written",
        pipeline.seed(),
        tables.len()
    );

    Ok(())
}

fn write_views(
    views: &ReconciledViews,
    csv: &mut CsvSink,
    store: Option<&mut SynthStore>,
) -> Result<Vec<TableSummary>> {
    views.write_to(csv)?;
    if let Some(store) = store {
        views.write_to(store)?;
    }
    Ok(views.summary())
}

fn print_summary(summary: &RunSummary<'_>) {
    println!("=== RUN SUMMARY ===");
    println!("  run_id:   {}", summary.run_id);
    for t in &summary.tables {
        println!("  {:<34} {:>6}  ({})", t.table, t.rows, t.stage);
    }
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
