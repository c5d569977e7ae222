use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::{Parser, error::ErrorKind};

use crate::config::ReconcileConfig;
use crate::constants::splits::ALL_SPLITS;
use crate::constants::table::{DISCARDS_FILENAME, METADATA_FILENAME};
use crate::engine::{Reconciler, output_fingerprint};
use crate::source::{detect_overlaps, load_msasl_records, load_wlasl_records};
use crate::splits::SplitRatios;
use crate::table::{write_discards, write_metadata};

#[derive(Debug, Parser)]
#[command(
    name = "signmerge",
    disable_help_subcommand = true,
    about = "Reconcile WLASL and MS-ASL corpora into one leak-free dataset",
    long_about = "Load both annotation corpora, resolve cross-corpus URL overlaps, assign \
                  canonical filenames, assign leak-free train/val/test splits, and write the \
                  final metadata and discard tables.",
    after_help = "The metadata table and discard report are written into --out-dir. \
                  Identical inputs and --seed reproduce the output byte for byte."
)]
struct ReconcileCli {
    #[arg(
        long = "wlasl-json",
        value_name = "PATH",
        help = "WLASL-style annotation JSON file"
    )]
    wlasl_json: PathBuf,
    #[arg(
        long = "wlasl-videos",
        value_name = "DIR",
        help = "Optional directory of already-downloaded WLASL videos"
    )]
    wlasl_videos: Option<PathBuf>,
    #[arg(
        long = "msasl-train",
        value_name = "PATH",
        help = "MS-ASL train-split JSON file"
    )]
    msasl_train: PathBuf,
    #[arg(
        long = "msasl-val",
        value_name = "PATH",
        help = "MS-ASL val-split JSON file"
    )]
    msasl_val: PathBuf,
    #[arg(
        long = "msasl-test",
        value_name = "PATH",
        help = "MS-ASL test-split JSON file"
    )]
    msasl_test: PathBuf,
    #[arg(
        long = "out-dir",
        value_name = "DIR",
        default_value = "reconciled",
        help = "Directory for the metadata table and discard report"
    )]
    out_dir: PathBuf,
    #[arg(
        long,
        default_value_t = 42,
        help = "Deterministic seed used for split rebalancing"
    )]
    seed: u64,
    #[arg(
        long = "split-ratios",
        value_name = "TRAIN,VAL,TEST",
        value_parser = parse_split_ratios_arg,
        default_value = "0.75,0.15,0.15",
        help = "Comma-separated target split ratios that must sum to 1.0"
    )]
    split: SplitRatios,
    #[arg(
        long,
        default_value_t = 0.02,
        help = "Allowed deviation of a split's share from its target"
    )]
    slack: f64,
    #[arg(
        long,
        help = "Fail on the first overlap entry referencing a missing record"
    )]
    strict: bool,
    #[arg(
        long = "no-stratify",
        help = "Disable per-label stratification during rebalancing"
    )]
    no_stratify: bool,
}

/// Run the full reconciliation from the command line.
pub fn run_reconcile<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) = parse_cli::<ReconcileCli, _>(
        std::iter::once("signmerge".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    let config = ReconcileConfig {
        seed: cli.seed,
        ratios: cli.split,
        rebalance_slack: cli.slack,
        strict_references: cli.strict,
        stratify_by_label: !cli.no_stratify,
        ..ReconcileConfig::default()
    };

    let wlasl = load_wlasl_records(&cli.wlasl_json, cli.wlasl_videos.as_deref())?;
    let msasl = load_msasl_records(&cli.msasl_train, &cli.msasl_val, &cli.msasl_test)?;
    let entries = detect_overlaps(&wlasl, &msasl);

    let engine = Reconciler::new(config)?;
    let output = engine.run(&wlasl, &msasl, &entries)?;

    fs::create_dir_all(&cli.out_dir)?;
    let metadata_path = cli.out_dir.join(METADATA_FILENAME);
    let discards_path = cli.out_dir.join(DISCARDS_FILENAME);
    write_metadata(&metadata_path, &output.rows)?;
    write_discards(&discards_path, &output.discards)?;

    let diagnostics = &output.diagnostics;
    println!("=== reconciliation summary ===");
    println!("seed: {}", cli.seed);
    println!(
        "records: {} total, {} discarded duplicates, {} surviving",
        diagnostics.total_records, diagnostics.discarded_duplicates, diagnostics.survivors
    );
    println!(
        "locks: {} records locked by url-group conflicts",
        diagnostics.locked
    );
    println!(
        "rebalancing: {} moved to val, {} moved to test",
        diagnostics.moved_to_validation, diagnostics.moved_to_test
    );
    println!();
    println!("[SPLITS]");
    for label in ALL_SPLITS {
        println!(
            "  {} => count: {}, share: {:.4} (target {:.4})",
            label,
            diagnostics.achieved.count(label),
            diagnostics.achieved.share(label),
            diagnostics.target.share(label)
        );
    }
    if let Some(warning) = &output.ratio_warning {
        println!(
            "  target ratio unreachable: locked records hold the achieved shares above; \
             best train share {:.4} vs target {:.4}",
            warning.achieved.share(crate::splits::SplitLabel::Train),
            warning.target.train
        );
    }
    println!();
    let fetches = output
        .plans
        .iter()
        .filter(|plan| plan.instruction.needs_fetch())
        .count();
    let trims = output
        .plans
        .iter()
        .filter(|plan| plan.instruction.needs_trim())
        .count();
    println!("[MATERIALIZATION]");
    println!(
        "  {} outputs planned ({} need fetching, {} need trimming)",
        output.plans.len(),
        fetches,
        trims
    );
    if !output.renames.is_empty() {
        println!("  {} filename collisions repaired:", output.renames.len());
        for rename in &output.renames {
            println!(
                "    {} => '{}' (contested '{}')",
                rename.key, rename.assigned, rename.contested
            );
        }
    }
    if !output.ambiguities.is_empty() {
        println!(
            "  {} borderline overlap classifications flagged for audit",
            output.ambiguities.len()
        );
    }
    if !output.missing.is_empty() {
        println!(
            "  {} overlap entries skipped (missing references)",
            output.missing.len()
        );
    }
    println!();
    println!("metadata table : {}", metadata_path.display());
    println!("discard report : {}", discards_path.display());
    println!("output fingerprint: {:016x}", output_fingerprint(&output.rows));

    Ok(())
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

fn parse_split_ratios_arg(raw: &str) -> Result<SplitRatios, String> {
    let parts: Vec<&str> = raw.split(',').collect();
    if parts.len() != 3 {
        return Err("--split-ratios expects exactly 3 comma-separated values".to_string());
    }
    let train = parts[0]
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("invalid train ratio '{}': must be a float", parts[0].trim()))?;
    let validation = parts[1]
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("invalid val ratio '{}': must be a float", parts[1].trim()))?;
    let test = parts[2]
        .trim()
        .parse::<f32>()
        .map_err(|_| format!("invalid test ratio '{}': must be a float", parts[2].trim()))?;
    let ratios = SplitRatios {
        train,
        validation,
        test,
    };
    if train < 0.0 || validation < 0.0 || test < 0.0 {
        return Err("split ratios must be non-negative".to_string());
    }
    let sum = train + validation + test;
    if (sum - 1.0).abs() > 1e-5 {
        return Err(format!(
            "split ratios must sum to 1.0, got {:.6} (train={}, val={}, test={})",
            sum, train, validation, test
        ));
    }
    Ok(ratios)
}
