use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use vanet_config::AnalysisConfig;
use vanet_engine::{run_analysis, run_collision_risk, run_compare, CompareOptions};
use vanet_telemetry::{EventLogger, MetricsRecorder};

#[derive(Parser, Debug)]
#[command(name = "vanet", version, about)]
pub struct Cli {
    /// Configuration file; defaults to `config/vanet.yaml` plus `VANET_*` variables
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest simulation outputs and compute behavior, communication and reaction metrics
    Analyze(AnalyzeArgs),
    /// Compute gap and time-to-collision proxies from a SUMO netstate dump
    CollisionRisk(CollisionRiskArgs),
    /// Compare a baseline and a lossy incident run on a one-second timeline
    Compare(CompareArgs),
}

#[derive(Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Input file or directory
    #[arg(long)]
    pub input: PathBuf,
    /// Output directory
    #[arg(long)]
    pub out: PathBuf,
    /// Station id of the emergency vehicle
    #[arg(long)]
    pub emergency_tx_id: Option<u32>,
    /// Sweep definition restricting which sweep points are ingested
    #[arg(long)]
    pub sweep_config: Option<PathBuf>,
    /// Upper bound on runs analyzed concurrently
    #[arg(long)]
    pub max_parallel_runs: Option<usize>,
    /// Write Prometheus metrics to this file when done
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CollisionRiskArgs {
    /// SUMO netstate XML dump
    #[arg(long)]
    pub netstate: PathBuf,
    #[arg(long)]
    pub out_dir: PathBuf,
    #[arg(long)]
    pub gap_threshold_m: Option<f64>,
    #[arg(long)]
    pub ttc_threshold_s: Option<f64>,
}

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    #[arg(long)]
    pub baseline_dir: PathBuf,
    #[arg(long)]
    pub lossy_dir: PathBuf,
    #[arg(long)]
    pub out_dir: PathBuf,
    #[arg(long, default_value = "baseline")]
    pub baseline_label: String,
    #[arg(long, default_value = "lossy")]
    pub lossy_label: String,
    #[arg(long)]
    pub gap_threshold_m: Option<f64>,
    #[arg(long)]
    pub ttc_threshold_s: Option<f64>,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::load_from_path(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => AnalysisConfig::load().context("loading configuration"),
    }
}

/// Flags win over loaded configuration values.
fn apply_analyze_overrides(config: &mut AnalysisConfig, args: &AnalyzeArgs) {
    if let Some(id) = args.emergency_tx_id {
        config.reaction.emergency_tx_id = id;
    }
    if let Some(path) = &args.sweep_config {
        config.ingest.sweep_config = path.clone();
    }
    if let Some(n) = args.max_parallel_runs {
        config.ingest.max_parallel_runs = n.max(1);
    }
    if let Some(path) = &args.metrics_file {
        config.telemetry.metrics_file = Some(path.clone());
    }
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = load_config(cli.config.as_ref())?;
    EventLogger::init(&config.telemetry.log_level);
    let metrics = MetricsRecorder::new().context("registering metrics")?;

    match cli.command {
        Commands::Analyze(args) => {
            apply_analyze_overrides(&mut config, &args);
            let report = run_analysis(&args.input, &args.out, &config, &metrics)
                .await
                .with_context(|| format!("analyzing {}", args.input.display()))?;
            info!(runs = report.runs, "analysis finished");
            for path in &report.written {
                println!("{}", path.display());
            }
            println!("{}", report.statement);
        }
        Commands::CollisionRisk(args) => {
            let mut thresholds = config.risk;
            if let Some(gap) = args.gap_threshold_m {
                thresholds.gap_threshold_m = gap;
            }
            if let Some(ttc) = args.ttc_threshold_s {
                thresholds.ttc_threshold_s = ttc;
            }
            let summary = run_collision_risk(&args.netstate, &args.out_dir, thresholds)
                .await
                .with_context(|| format!("analyzing {}", args.netstate.display()))?;
            info!(?summary, "collision-risk finished");
            println!("{}", args.out_dir.join(vanet_engine::RISK_SUMMARY_FILE).display());
            println!("{}", args.out_dir.join(vanet_engine::RISK_TIMESERIES_FILE).display());
        }
        Commands::Compare(args) => {
            let options = CompareOptions {
                baseline_dir: args.baseline_dir,
                lossy_dir: args.lossy_dir,
                out_dir: args.out_dir.clone(),
                baseline_label: args.baseline_label,
                lossy_label: args.lossy_label,
                gap_threshold_m: args.gap_threshold_m.unwrap_or(config.risk.gap_threshold_m),
                ttc_threshold_s: args.ttc_threshold_s.unwrap_or(config.risk.ttc_threshold_s),
            };
            run_compare(options).await.context("comparing runs")?;
            println!("{}", args.out_dir.join(vanet_engine::compare::SUMMARY_TABLE_FILE).display());
            println!("{}", args.out_dir.join(vanet_engine::compare::TIMELINE_FILE).display());
        }
    }

    if let Some(path) = &config.telemetry.metrics_file {
        let exposition = metrics.gather_metrics().context("gathering metrics")?;
        std::fs::write(path, exposition)
            .with_context(|| format!("writing metrics to {}", path.display()))?;
    }
    Ok(())
}
