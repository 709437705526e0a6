use std::fs;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use refannot::input::{align_labels, read_clusters, read_gene_list, read_labels, read_matrix};
use refannot::model::config::{
    AnnotateConfig, DEFAULT_FINE_TUNE_THRESHOLD, DEFAULT_QUANTILE, GeneSelection, Granularity,
    Mode, default_workers,
};
use refannot::report::json::render_batch_json;
use refannot::report::text::render_summary;
use refannot::report::Summary;
use refannot::{ReferenceAtlas, classify};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Annotate query samples against a labeled reference atlas.
    Run(RunArgs),
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Reference expression matrix (TSV, genes x samples).
    #[arg(long)]
    reference: PathBuf,

    /// Reference label table: sample, fine label, optional main label.
    #[arg(long)]
    labels: PathBuf,

    /// Query expression matrix (TSV, genes x samples).
    #[arg(long)]
    query: PathBuf,

    /// Cluster assignment table (sample, cluster); required in cluster mode.
    #[arg(long)]
    clusters: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = ModeArg::Cell)]
    mode: ModeArg,

    #[arg(long, value_enum, default_value_t = GenesArg::De)]
    genes: GenesArg,

    /// Explicit gene list, one identifier per line (with --genes list).
    #[arg(long)]
    gene_list: Option<PathBuf>,

    /// Variance threshold override for --genes sd.
    #[arg(long)]
    sd_threshold: Option<f64>,

    /// Quantile used to aggregate per-label correlation coefficients.
    #[arg(long, default_value_t = DEFAULT_QUANTILE)]
    quantile: f64,

    /// Skip iterative fine-tuning; report the coarse argmax label.
    #[arg(long)]
    no_fine_tune: bool,

    /// Fine-tuning margin below the round maximum within which labels survive.
    #[arg(long, default_value_t = DEFAULT_FINE_TUNE_THRESHOLD)]
    threshold: f64,

    #[arg(long, value_enum, default_value_t = GranularityArg::All)]
    granularity: GranularityArg,

    /// Worker threads (default: available parallelism minus one).
    #[arg(long)]
    threads: Option<usize>,

    /// Keep the per-sample fine-tuning trace in the output.
    #[arg(long)]
    trace: bool,

    /// Output JSON path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum ModeArg {
    Cell,
    Cluster,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum GenesArg {
    Sd,
    De,
    List,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum GranularityArg {
    All,
    Main,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let cli = Cli::parse();
    let Commands::Run(args) = cli.command;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let reference = read_matrix(&args.reference).map_err(|e| e.to_string())?;
    let labels = read_labels(&args.labels).map_err(|e| e.to_string())?;
    let (fine, main) = align_labels(reference.samples(), &labels).map_err(|e| e.to_string())?;

    let mut atlas = ReferenceAtlas::new(reference, fine, main).map_err(|e| e.to_string())?;
    if let Some(threshold) = args.sd_threshold {
        atlas = atlas.with_sd_threshold(threshold);
    }

    let query = read_matrix(&args.query).map_err(|e| e.to_string())?;
    let clusters = match &args.clusters {
        Some(path) => Some(read_clusters(path).map_err(|e| e.to_string())?),
        None => None,
    };

    let gene_selection = match args.genes {
        GenesArg::Sd => GeneSelection::Sd {
            threshold: args.sd_threshold,
        },
        GenesArg::De => GeneSelection::De,
        GenesArg::List => {
            let path = args
                .gene_list
                .as_ref()
                .ok_or("--gene-list is required with --genes list")?;
            GeneSelection::List(read_gene_list(path).map_err(|e| e.to_string())?)
        }
    };

    let config = AnnotateConfig {
        mode: match args.mode {
            ModeArg::Cell => Mode::Cell,
            ModeArg::Cluster => Mode::Cluster,
        },
        gene_selection,
        quantile: args.quantile,
        fine_tune: !args.no_fine_tune,
        fine_tune_threshold: args.threshold,
        granularity: match args.granularity {
            GranularityArg::All => Granularity::AllTypes,
            GranularityArg::Main => Granularity::MainTypes,
        },
        workers: args.threads.unwrap_or_else(default_workers),
        keep_trace: args.trace,
    };

    let batch = classify(&query, &atlas, clusters.as_ref(), &config).map_err(|e| e.to_string())?;

    let json = render_batch_json(&batch).map_err(|e| e.to_string())?;
    fs::write(&args.out, json).map_err(|e| e.to_string())?;

    eprint!("{}", render_summary(&Summary::from_batch(&batch)));
    Ok(())
}
