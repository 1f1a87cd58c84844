use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use serde::Serialize;
use serde_json::json;
use tokmine::corpus::{load_vectors, read_vectors};
use tokmine::detokenizer::record_to_json;
use tokmine::miner::TokenVector;
use tokmine::{
    Detokenizer, IngestConfig, MinerConfig, RecordTokenizer, Rule, StopReason, TemplateMiner,
    TimestampClassifier, Token, TokenDictionary, TOKEN_BASE,
};

const DEFAULT_TOKEN_FILE: &str = "tokens.json";

#[derive(Parser, Debug)]
#[command(author, version, about = "Log template mining toolkit", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenize newline-delimited JSON records into token vectors
    Tokenize(TokenizeArgs),
    /// Mine token vectors into wildcarded templates
    Mine(MineArgs),
    /// Reconstruct records from token vectors
    Detokenize(DetokenizeArgs),
    /// Inspect a token dictionary
    Info(InfoArgs),
}

#[derive(Args, Debug)]
struct TokenizeArgs {
    /// Record files or directories; stdin when omitted
    inputs: Vec<PathBuf>,

    /// Token dictionary to load and persist
    #[arg(short = 'f', long, value_name = "PATH", default_value = DEFAULT_TOKEN_FILE)]
    token_file: PathBuf,

    /// Output path for token vectors (defaults to stdout)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Year prefix treated as a mutable timestamp
    #[arg(long, value_name = "PREFIX", default_value = "2025")]
    year_prefix: String,

    /// Disable recursive directory traversal
    #[arg(long)]
    no_recursive: bool,

    /// Follow symlinks during traversal
    #[arg(long)]
    follow_symlinks: bool,
}

#[derive(Args, Debug)]
struct MineArgs {
    /// Vector files; stdin when omitted
    inputs: Vec<PathBuf>,

    /// Target Hamming distance for seed pairs
    #[arg(short = 'd', long, value_name = "N", default_value_t = 2)]
    distance: usize,

    /// Maximum mining iterations
    #[arg(long, value_name = "COUNT")]
    max_iterations: Option<usize>,

    /// Output path for the mining report (defaults to stdout)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Emit pretty JSON
    #[arg(long)]
    pretty: bool,

    /// Disable per-iteration logging/progress
    #[arg(long)]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct DetokenizeArgs {
    /// Token dictionary the vectors were produced against
    #[arg(short = 'f', long, value_name = "PATH")]
    token_file: PathBuf,

    /// Vector files; stdin when omitted
    inputs: Vec<PathBuf>,

    /// Output path for reconstructed records (defaults to stdout)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Token dictionary to inspect
    #[arg(short = 'f', long, value_name = "PATH", default_value = DEFAULT_TOKEN_FILE)]
    token_file: PathBuf,

    /// Emit machine-readable JSON summary
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Tokenize(args) => run_tokenize(args),
        Commands::Mine(args) => run_mine(args),
        Commands::Detokenize(args) => run_detokenize(args),
        Commands::Info(args) => run_info(args),
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    use log::LevelFilter;

    let level = if quiet > 0 {
        match quiet {
            0 => LevelFilter::Info,
            1 => LevelFilter::Warn,
            _ => LevelFilter::Error,
        }
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    builder.filter_level(level);
    let _ = builder.try_init();
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

fn run_tokenize(args: TokenizeArgs) -> Result<()> {
    let mut dict = TokenDictionary::load(&args.token_file)
        .with_context(|| format!("failed to load {}", args.token_file.display()))?;
    let loaded_tokens = dict.len();

    let tokenizer =
        RecordTokenizer::with_classifier(TimestampClassifier::new(args.year_prefix.as_str()));
    let batch = if args.inputs.is_empty() {
        tokenizer
            .tokenize_reader(io::stdin().lock(), &mut dict)
            .context("failed to read records from stdin")?
    } else {
        let ingest = IngestConfig {
            recursive: !args.no_recursive,
            follow_symlinks: args.follow_symlinks,
        };
        tokenizer
            .tokenize_paths(&args.inputs, &ingest, &mut dict)
            .context("failed to tokenize inputs")?
    };

    let mut out = open_output(args.output.as_deref())?;
    for vector in &batch.vectors {
        serde_json::to_writer(&mut out, vector)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    dict.save(&args.token_file)
        .with_context(|| format!("failed to save {}", args.token_file.display()))?;

    info!(
        "tokenized {} records ({} skipped); dictionary grew {} -> {} entries",
        batch.vectors.len(),
        batch.skipped.len(),
        loaded_tokens,
        dict.len()
    );
    let histogram: Vec<String> = batch
        .length_histogram
        .iter()
        .map(|(len, count)| format!("{len}:{count}"))
        .collect();
    info!("vector length histogram: {}", histogram.join(" "));

    Ok(())
}

#[derive(Serialize)]
struct RuleReport<'a> {
    id: usize,
    template: &'a [Token],
    diff_positions: &'a [usize],
    value_sets: &'a BTreeMap<usize, Vec<Token>>,
    match_count: usize,
    matched_vectors: &'a [TokenVector],
}

impl<'a> RuleReport<'a> {
    fn from_rule(rule: &'a Rule) -> Self {
        Self {
            id: rule.id,
            template: &rule.template,
            diff_positions: &rule.diff_positions,
            value_sets: &rule.value_sets,
            match_count: rule.match_count(),
            matched_vectors: &rule.matched_vectors,
        }
    }
}

#[derive(Serialize)]
struct MiningReport<'a> {
    target_distance: usize,
    input_vectors: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    vector_length: Option<usize>,
    stop_reason: StopReason,
    iterations: usize,
    rules: Vec<RuleReport<'a>>,
    leftovers: &'a [TokenVector],
}

fn run_mine(args: MineArgs) -> Result<()> {
    let vectors = if args.inputs.is_empty() {
        read_vectors(io::stdin().lock()).context("failed to read vectors from stdin")?
    } else {
        load_vectors(&args.inputs).context("failed to load vector inputs")?
    };
    let input_count = vectors.len();
    let vector_length = vectors.first().map(Vec::len);

    let cfg = MinerConfig::builder()
        .target_distance(args.distance)
        .max_iterations(args.max_iterations)
        .show_progress(!args.no_progress)
        .build()?;

    let spinner = if args.no_progress {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner} mining templates... {elapsed}")
            .expect("static template is valid")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(80));
        Some(pb)
    };

    let miner = TemplateMiner::new(cfg);
    let outcome = miner.mine(vectors).context("mining failed")?;
    if let Some(pb) = spinner {
        pb.finish_with_message("mining complete");
    }

    let report = MiningReport {
        target_distance: args.distance,
        input_vectors: input_count,
        vector_length,
        stop_reason: outcome.metrics.stop_reason,
        iterations: outcome.metrics.iterations.len(),
        rules: outcome.rules.iter().map(RuleReport::from_rule).collect(),
        leftovers: &outcome.leftovers,
    };

    let mut out = open_output(args.output.as_deref())?;
    if args.pretty {
        serde_json::to_writer_pretty(&mut out, &report)?;
    } else {
        serde_json::to_writer(&mut out, &report)?;
    }
    out.write_all(b"\n")?;
    out.flush()?;

    info!(
        "mined {} rules covering {} of {} vectors in {:.2?}",
        outcome.rules.len(),
        input_count - outcome.leftovers.len(),
        input_count,
        outcome.metrics.total_duration
    );

    Ok(())
}

fn run_detokenize(args: DetokenizeArgs) -> Result<()> {
    let dict = TokenDictionary::load_required(&args.token_file)
        .with_context(|| format!("failed to load {}", args.token_file.display()))?;

    let vectors = if args.inputs.is_empty() {
        read_vectors(io::stdin().lock()).context("failed to read vectors from stdin")?
    } else {
        load_vectors(&args.inputs).context("failed to load vector inputs")?
    };

    let detokenizer = Detokenizer::new(&dict);
    let mut out = open_output(args.output.as_deref())?;
    for (index, vector) in vectors.iter().enumerate() {
        let record = detokenizer
            .detokenize(vector)
            .with_context(|| format!("failed to detokenize vector {index}"))?;
        serde_json::to_writer(&mut out, &record_to_json(&record))?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    info!("reconstructed {} records", vectors.len());
    Ok(())
}

fn run_info(args: InfoArgs) -> Result<()> {
    let dict = TokenDictionary::load_required(&args.token_file)
        .with_context(|| format!("failed to load {}", args.token_file.display()))?;

    let summary = json!({
        "path": args.token_file.display().to_string(),
        "entries": dict.len(),
        "next_token": dict.next_token(),
        "token_base": TOKEN_BASE,
    });

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Dictionary : {}", args.token_file.display());
        println!("Entries    : {}", dict.len());
        println!("Next token : {}", dict.next_token());
        println!("Token base : {TOKEN_BASE}");
    }

    Ok(())
}
