use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use bio::io::fasta;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use hmmlink::common::{
    open_output, write_query_rows, DbKind, HitFilter, QueryKind, ScanMode,
};
use hmmlink::config::DaemonEndpoint;
use hmmlink::refine::{refine_hit, RefineConfig, RefineJob};
use hmmlink::search::{iter_hits, SearchConfig};

#[derive(Parser)]
#[command(name = "hmmlink")]
#[command(version = "0.1.0")]
#[command(about = "Client-side homology search against HMMER services", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream sequence queries through a running search daemon
    Scan(ScanArgs),

    /// Run the batch scanner over a query file and parse its report
    Batch(BatchArgs),

    /// Pick the best group member per sequence via secondary search
    Refine(RefineArgs),
}

#[derive(Args, Debug)]
struct ScanArgs {
    #[arg(short, long)]
    query: PathBuf,
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    #[arg(long, default_value_t = 51371)]
    port: u16,
    /// Database flavor the daemon serves: hmmdb or seqdb
    #[arg(long, default_value = "hmmdb")]
    dbtype: String,
    /// Keep hits with E-value at or below this
    #[arg(long)]
    evalue: Option<f64>,
    /// Keep hits with score at or above this. Without it the combined
    /// filter accepts nothing.
    #[arg(long)]
    score: Option<f64>,
    /// Maximum distinct targets per query (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_hits: usize,
    /// Skip queries longer than this many residues (0 = no limit)
    #[arg(long, default_value_t = 0)]
    max_seq_len: usize,
    /// Fixed effective database size for E-value conversion
    #[arg(long)]
    fixed_z: Option<f64>,
    /// Worker count advertised in the request header
    #[arg(short = 'n', long, default_value_t = 1)]
    threads: usize,
    #[arg(short, long)]
    out: Option<PathBuf>,
    #[arg(long, short = 'v', default_value_t = false)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct BatchArgs {
    #[arg(short, long)]
    query: PathBuf,
    /// Profile database to scan against
    #[arg(short, long)]
    database: PathBuf,
    /// Worker threads for the batch tool (0 = all cores)
    #[arg(short = 'n', long, default_value_t = 0)]
    threads: usize,
    /// Keep hits with E-value at or below this
    #[arg(long)]
    evalue: Option<f64>,
    /// Keep hits with score at or above this. Without it the combined
    /// filter accepts nothing.
    #[arg(long)]
    score: Option<f64>,
    /// Maximum distinct targets per query (0 = unlimited)
    #[arg(long, default_value_t = 0)]
    max_hits: usize,
    #[arg(short, long)]
    out: Option<PathBuf>,
    #[arg(long, short = 'v', default_value_t = false)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct RefineArgs {
    #[arg(short, long)]
    query: PathBuf,
    /// Candidate-group sequence database
    #[arg(short, long)]
    group_db: PathBuf,
    /// Significance cutoff for reporting and inclusion
    #[arg(long, default_value_t = 1e-3)]
    cutoff: f64,
    /// Worker pool size (0 = all cores)
    #[arg(short = 'n', long, default_value_t = 0)]
    threads: usize,
    #[arg(short, long)]
    out: Option<PathBuf>,
    #[arg(long, short = 'v', default_value_t = false)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Scan(args) => run_scan(args),
        Commands::Batch(args) => run_batch(args),
        Commands::Refine(args) => run_refine(args),
    }
}

fn parse_dbtype(raw: &str) -> Result<DbKind> {
    match raw {
        "hmmdb" => Ok(DbKind::HmmDb),
        "seqdb" => Ok(DbKind::SeqDb),
        other => bail!("unsupported dbtype: {} (expected hmmdb or seqdb)", other),
    }
}

fn run_scan(args: ScanArgs) -> Result<()> {
    let db_kind = parse_dbtype(&args.dbtype)?;
    let mut config = SearchConfig::new(
        &args.query,
        QueryKind::Sequence,
        db_kind,
        ScanMode::Daemon,
    );
    config.filter = HitFilter {
        evalue_thr: args.evalue,
        score_thr: args.score,
    };
    config.max_hits = (args.max_hits > 0).then_some(args.max_hits);
    config.max_seq_len = (args.max_seq_len > 0).then_some(args.max_seq_len);
    config.fixed_z = args.fixed_z;
    config.threads = args.threads;
    config.endpoint = DaemonEndpoint::new(args.host.clone(), args.port);

    if args.verbose {
        eprintln!(
            "[INFO] scanning {} against {}:{} ({})",
            args.query.display(),
            args.host,
            args.port,
            args.dbtype
        );
    }

    drive_stream(config, args.out.as_ref(), args.verbose)
}

fn run_batch(args: BatchArgs) -> Result<()> {
    let mut config = SearchConfig::new(
        &args.query,
        QueryKind::Sequence,
        DbKind::HmmDb,
        ScanMode::Disk,
    );
    config.filter = HitFilter {
        evalue_thr: args.evalue,
        score_thr: args.score,
    };
    config.max_hits = (args.max_hits > 0).then_some(args.max_hits);
    config.threads = args.threads;
    config.database = Some(args.database.clone());

    if args.verbose {
        eprintln!(
            "[INFO] batch scan of {} against {}",
            args.query.display(),
            args.database.display()
        );
    }

    drive_stream(config, args.out.as_ref(), args.verbose)
}

/// Pull the stream to completion, writing rows as they arrive. A failed
/// query is reported and skipped; it does not end the run.
fn drive_stream(config: SearchConfig, out: Option<&PathBuf>, verbose: bool) -> Result<()> {
    let stream = iter_hits(config)?;
    let mut writer = open_output(out)?;
    let mut done = 0usize;
    let mut failed = 0usize;
    for result in stream {
        match result {
            Ok(query) => {
                done += 1;
                if verbose {
                    eprintln!(
                        "[INFO] {}: {} hits ({:.2}s)",
                        query.name,
                        query.hits.len(),
                        query.elapsed
                    );
                }
                write_query_rows(&mut writer, &query)?;
            }
            Err(e) => {
                failed += 1;
                eprintln!("[WARN] query failed: {}", e);
            }
        }
    }
    writer.flush()?;
    if verbose {
        eprintln!("[INFO] {} queries done, {} failed", done, failed);
    }
    Ok(())
}

fn run_refine(args: RefineArgs) -> Result<()> {
    let num_threads = if args.threads == 0 {
        num_cpus::get()
    } else {
        args.threads
    };
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .context("Failed to build thread pool")?;

    let file = File::open(&args.query)
        .with_context(|| format!("cannot open query file {}", args.query.display()))?;
    let jobs: Vec<RefineJob> = fasta::Reader::new(file)
        .records()
        .filter_map(|r| r.ok())
        .map(|r| RefineJob {
            name: r.id().to_string(),
            seq: String::from_utf8_lossy(r.seq()).into_owned(),
            group_db: args.group_db.clone(),
        })
        .collect();

    let cfg = RefineConfig {
        cutoff: args.cutoff,
        ..Default::default()
    };

    let bar = if args.verbose {
        let bar = ProgressBar::new(jobs.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
                .unwrap(),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    let results: Vec<_> = jobs
        .par_iter()
        .map(|job| {
            let best = refine_hit(&job.name, &job.seq, &job.group_db, &cfg);
            bar.inc(1);
            (job.name.clone(), best)
        })
        .collect();
    bar.finish_and_clear();

    let mut writer = open_output(args.out.as_ref())?;
    let mut failed = 0usize;
    for (name, best) in results {
        match best {
            Ok(hit) => {
                writeln!(writer, "{}\t{}\t{}\t{}", name, hit.name, hit.evalue, hit.score)?;
            }
            Err(e) => {
                failed += 1;
                eprintln!("[WARN] {}: {}", name, e);
            }
        }
    }
    writer.flush()?;
    if args.verbose {
        eprintln!("[INFO] {} refined, {} failed", jobs.len() - failed, failed);
    }
    Ok(())
}
