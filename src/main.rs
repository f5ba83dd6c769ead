use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;

use flbwt::config::DEFAULT_ARENA_INCREMENT;
use flbwt::io::bwtfile;
use flbwt::{ReportMeta, TransformOpt, TransformReport};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "flbwt", author, version, about = "Linear-time Burrows-Wheeler Transform", arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compute the BWT of one or more files
    Transform {
        /// Input files
        #[arg(required = true)]
        inputs: Vec<String>,
        /// Output path (only with a single input; default <INPUT>.bwt)
        #[arg(short, long)]
        output: Option<String>,
        /// Number of files transformed concurrently
        #[arg(short = 't', long = "threads", default_value_t = 1)]
        threads: usize,
        /// Buckets of the substring hash table (default: max(67777, n/4))
        #[arg(long = "hash-size")]
        hash_size: Option<usize>,
        /// Arena growth step in bytes
        #[arg(long = "arena-step", default_value_t = DEFAULT_ARENA_INCREMENT)]
        arena_step: usize,
        /// Also write <OUTPUT>.report
        #[arg(long)]
        report: bool,
    },
    /// Restore the original bytes from a .bwt file
    Inverse {
        /// BWT file
        input: String,
        /// Output path (default <INPUT>.out)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Print a stored transform report
    Report {
        /// Report file
        path: String,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Transform { inputs, output, threads, hash_size, arena_step, report } => {
            let opt = TransformOpt { hash_table_size: hash_size, arena_increment: arena_step };
            run_transform(&inputs, output.as_deref(), threads, &opt, report)
        }
        Commands::Inverse { input, output } => run_inverse(&input, output.as_deref()),
        Commands::Report { path } => run_report(&path),
    }
}

struct Summary {
    input: String,
    output: String,
    report: TransformReport,
}

fn run_transform(inputs: &[String], output: Option<&str>, threads: usize, opt: &TransformOpt, report: bool) -> Result<()> {
    if output.is_some() && inputs.len() > 1 {
        anyhow::bail!("--output can only be used with a single input");
    }

    let results: Vec<Result<Summary>> = if inputs.len() == 1 {
        vec![transform_file(&inputs[0], output, opt, report)]
    } else {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .build()
            .map_err(|e| anyhow!("cannot start worker pool: {}", e))?;
        pool.install(|| inputs.par_iter().map(|p| transform_file(p, None, opt, report)).collect())
    };

    for res in results {
        let s = res?;
        println!("input: {}", s.input);
        println!("length: {}", s.report.input_len);
        println!("alphabet: {}", s.report.alphabet_size);
        println!("lms substrings: {} ({} unique)", s.report.num_substrings, s.report.num_unique);
        println!("sais depth: {}", s.report.sais_depth);
        println!("last: {}", s.report.last);
        println!("BWT saved: {}", s.output);
    }
    Ok(())
}

fn transform_file(input: &str, output: Option<&str>, opt: &TransformOpt, write_report: bool) -> Result<Summary> {
    let data = std::fs::read(input).map_err(|e| anyhow!("cannot read input '{}': {}", input, e))?;
    if data.is_empty() {
        anyhow::bail!("input '{}' is empty", input);
    }

    let mut out = flbwt::transform_with_opt(&data, opt).map_err(|e| anyhow!("transform of '{}' failed: {}", input, e))?;
    drop(data);

    let out_path = output.map_or_else(|| format!("{}.bwt", input), str::to_string);
    bwtfile::save_to_file(&out_path, &out.bwt, out.last)
        .map_err(|e| anyhow!("cannot write BWT to '{}': {}", out_path, e))?;

    if write_report {
        out.report.set_meta(ReportMeta {
            input_file: Some(input.to_string()),
            build_args: Some(std::env::args().collect::<Vec<_>>().join(" ")),
            build_timestamp: Some(chrono::Utc::now().to_rfc3339()),
        });
        let report_path = format!("{}.report", out_path);
        out.report
            .save_to_file(&report_path)
            .map_err(|e| anyhow!("cannot write report to '{}': {}", report_path, e))?;
    }

    Ok(Summary { input: input.to_string(), output: out_path, report: out.report })
}

fn run_inverse(input: &str, output: Option<&str>) -> Result<()> {
    let (bwt, last) = bwtfile::load_from_file(input).map_err(|e| anyhow!("cannot read BWT file '{}': {}", input, e))?;
    let text = flbwt::inverse(&bwt, last).map_err(|e| anyhow!("cannot invert '{}': {}", input, e))?;
    let out_path = output.map_or_else(|| format!("{}.out", input), str::to_string);
    std::fs::write(&out_path, &text).map_err(|e| anyhow!("cannot write '{}': {}", out_path, e))?;
    println!("length: {}", text.len());
    println!("restored: {}", out_path);
    Ok(())
}

fn run_report(path: &str) -> Result<()> {
    let r = TransformReport::load_from_file(path).map_err(|e| anyhow!("cannot read report '{}': {}", path, e))?;
    println!("input_file: {}", r.meta.input_file.as_deref().unwrap_or("-"));
    println!("built: {}", r.meta.build_timestamp.as_deref().unwrap_or("-"));
    println!("command: {}", r.meta.build_args.as_deref().unwrap_or("-"));
    println!("length: {}", r.input_len);
    println!("alphabet: {}", r.alphabet_size);
    println!("lms substrings: {} ({} unique)", r.num_substrings, r.num_unique);
    println!("sais depth: {}", r.sais_depth);
    println!("peak tracked bytes: {}", r.peak_bytes);
    match r.opt.hash_table_size {
        Some(size) => println!("hash table size: {}", size),
        None => println!("hash table size: auto ({})", r.opt.table_size_for(r.input_len as usize)),
    }
    println!("arena step: {}", r.opt.arena_increment);
    println!("last: {}", r.last);
    Ok(())
}
