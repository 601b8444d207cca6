//! ip4set: CLI tool for checking, dumping and querying IPv4 set data files.

use clap::{Parser, Subcommand};
use ip4set::{addr, Error, Ip4Set, LoadStats, Loader, Result, SetConfig};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "ip4set")]
#[command(author = "Kaitu.io")]
#[command(version = "0.1.0")]
#[command(about = "Check, dump and query DNSBL IPv4 set data files", long_about = None)]
struct Cli {
    /// YAML set configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load data files and report statistics
    Check {
        /// Data files, loaded as one set (.gz is decompressed)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load data files and write the set in re-loadable form
    Dump {
        /// Data files, loaded as one set (.gz is decompressed)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Look up addresses
    Query {
        /// Data files, loaded as one set (.gz is decompressed)
        #[arg(short, long, required = true, num_args = 1..)]
        data: Vec<PathBuf>,

        /// Addresses to look up
        #[arg(required = true)]
        ips: Vec<String>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => SetConfig::from_yaml_file(path)?,
        None => SetConfig::default(),
    };

    match cli.command {
        Commands::Check { files, json } => check(config, &files, json),
        Commands::Dump { files, output } => dump(config, &files, output.as_deref()),
        Commands::Query { data, ips } => query(config, &data, &ips),
    }
}

fn load(config: SetConfig, files: &[PathBuf]) -> Result<(Ip4Set, LoadStats)> {
    let mut loader = Loader::new(config);
    loader.load_files(files)
}

fn check(config: SetConfig, files: &[PathBuf], json: bool) -> Result<()> {
    let (set, stats) = load(config, files)?;

    if json {
        let out = serde_json::to_string_pretty(&stats).map_err(|e| Error::Config(e.to_string()))?;
        println!("{}", out);
        return Ok(());
    }

    println!("Set: {}", stats.name);
    println!("  Sources: {}", stats.sources);
    println!("  Lines: {}", stats.lines);
    println!("  Accepted: {}", stats.accepted);
    println!("  Ignored directives: {}", stats.ignored);
    println!("  Skipped (malformed): {}", stats.skipped);
    println!("  Unique addresses: {}", stats.count);
    println!("  Default record: {}", set.default_record());
    Ok(())
}

fn dump(config: SetConfig, files: &[PathBuf], output: Option<&Path>) -> Result<()> {
    let (set, _) = load(config, files)?;

    match output {
        Some(path) => {
            let mut out = BufWriter::new(File::create(path)?);
            set.dump(&mut out)?;
            out.flush()?;
            log::info!("Wrote {} addresses to {:?}", set.len(), path);
        }
        None => {
            let stdout = io::stdout();
            let mut out = BufWriter::new(stdout.lock());
            set.dump(&mut out)?;
            out.flush()?;
        }
    }
    Ok(())
}

fn query(config: SetConfig, files: &[PathBuf], ips: &[String]) -> Result<()> {
    let keys = ips
        .iter()
        .map(|ip| addr::parse(ip).ok_or_else(|| Error::InvalidAddress(ip.clone())))
        .collect::<Result<Vec<_>>>()?;

    let (set, _) = load(config, files)?;

    for key in keys {
        let name = addr::format(key);
        match set.query(key, true) {
            Some(answer) => match answer.txt() {
                Some(txt) => println!("{}\tlisted\tA {}\tTXT \"{}\"", name, answer.a(), txt),
                None => println!("{}\tlisted\tA {}", name, answer.a()),
            },
            None => println!("{}\tnot listed", name),
        }
    }
    Ok(())
}
