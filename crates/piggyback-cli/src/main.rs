//! Piggyback CLI
//!
//! Loads CSV tables, runs one query and prints the statistics gathered
//! while it executed.

use clap::Parser;
use piggyback_common::{CliConfig, ReportFormat};
use piggyback_executor::ExecutionEngine;
use piggyback_network::ReportCodec;
use piggyback_stats::{CollectingSink, PiggybackSession, StatisticsReport};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "piggyback")]
#[command(version = "0.1.0")]
#[command(about = "Column statistics and functional dependencies computed while a query runs")]
struct Args {
    /// Load CSV files: table_name=path pairs, e.g. --load-csv people=/path/to/people.csv
    #[arg(long, value_parser = parse_csv_pair)]
    load_csv: Vec<(String, PathBuf)>,

    /// Query to execute
    #[arg(long)]
    sql: String,

    /// Config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Report format, overriding the config file
    #[arg(long, value_enum)]
    format: Option<ReportFormat>,

    /// Skip functional dependency discovery
    #[arg(long)]
    no_fd: bool,

    /// Do not print result rows
    #[arg(long)]
    quiet: bool,
}

fn parse_csv_pair(s: &str) -> Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("Expected format: table_name=path, got: {s}")),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CliConfig::load_from_file(path)?,
        None => CliConfig::default(),
    };
    if let Some(format) = args.format {
        config.report_format = format;
    }
    if args.no_fd {
        config.stats = config.stats.without_fd_discovery();
    }
    if args.quiet {
        config.print_rows = false;
    }
    config.stats.validate()?;

    let engine = ExecutionEngine::default();
    for (table_name, path) in &args.load_csv {
        engine.register_csv(table_name, path)?;
    }
    let tables = engine.catalog().tables();
    if !tables.is_empty() {
        tracing::info!("Registered tables: {}", tables.join(", "));
    }

    let sink = CollectingSink::new();
    let mut session = PiggybackSession::new(config.stats.clone(), Box::new(sink.clone()));
    let result = engine.execute_sql(&args.sql, &mut session)?;

    if config.print_rows {
        println!("{}", result.columns.join("\t"));
        for row in &result.rows {
            println!("{}", row);
        }
        println!("({} rows)", result.num_rows());
    }

    match sink.last() {
        Some(report) => print_report(&report, config.report_format)?,
        None => tracing::warn!("No statistics were produced for this query"),
    }
    Ok(())
}

fn print_report(report: &StatisticsReport, format: ReportFormat) -> anyhow::Result<()> {
    match format {
        ReportFormat::Text => print!("{}", report.to_text()),
        ReportFormat::Json => println!("{}", report.to_json()?),
        ReportFormat::Wire => {
            let bytes = ReportCodec::encode_to_vec(report)?;
            for chunk in bytes.chunks(16) {
                let line: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
                println!("{}", line.join(" "));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_csv_pair() {
        let (name, path) = parse_csv_pair("people=/tmp/a=b.csv").unwrap();
        assert_eq!(name, "people");
        assert_eq!(path, PathBuf::from("/tmp/a=b.csv"));
        assert!(parse_csv_pair("people").is_err());
        assert!(parse_csv_pair("=x.csv").is_err());
    }

    #[test]
    fn test_args() {
        let args = Args::parse_from([
            "piggyback",
            "--load-csv",
            "t=t.csv",
            "--sql",
            "SELECT * FROM t",
            "--format",
            "json",
            "--no-fd",
        ]);
        assert_eq!(args.load_csv.len(), 1);
        assert_eq!(args.format, Some(ReportFormat::Json));
        assert!(args.no_fd);
        assert!(!args.quiet);
    }
}
