//! csvclean CLI - Clean messy sales CSV exports
//!
//! # Commands
//!
//! ```bash
//! csvclean clean --input raw.csv --output cleaned.csv   # Run the pipeline
//! csvclean inspect raw.csv                              # Show how a file is read
//! csvclean serve                                        # Start HTTP server (port 3000)
//! ```

use clap::{Parser, Subcommand};
use csvclean::{
    clean_file, read_table, resolve_header, summarize, CleanOptions, IngestionError,
    PipelineError, ReadOptions, TableSummary,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "csvclean")]
#[command(about = "Normalize messy sales CSV exports into a canonical table", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean a CSV file and write the canonical table
    Clean {
        /// Input CSV file
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV file
        #[arg(short, long)]
        output: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Print summary statistics of the cleaned table
        #[arg(long)]
        summary: bool,
    },

    /// Show encoding, delimiter and header mapping without cleaning
    Inspect {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "CSVCLEAN_PORT", default_value = "3000")]
        port: u16,

        /// Staging directory for raw and cleaned files
        #[arg(long, env = "CSVCLEAN_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Clean {
            input,
            output,
            delimiter,
            summary,
        } => {
            init_tracing("warn");
            cmd_clean(&input, &output, delimiter, summary)
        }

        Commands::Inspect { input, delimiter } => {
            init_tracing("warn");
            cmd_inspect(&input, delimiter)
        }

        Commands::Serve { port, data_dir } => {
            init_tracing("info");
            csvclean::server::start_server(port, data_dir).await
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(exit_code(e.as_ref()));
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// 2 for a missing input file, 1 for anything else.
fn exit_code(error: &(dyn std::error::Error + 'static)) -> i32 {
    match error.downcast_ref::<PipelineError>() {
        Some(PipelineError::Ingestion(IngestionError::FileNotFound { .. })) => 2,
        _ => match error.downcast_ref::<IngestionError>() {
            Some(IngestionError::FileNotFound { .. }) => 2,
            _ => 1,
        },
    }
}

fn cmd_clean(
    input: &Path,
    output: &Path,
    delimiter: Option<char>,
    summary: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Cleaning: {}", input.display());

    let options = CleanOptions {
        delimiter,
        ..Default::default()
    };
    let report = clean_file(input, output, &options)?;

    eprintln!("   Encoding: {} ({})", report.encoding, report.strategy);
    eprintln!("   Delimiter: '{}'", format_delimiter(report.delimiter));
    if report.skipped_rows > 0 {
        eprintln!("   ⚠️  Skipped malformed rows: {}", report.skipped_rows);
    }
    if report.duplicates_removed > 0 {
        eprintln!("   Duplicates removed: {}", report.duplicates_removed);
    }
    if !report.diagnostics.coercions.is_empty() {
        eprintln!(
            "   ⚠️  Values set to missing: {}",
            report.diagnostics.coercions.len()
        );
    }
    eprintln!("   💾 Saved to: {}", report.output.display());

    println!("Rows: {} | Columns: {}", report.rows, report.columns);

    if summary {
        let table = read_table(output, ReadOptions { delimiter: Some(',') })?;
        let mut table = table.table;
        csvclean::report::infer_numeric(&mut table);
        print_summary(&summarize(&table));
    }

    Ok(())
}

fn cmd_inspect(input: &Path, delimiter: Option<char>) -> Result<(), Box<dyn std::error::Error>> {
    let parsed = read_table(input, ReadOptions { delimiter })?;

    println!("File:      {}", input.display());
    println!("Encoding:  {}", parsed.encoding());
    println!("Strategy:  {}", parsed.strategy);
    println!(
        "Delimiter: '{}'{}",
        format_delimiter(parsed.delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    );
    println!("Rows:      {}", parsed.table.height());
    println!("Skipped:   {}", parsed.skipped_rows);
    println!();
    println!("🗺️  Header mapping:");
    for (idx, raw) in parsed.headers().iter().enumerate() {
        let resolved = resolve_header(raw, idx);
        let marker = if resolved.canonical.is_some() { "" } else { "  (passthrough)" };
        println!("   [{:2}] {:<24} → {}{}", idx + 1, format!("{:?}", raw), resolved.column, marker);
    }

    Ok(())
}

fn print_summary(summary: &TableSummary) {
    println!();
    println!("📊 Summary");
    println!(
        "   Rows: {} | Columns: {} | Missing cells: {}",
        summary.rows, summary.columns, summary.missing_cells
    );

    println!();
    println!("   Missing values:");
    for column in &summary.missing {
        println!(
            "   {:<16} {:>6} {:>7.2}%",
            column.column, column.missing, column.missing_pct
        );
    }

    if !summary.numeric.is_empty() {
        println!();
        println!(
            "   {:<12} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
            "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
        );
        for stats in &summary.numeric {
            let std = stats.std.map(|s| format!("{:.2}", s)).unwrap_or_default();
            println!(
                "   {:<12} {:>6} {:>10.2} {:>10} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2}",
                stats.column, stats.count, stats.mean, std, stats.min, stats.p25, stats.p50, stats.p75, stats.max
            );
        }
    }

    if let Some(rows) = &summary.formula_check {
        println!();
        println!("   Formula check (quantity × unit_price):");
        for row in rows {
            println!(
                "   calc_sales={:<12} sales={:<12} diff={}",
                format_opt(row.calc_sales),
                format_opt(row.sales),
                format_opt(row.sales_diff)
            );
        }
    }
}

fn format_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".to_string())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}
