//! Claims Reserving CLI
//!
//! Builds a development triangle from the claim extracts, estimates factors
//! and prints the ultimate loss table.

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::Parser;
use claims_reserving::claims::loader::DEFAULT_DATA_PATH;
use claims_reserving::triangle::Cell;
use claims_reserving::{
    MethodSelector, Periodicity, ReservingConfig, ReservingReport, ReservingRunner, TriangleType,
    ValueType,
};
use std::path::PathBuf;

/// Loss reserving from claim and exposure extracts
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding siniestros.txt and expuestos.txt
    #[arg(long, default_value = DEFAULT_DATA_PATH)]
    data_dir: PathBuf,

    /// JSON request file; flags below override its fields
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    periodicity: Option<Periodicity>,

    #[arg(long, value_enum)]
    triangle_type: Option<TriangleType>,

    #[arg(long, value_enum)]
    value_type: Option<ValueType>,

    #[arg(long, value_enum)]
    method: Option<MethodSelector>,

    /// Line of business filter
    #[arg(long)]
    line: Option<String>,

    #[arg(long)]
    channel: Option<String>,

    #[arg(long)]
    coverage: Option<String>,

    #[arg(long)]
    reserve_group: Option<String>,

    /// Earliest occurrence date to include (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Latest occurrence date to include (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Write the tables as delimited files into this directory
    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Date stamped into export file names (defaults to today)
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Print the whole report as JSON instead of tables
    #[arg(long)]
    json: bool,

    /// List the filter values available for the chosen line/channel/coverage
    #[arg(long)]
    list_options: bool,
}

impl Cli {
    fn reserving_config(&self) -> anyhow::Result<ReservingConfig> {
        let mut config = match &self.config {
            Some(path) => ReservingConfig::from_json_path(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => ReservingConfig::default(),
        };

        if let Some(p) = self.periodicity {
            config.periodicity = p;
        }
        if let Some(t) = self.triangle_type {
            config.triangle_type = t;
        }
        if let Some(v) = self.value_type {
            config.value_type = v;
        }
        if let Some(m) = self.method {
            config.method = m;
        }
        for (target, flag) in [
            (&mut config.filters.line, &self.line),
            (&mut config.filters.channel, &self.channel),
            (&mut config.filters.coverage, &self.coverage),
            (&mut config.filters.reserve_group, &self.reserve_group),
        ] {
            if flag.is_some() {
                *target = flag.clone();
            }
        }
        if self.from.is_some() {
            config.date_range.start = self.from;
        }
        if self.to.is_some() {
            config.date_range.end = self.to;
        }

        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    if !cli.delimiter.is_ascii() {
        bail!("delimiter must be a single ASCII character, got {:?}", cli.delimiter);
    }
    let config = cli.reserving_config()?;

    let runner = ReservingRunner::from_data_dir(&cli.data_dir)
        .with_context(|| format!("loading extracts from {}", cli.data_dir.display()))?;

    if cli.list_options {
        let options = runner.filter_options(
            config.filters.line.as_deref(),
            config.filters.channel.as_deref(),
            config.filters.coverage.as_deref(),
        );
        println!("Lines:          {}", options.lines.join(", "));
        println!("Channels:       {}", options.channels.join(", "));
        println!("Coverages:      {}", options.coverages.join(", "));
        println!("Reserve groups: {}", options.reserve_groups.join(", "));
        return Ok(());
    }

    let report = runner.run(&config);

    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        print_report(&runner, &report);
    }

    if let Some(dir) = &cli.output_dir {
        let as_of = cli.as_of.unwrap_or_else(|| Local::now().date_naive());
        let paths = report
            .export_to_dir(dir, cli.delimiter as u8, as_of)
            .with_context(|| format!("exporting to {}", dir.display()))?;
        for path in paths {
            println!("Wrote {}", path.display());
        }
    }

    Ok(())
}

fn fmt_value(value: f64) -> String {
    if value.is_nan() {
        "-".to_string()
    } else {
        format!("{:.2}", value)
    }
}

fn print_report(runner: &ReservingRunner, report: &ReservingReport) {
    let config = &report.config;
    println!("Claims Reserving v{}", env!("CARGO_PKG_VERSION"));
    println!("==========================\n");
    println!("Dataset:  {}", runner.dataset_version());
    if let Some(range) = runner.dataset_range() {
        println!("  Occurrences from {} to registrations up to {}", range.first_occurrence, range.last_registration);
    }
    println!(
        "Request:  {} {} {} triangle, method {}",
        config.periodicity, config.triangle_type, config.value_type, config.method
    );
    println!();

    let metrics = &report.metrics;
    println!("Claims: {}  With payment: {}", metrics.total_claims, metrics.claims_with_payment);
    println!("  Total payments: ${:.0}  Total incurred: ${:.0}", metrics.total_payments, metrics.total_incurred);

    let diagnostics = &report.diagnostics;
    if diagnostics.negative_lags_clamped > 0 {
        println!("  Warning: {} claims registered before occurrence (lag set to 0)", diagnostics.negative_lags_clamped);
    }
    if let Some(reason) = &diagnostics.triangle_failure {
        println!("  Triangle unavailable: {}", reason);
    }
    println!();

    let triangle = &report.triangle;
    if triangle.is_empty() {
        println!("No claims match the request.");
        return;
    }

    println!("Triangle ({} periods x {} lags):", triangle.num_periods(), triangle.num_lags());
    print!("{:>12}", "Period");
    for lag in triangle.lags() {
        print!(" {:>12}", lag);
    }
    println!();
    println!("{}", "-".repeat(13 * (triangle.num_lags() + 1)));
    for (origin, row) in triangle.origins().iter().zip(triangle.rows()) {
        print!("{:>12}", origin.format("%Y-%m-%d").to_string());
        for cell in row {
            match cell {
                Cell::Observed(v) => print!(" {:>12.2}", v),
                Cell::Absent => print!(" {:>12}", ""),
            }
        }
        println!();
    }
    println!();

    println!("Development factors:");
    println!("{:>5} {:>10} {:>10} {:>6} {:>10} {:>10} {:>10}", "Lag", "Average", "Cumul.", "N", "Min", "Max", "StdDev");
    for stats in &report.factors.statistics {
        println!(
            "{:>5} {:>10.4} {:>10.4} {:>6} {:>10} {:>10} {:>10}",
            stats.lag,
            stats.average_factor,
            stats.cumulative_factor,
            stats.count,
            fmt_value(stats.min),
            fmt_value(stats.max),
            fmt_value(stats.std_dev),
        );
    }
    println!();

    println!("Ultimate losses (a-priori ratio {:.4}):", report.ultimate.a_priori_ratio);
    println!(
        "{:>12} {:>22} {:>10} {:>14} {:>14} {:>14} {:>14} {:>8} {:>8}",
        "Period", "Method", "Exposure", "Initial", "Current", "Ultimate", "IBNR", "DevF", "LR"
    );
    println!("{}", "-".repeat(124));
    for row in &report.ultimate.rows {
        println!(
            "{:>12} {:>22} {:>10.0} {:>14} {:>14} {:>14} {:>14} {:>8} {:>8}",
            row.label.to_string(),
            row.method.to_string(),
            row.exposure,
            fmt_value(row.initial_value),
            fmt_value(row.current_value),
            fmt_value(row.ultimate),
            fmt_value(row.ibnr),
            fmt_value(row.development_factor),
            fmt_value(row.loss_ratio),
        );
    }

    if !report.occurrence.is_empty() {
        println!();
        println!("Occurrence summary:");
        println!("{:>12} {:>8} {:>8} {:>14} {:>8}", "Period", "Claims", "Paid", "Payments", "% Paid");
        for summary in &report.occurrence {
            println!(
                "{:>12} {:>8} {:>8} {:>14.2} {:>8.1}",
                summary.period.format("%Y-%m-%d").to_string(),
                summary.total_claims,
                summary.claims_with_payment,
                summary.total_payments,
                summary.percent_paid,
            );
        }
    }

    if !report.development.is_empty() {
        println!();
        println!("Development summary (by registration period):");
        println!("{:>12} {:>8} {:>8} {:>14}", "Period", "Claims", "Paid", "Payments");
        for summary in &report.development {
            println!(
                "{:>12} {:>8} {:>8} {:>14.2}",
                summary.period.format("%Y-%m-%d").to_string(),
                summary.total_claims,
                summary.claims_with_payment,
                summary.total_payments,
            );
        }
    }
}
