//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and initializes logging
//! - runs the acquisition pipeline (network or cached payload)
//! - renders the chart and writes the cleaned CSV
//! - prints the run summary

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, CommonArgs, LocalArgs, RunArgs};
use crate::domain::{PipelineConfig, RawPayload};
use crate::error::AppError;
use crate::plot::StreamflowChart;
use crate::report;

pub mod pipeline;

/// Entry point for the `caudal` binary.
pub fn run() -> Result<(), AppError> {
    // We want bare `caudal` (and `caudal --station X`) to behave like
    // `caudal run ...`. Clap requires a subcommand name, so rewrite argv
    // before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = Cli::parse_from(argv);
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Local(args) => handle_local(args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "caudal=debug,info"
    } else {
        "caudal=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let raw_cache = if args.no_raw_cache {
        None
    } else {
        Some(args.raw_cache.clone())
    };
    let config = pipeline_config(&args.common, raw_cache)?;
    let output = pipeline::run(&config)?;
    write_outputs(&config, &output)
}

fn handle_local(args: LocalArgs) -> Result<(), AppError> {
    let config = pipeline_config(&args.common, None)?;
    let bytes = std::fs::read(&args.input)
        .map_err(|e| AppError::io(format!("failed to read payload '{}'", args.input.display()), e))?;
    info!(path = %args.input.display(), bytes = bytes.len(), "using cached payload");

    let output = pipeline::run_from_payload(&config, &RawPayload::new(bytes, None))?;
    write_outputs(&config, &output)
}

fn pipeline_config(
    args: &CommonArgs,
    raw_cache: Option<std::path::PathBuf>,
) -> Result<PipelineConfig, AppError> {
    if args.start > args.end {
        return Err(AppError::Usage(format!(
            "window start {} is after end {}",
            args.start, args.end
        )));
    }
    Ok(PipelineConfig {
        station_id: args.station.clone(),
        station_name: args.station_name.clone(),
        start: args.start,
        end: args.end,
        date_column: args.date_column.clone(),
        value_column: args.value_column.clone(),
        out_csv: args.out_csv.clone(),
        out_plot: args.out_plot.clone(),
        raw_cache,
        plot_width: args.width,
        plot_height: args.height,
    })
}

/// Render the chart, write the cleaned CSV, print the summary.
///
/// The chart is rendered before the CSV; a run that cannot plot leaves no
/// partial output pair behind.
fn write_outputs(config: &PipelineConfig, output: &pipeline::RunOutput) -> Result<(), AppError> {
    let (y0, y1) = output
        .year_range
        .unwrap_or((chrono::Datelike::year(&config.start), chrono::Datelike::year(&config.end)));
    let title = format!("{} Station Streamflow ({y0}-{y1})", config.station_name);

    let stats_lines = output
        .stats
        .as_ref()
        .map(report::stats_box_lines)
        .unwrap_or_default();

    crate::plot::render_png(
        &StreamflowChart {
            series: &output.series,
            title,
            stats_lines,
            width: config.plot_width,
            height: config.plot_height,
        },
        &config.out_plot,
    )?;
    crate::io::write_frame_csv(&config.out_csv, &output.frame)?;

    print!(
        "{}",
        report::format_run_summary(
            config,
            &output.roles,
            &output.summary,
            output.stats.as_ref(),
            output.year_range,
        )
    );
    Ok(())
}

/// Rewrite argv so `caudal` defaults to `caudal run`.
///
/// Rules:
/// - `caudal`                       -> `caudal run`
/// - `caudal --station X ...`       -> `caudal run --station X ...`
/// - `caudal --help/--version/-h`   -> unchanged (top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("run".to_string());
        return argv;
    };

    let is_top_level_help_or_version =
        matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "run" | "local");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "run flags".
    if arg1.starts_with('-') {
        argv.insert(1, "run".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_run() {
        assert_eq!(rewrite_args(args(&["caudal"])), args(&["caudal", "run"]));
        assert_eq!(
            rewrite_args(args(&["caudal", "--station", "123"])),
            args(&["caudal", "run", "--station", "123"])
        );
    }

    #[test]
    fn subcommands_and_help_pass_through() {
        assert_eq!(
            rewrite_args(args(&["caudal", "local", "--input", "x"])),
            args(&["caudal", "local", "--input", "x"])
        );
        assert_eq!(rewrite_args(args(&["caudal", "--help"])), args(&["caudal", "--help"]));
    }

    #[test]
    fn inverted_window_is_a_usage_error() {
        let mut common = CommonArgs {
            station: "1".into(),
            station_name: "X".into(),
            start: chrono::NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            end: chrono::NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            date_column: None,
            value_column: None,
            out_csv: "a.csv".into(),
            out_plot: "a.png".into(),
            width: 100,
            height: 100,
        };
        let err = pipeline_config(&common, None).unwrap_err();
        assert!(matches!(err, AppError::Usage(_)));

        common.end = chrono::NaiveDate::from_ymd_opt(2001, 1, 1).unwrap();
        assert!(pipeline_config(&common, None).is_ok());
    }
}
