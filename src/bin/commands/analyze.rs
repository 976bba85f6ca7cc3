use anyhow::{anyhow, Result};
use clap::Args;
use iptally::lens::analysis::{AnalysisArgs, AnalysisLens, AnalysisReport, WindowArgs};
use iptally::lens::log::{DiagnosticCallback, LogDiagnostic, LogParser};
use iptally::lens::utils::OutputFormat;
use iptally::IptallyConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::settings::Style;
use tabled::Table;

use crate::Validate;

/// Arguments for an analysis run
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Path to the access log to read
    #[clap(long)]
    pub file_log: Option<PathBuf>,

    /// Path of the file to write the counts to
    #[clap(long)]
    pub file_output: Option<PathBuf>,

    /// First day of the time window, inclusive (dd.MM.yyyy)
    #[clap(long)]
    pub time_start: Option<String>,

    /// Last day of the time window, inclusive (dd.MM.yyyy)
    #[clap(long)]
    pub time_end: Option<String>,

    /// Base IPv4 address of the range to keep
    #[clap(long)]
    pub address_start: Option<String>,

    /// Network mask for --address-start, e.g. 255.255.255.0
    #[clap(long)]
    pub address_mask: Option<String>,

    /// Output file format
    #[clap(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Reject non-contiguous network masks
    #[clap(long)]
    pub strict_mask: bool,

    /// Print a summary table after the run
    #[clap(long)]
    pub summary: bool,
}

impl Validate for AnalyzeArgs {
    fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("--file-log", self.file_log.is_none()),
            ("--file-output", self.file_output.is_none()),
            ("--time-start", self.time_start.is_none()),
            ("--time-end", self.time_end.is_none()),
        ]
        .into_iter()
        .filter_map(|(flag, absent)| absent.then_some(flag))
        .collect();

        if !missing.is_empty() {
            return Err(anyhow!(
                "Invalid command line arguments: missing {}",
                missing.join(", ")
            ));
        }

        if self.address_mask.is_some() && self.address_start.is_none() {
            return Err(iptally::IptallyError::MaskWithoutStart.into());
        }

        Ok(())
    }
}

fn console_sink() -> DiagnosticCallback {
    Arc::new(|diagnostic: LogDiagnostic| eprintln!("{}", diagnostic))
}

fn build_args(args: &AnalyzeArgs, config: &IptallyConfig) -> Result<AnalysisArgs> {
    let (Some(file_log), Some(file_output), Some(time_start), Some(time_end)) = (
        &args.file_log,
        &args.file_output,
        &args.time_start,
        &args.time_end,
    ) else {
        return Err(anyhow!("Invalid command line arguments"));
    };

    let mut window = WindowArgs::new(time_start.as_str(), time_end.as_str())
        .with_date_format(config.window_date_format.as_str())
        .with_strict_mask(args.strict_mask || config.strict_mask);
    window.address_start = args.address_start.clone();
    window.address_mask = args.address_mask.clone();

    let criteria = window.resolve()?;
    let format = args.format.unwrap_or(config.output_format);

    Ok(AnalysisArgs::new(file_log, file_output, criteria).with_format(format))
}

pub fn run(args: AnalyzeArgs, config: &IptallyConfig) -> Result<AnalysisReport> {
    args.validate()?;
    let analysis_args = build_args(&args, config)?;
    tracing::debug!("analysis criteria: {:?}", analysis_args.criteria);

    let parser = LogParser::new().with_datetime_format(config.log_datetime_format.as_str());
    let report = AnalysisLens::with_parser(parser).run(&analysis_args, Some(console_sink()))?;

    println!(
        "Analysis complete. Results written to {}.",
        analysis_args.output_path.display()
    );
    if args.summary {
        println!("{}", Table::new(vec![report.clone()]).with(Style::rounded()));
    }

    Ok(report)
}
