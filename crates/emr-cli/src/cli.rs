//! CLI argument definitions for `emr-reports`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "emr-reports",
    version,
    about = "EMR reports - validate cohort data and aggregate disaggregated reports",
    long_about = "Validate cohort reports and build disaggregated clinical reports.\n\n\
                  Reports are fetched from the EMR API or read from saved responses, \n\
                  rolled up by gender and age group, and printed as tables, JSON or CSV."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow patient identifiers in log output.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check a cohort report against the sum-consistency rules.
    Validate(ValidateArgs),

    /// Aggregate a saved report response.
    Aggregate(AggregateArgs),

    /// Fetch a report from the EMR API and aggregate it.
    Fetch(FetchArgs),

    /// List recent reporting quarters.
    Quarters(QuartersArgs),

    /// Show dashboard statistics, optionally refreshing them from the API.
    Dashboard(DashboardArgs),

    /// List the supported report families.
    Families,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Cohort report as a JSON object of indicator counts.
    #[arg(
        value_name = "COHORT_FILE",
        required_unless_present = "fetch",
        conflicts_with = "fetch"
    )]
    pub cohort_file: Option<PathBuf>,

    /// Fetch the cohort report from the EMR API instead of reading a file.
    #[arg(long = "fetch")]
    pub fetch: bool,

    #[command(flatten)]
    pub report: ReportArgs,

    /// Cohort quarter to fetch (default: the quarter of the reporting date,
    /// or the --start-date/--end-date period when given).
    #[arg(long = "quarter", value_name = "QUARTER", requires = "fetch")]
    pub quarter: Option<String>,

    /// Ask the EMR to regenerate the cohort report.
    #[arg(long = "regenerate", requires = "fetch")]
    pub regenerate: bool,

    /// Results of the remote validation service to list alongside.
    #[arg(long = "remote-results", value_name = "FILE")]
    pub remote_results: Option<PathBuf>,

    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: FormatArg,
}

#[derive(Args)]
pub struct AggregateArgs {
    /// Report family of the saved response (e.g. tx_pvls, tb_prev, tpt).
    #[arg(value_name = "FAMILY")]
    pub family: String,

    /// Saved JSON response of the report endpoint.
    #[arg(value_name = "RESPONSE_FILE")]
    pub response_file: PathBuf,

    /// Saved maternal status response; adds FP, FNP and FBf rows.
    #[arg(long = "maternal-status", value_name = "FILE")]
    pub maternal_status: Option<PathBuf>,

    #[command(flatten)]
    pub survival: SurvivalArgs,

    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: FormatArg,
}

#[derive(Args)]
pub struct FetchArgs {
    /// Report family to fetch (e.g. tx_pvls, tb_prev, tpt).
    #[arg(value_name = "FAMILY")]
    pub family: String,

    #[command(flatten)]
    pub report: ReportArgs,

    /// Look up maternal status and add FP, FNP and FBf rows.
    #[arg(long = "maternal")]
    pub maternal: bool,

    /// Cohort quarter for survival analysis and the disaggregated cohort
    /// (default: the reporting quarter).
    #[arg(long = "quarter", value_name = "QUARTER")]
    pub quarter: Option<String>,

    /// Ask the EMR to regenerate survival analysis data.
    #[arg(long = "regenerate")]
    pub regenerate: bool,

    /// Ask the EMR to rebuild TX_TB or disaggregated cohort outcomes.
    #[arg(long = "rebuild-outcome")]
    pub rebuild_outcome: bool,

    /// Age group of the disaggregated cohort.
    #[arg(long = "age-group", value_name = "GROUP", default_value = "<1 year")]
    pub age_group: String,

    /// Build the disaggregated cohort table before fetching it.
    #[arg(long = "initialize")]
    pub initialize: bool,

    #[command(flatten)]
    pub survival: SurvivalArgs,

    #[arg(long = "format", value_enum, default_value = "table")]
    pub format: FormatArg,
}

/// Connection and reporting-period options for API commands.
#[derive(Args)]
pub struct ReportArgs {
    /// API config file (default: the platform config directory).
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Facility (location) id reports are requested for.
    #[arg(long = "facility", value_name = "ID")]
    pub facility: Option<i64>,

    /// Program id for program reports.
    #[arg(long = "program", value_name = "ID")]
    pub program: Option<u32>,

    /// Reporting date (default: today).
    #[arg(long = "date", value_name = "DATE")]
    pub date: Option<String>,

    /// Start of the reporting period.
    #[arg(long = "start-date", value_name = "DATE", requires = "end_date")]
    pub start_date: Option<String>,

    /// End of the reporting period.
    #[arg(long = "end-date", value_name = "DATE", requires = "start_date")]
    pub end_date: Option<String>,
}

#[derive(Args)]
pub struct SurvivalArgs {
    /// Survival analysis age group (General, Children, Women).
    #[arg(long = "survival-group", value_name = "GROUP", default_value = "General")]
    pub survival_group: String,
}

#[derive(Args)]
pub struct QuartersArgs {
    /// Number of quarters to list.
    #[arg(long = "count", default_value_t = 5)]
    pub count: usize,

    /// List quarters up to the one containing this date (default: today).
    #[arg(long = "from", value_name = "DATE")]
    pub from: Option<String>,
}

#[derive(Args)]
pub struct DashboardArgs {
    #[command(flatten)]
    pub report: ReportArgs,

    /// Fetch fresh statistics and update the cache.
    #[arg(long = "refresh")]
    pub refresh: bool,

    /// Cache file (default: the platform data directory).
    #[arg(long = "cache", value_name = "PATH")]
    pub cache: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Table,
    Json,
    Csv,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
