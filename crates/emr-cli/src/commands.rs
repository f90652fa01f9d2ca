use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use emr_client::{ApiClient, load_config};
use emr_model::{CohortData, MaternalStatus, ReportRow};
use emr_report::dates::{self, Quarter};
use emr_report::{
    BuiltReport, CohortDisaggregation, CohortRequest, DashboardCache, DashboardStats,
    ReportContext, ReportError, ReportFamily, ReportQuery, ReportService, SurvivalGroup,
    build_report, reclassify_report, refresh_dashboard,
};
use emr_validate::{CohortReport, RuleEngine, VBoxResult, to_error_strings};
use serde_json::Value;
use tracing::{debug, info, info_span, warn};

use emr_cli::logging::redact_ids;
use emr_cli::render::{Grid, OutputFormat, report_grid, row_grid};

use crate::cli::{
    AggregateArgs, DashboardArgs, FetchArgs, FormatArg, QuartersArgs, ReportArgs, ValidateArgs,
};
use crate::summary::{print_dashboard, print_grid, print_validation};

/// Outcome of `validate`; violations make the process exit with 1.
pub struct ValidationOutcome {
    pub report: CohortReport,
    pub remote: Vec<String>,
}

impl ValidationOutcome {
    pub fn has_errors(&self) -> bool {
        !self.report.is_valid() || !self.remote.is_empty()
    }
}

pub fn run_validate(args: &ValidateArgs) -> Result<ValidationOutcome> {
    let span = info_span!("validate", fetch = args.fetch);
    let _guard = span.enter();

    let data = match &args.cohort_file {
        Some(path) => read_json::<CohortData>(path).context("read cohort report")?,
        None => fetch_cohort(args)?,
    };
    let report = RuleEngine::cohort()
        .execute(&data)
        .context("validate cohort report")?;
    let remote = match &args.remote_results {
        Some(path) => {
            let results: Vec<VBoxResult> = read_json(path).context("read remote results")?;
            to_error_strings(&results)
        }
        None => Vec::new(),
    };
    info!(
        rules = report.rules_checked,
        violations = report.violations.len(),
        remote = remote.len(),
        "Validated cohort report"
    );

    let outcome = ValidationOutcome { report, remote };
    match output_format(args.format) {
        OutputFormat::Table => print_validation(&outcome.report, &outcome.remote),
        OutputFormat::Json => {
            let value = serde_json::json!({
                "report": outcome.report,
                "remote": outcome.remote,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Csv => {
            let mut grid = Grid::new(["rule", "comparator", "expected", "actual", "error"]);
            for violation in &outcome.report.violations {
                grid.push(vec![
                    (violation.rule + 1).to_string(),
                    violation.comparator.clone(),
                    violation.expected.to_string(),
                    violation.actual.to_string(),
                    violation.error.clone(),
                ]);
            }
            print!("{}", grid.to_csv()?);
        }
    }
    Ok(outcome)
}

/// Fetches the cohort report for the requested quarter or period.
fn fetch_cohort(args: &ValidateArgs) -> Result<CohortData> {
    let service = report_service(&args.report)?;
    let query = service.query();
    let request = match (&args.quarter, query.start_date(), query.end_date()) {
        (Some(quarter), _, _) => CohortRequest::quarter(quarter.clone()),
        (None, Some(start), Some(end)) => CohortRequest::dates(start, end),
        _ => CohortRequest::quarter(Quarter::containing(query.date()).to_string()),
    }
    .with_regenerate(args.regenerate);

    let runtime = tokio::runtime::Runtime::new().context("start async runtime")?;
    runtime
        .block_on(service.cohort(&request))
        .map_err(report_failure)
}

pub fn run_aggregate(args: &AggregateArgs) -> Result<()> {
    let family: ReportFamily = args.family.parse().map_err(report_failure)?;
    let span = info_span!("aggregate", family = %family);
    let _guard = span.enter();

    let payload: Value = read_json(&args.response_file).context("read report response")?;
    let group = survival_group(&args.survival.survival_group)?;
    let report = build_report(family, &payload, group).map_err(report_failure)?;
    let maternal = match &args.maternal_status {
        Some(path) => {
            let status: MaternalStatus = read_json(path).context("read maternal status")?;
            Some(maternal_rows(family, &report, &status)?)
        }
        None => None,
    };
    emit(family, &report, maternal.as_deref(), output_format(args.format))
}

pub fn run_fetch(args: &FetchArgs) -> Result<()> {
    let family: ReportFamily = args.family.parse().map_err(report_failure)?;
    let span = info_span!("fetch", family = %family);
    let _guard = span.enter();

    let service = report_service(&args.report)?;
    let group = survival_group(&args.survival.survival_group)?;
    let quarter = match &args.quarter {
        Some(quarter) => quarter.clone(),
        None => Quarter::containing(service.query().date()).to_string(),
    };

    let runtime = tokio::runtime::Runtime::new().context("start async runtime")?;
    let (report, maternal) = runtime
        .block_on(async {
            let report = match family {
                ReportFamily::TxPvls => BuiltReport::Disaggregated(service.tx_pvls().await?),
                ReportFamily::TxTb => {
                    BuiltReport::Disaggregated(service.tx_tb(args.rebuild_outcome).await?)
                }
                ReportFamily::CohortDisaggregated => {
                    let request = CohortDisaggregation::new(quarter.clone())
                        .with_age_group(args.age_group.clone())
                        .with_rebuild_outcome(args.rebuild_outcome);
                    if args.initialize
                        && !service.initialize_cohort_disaggregated(&request).await?
                    {
                        warn!(quarter = %quarter, "Disaggregated cohort table was not created");
                    }
                    BuiltReport::Disaggregated(service.cohort_disaggregated(&request).await?)
                }
                ReportFamily::Survival => BuiltReport::Survival(
                    service
                        .survival_analysis(&quarter, group, args.regenerate)
                        .await?,
                ),
                other => service.fetch_family(other, None, group).await?,
            };
            let maternal = match (&report, args.maternal) {
                (BuiltReport::Disaggregated(aggregated), true) => {
                    Some(service.family_maternity_data(family, aggregated).await?)
                }
                _ => None,
            };
            Ok::<_, ReportError>((report, maternal))
        })
        .map_err(report_failure)?;

    if args.maternal && maternal.is_none() {
        warn!("{family} has no female roll-up to reclassify");
    }
    emit(family, &report, maternal.as_deref(), output_format(args.format))
}

pub fn run_quarters(args: &QuartersArgs) -> Result<Vec<Quarter>> {
    let from = match &args.from {
        Some(date) => dates::parse_date(date).map_err(report_failure)?,
        None => dates::today(),
    };
    Ok(dates::report_quarters(from, args.count))
}

pub fn run_dashboard(args: &DashboardArgs) -> Result<()> {
    let span = info_span!("dashboard", refresh = args.refresh);
    let _guard = span.enter();

    let cache = match &args.cache {
        Some(path) => DashboardCache::new(path.clone()),
        None => DashboardCache::default_location()
            .ok_or_else(|| anyhow!("could not determine the dashboard cache location"))?,
    };

    let stats = if args.refresh {
        let service = report_service(&args.report)?;
        let runtime = tokio::runtime::Runtime::new().context("start async runtime")?;
        let stats = runtime
            .block_on(refresh_dashboard(&service, dates::today()))
            .map_err(report_failure)?;
        if let Err(error) = cache.save(&stats) {
            warn!("Failed to update dashboard cache: {error}");
        }
        stats
    } else {
        match cache.load() {
            Some(stats) => stats,
            None => {
                println!(
                    "No cached statistics at {}; run with --refresh.",
                    cache.path().display()
                );
                DashboardStats::default()
            }
        }
    };
    print_dashboard(&stats);
    Ok(())
}

/// Builds the report service from connection and period options.
fn report_service(args: &ReportArgs) -> Result<ReportService<ApiClient>> {
    let config = load_config(args.config.as_deref())
        .context("load API config")?
        .with_env_overrides();
    let client = ApiClient::new(&config).context("create API client")?;
    debug!(base_url = %client.base_url(), "Using EMR API");

    let mut context = match args.facility {
        Some(facility) => ReportContext::for_facility(facility),
        None => ReportContext::default(),
    };
    if let Some(program) = args.program {
        context.program_id = program;
    }

    let mut query = ReportQuery::default();
    if let Some(date) = &args.date {
        query.set_date(date).map_err(report_failure)?;
    }
    if let (Some(start), Some(end)) = (&args.start_date, &args.end_date) {
        query.set_start_date(start).map_err(report_failure)?;
        query.set_end_date(end).map_err(report_failure)?;
    }
    Ok(ReportService::new(client, context).with_query(query))
}

/// FP, FNP and FBf rows from a saved maternal status response.
fn maternal_rows(
    family: ReportFamily,
    report: &BuiltReport,
    status: &MaternalStatus,
) -> Result<Vec<ReportRow>> {
    let BuiltReport::Disaggregated(aggregated) = report else {
        bail!("{family} has no female roll-up to reclassify");
    };
    debug!(
        pregnant = %redact_ids(&status.pregnant),
        breastfeeding = %redact_ids(&status.breastfeeding),
        "Applying maternal status"
    );
    Ok(reclassify_report(family, aggregated, status))
}

fn emit(
    family: ReportFamily,
    report: &BuiltReport,
    maternal: Option<&[ReportRow]>,
    format: OutputFormat,
) -> Result<()> {
    let indicators = family.indicators();
    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "report": family.endpoint(),
                "data": report,
                "maternal": maternal,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Csv => {
            let grid = report_grid(report, &indicators);
            print!("{}", grid.to_csv()?);
            if let Some(rows) = maternal {
                print!("{}", row_grid(rows, &indicators).to_csv()?);
            }
        }
        OutputFormat::Table => {
            let grid = report_grid(report, &indicators);
            info!(rows = grid.rows.len(), "Built {family}");
            print_grid(&format!("Report: {family}"), &grid);
            if let Some(rows) = maternal {
                println!();
                print_grid("Maternal status", &row_grid(rows, &indicators));
            }
        }
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parse {}", path.display()))
}

fn survival_group(name: &str) -> Result<SurvivalGroup> {
    name.parse().map_err(report_failure)
}

fn output_format(format: FormatArg) -> OutputFormat {
    match format {
        FormatArg::Table => OutputFormat::Table,
        FormatArg::Json => OutputFormat::Json,
        FormatArg::Csv => OutputFormat::Csv,
    }
}

/// Wraps a report error with its user-facing message.
fn report_failure(error: ReportError) -> anyhow::Error {
    let message = error.user_message().to_string();
    anyhow::Error::new(error).context(message)
}
