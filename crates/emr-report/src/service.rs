//! Report requests against the EMR API.

use emr_client::{JsonFetcher, QueryParams};
use emr_model::{
    AggregatedReport, CohortData, CountRow, Gender, IndicatorSet, MaternalStatus, PatientId,
    ReportRow,
};
use serde_json::{Value, json};

use crate::cohort::{COHORT_DRILL_DOWN_PATH, COHORT_REPORT, CohortRequest, cohort_data};
use crate::dates;
use crate::error::{ReportError, Result};
use crate::families::cohort_disaggregated::{
    CLIENTS_GIVEN_IPT_REPORT, COHORT_DISAGGREGATED_REPORT, CohortDisaggregation,
    REGIMEN_DISTRIBUTION_REPORT, SCREENED_FOR_TB_REPORT, is_initialized,
};
use crate::families::survival::{SurvivalGroup, SurvivalRow};
use crate::families::{BuiltReport, ReportFamily, build_report};
use crate::maternal::{
    DEFAULT_REPORT_DEFINITION, MaternalStatusLookup, lookup_status, maternity_rows,
    reclassify_report,
};
use crate::query::{ReportContext, ReportQuery};

/// Endpoint answering maternal status for a list of patients.
pub const MATERNAL_STATUS_PATH: &str = "vl_maternal_status";

/// Requests reports for one facility and reporting period.
#[derive(Debug, Clone)]
pub struct ReportService<F> {
    fetcher: F,
    context: ReportContext,
    query: ReportQuery,
}

impl<F: JsonFetcher> ReportService<F> {
    pub fn new(fetcher: F, context: ReportContext) -> Self {
        Self {
            fetcher,
            context,
            query: ReportQuery::default(),
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: ReportQuery) -> Self {
        self.query = query;
        self
    }

    pub fn context(&self) -> &ReportContext {
        &self.context
    }

    pub fn query(&self) -> &ReportQuery {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut ReportQuery {
        &mut self.query
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Path of a report served under `reports/`.
    pub fn report_path(name: &str) -> String {
        format!("reports/{name}")
    }

    /// Path of a report served under the context's program.
    pub fn program_report_path(&self, name: &str) -> String {
        format!("programs/{}/reports/{name}", self.context.program_id)
    }

    /// Fails with [`ReportError::NoFacility`] unless a facility is selected.
    pub fn ensure_facility(&self) -> Result<()> {
        if self.context.has_facility() {
            Ok(())
        } else {
            Err(ReportError::NoFacility)
        }
    }

    /// The query parameters a request with `extra` would carry.
    pub fn params(&self, extra: Option<QueryParams>) -> QueryParams {
        self.query.build_params(&self.context, extra)
    }

    /// Fetches any API path with the report parameters.
    pub async fn get(&self, path: &str, extra: Option<QueryParams>) -> Result<Value> {
        self.get_with(&self.query, path, extra).await
    }

    /// Like [`ReportService::get`] but with a one-off reporting period.
    pub async fn get_with(
        &self,
        query: &ReportQuery,
        path: &str,
        extra: Option<QueryParams>,
    ) -> Result<Value> {
        self.ensure_facility()?;
        let params = query.build_params(&self.context, extra);
        tracing::debug!(path, params = %params, "Requesting report");
        Ok(self.fetcher.get_json(path, &params).await?)
    }

    /// Posts `body` to any API path with the report parameters of `query`.
    pub async fn post_with(
        &self,
        query: &ReportQuery,
        path: &str,
        body: &Value,
        extra: Option<QueryParams>,
    ) -> Result<Value> {
        self.ensure_facility()?;
        let params = query.build_params(&self.context, extra);
        tracing::debug!(path, params = %params, "Posting report request");
        Ok(self.fetcher.post_json(path, body, &params).await?)
    }

    /// Fetches the raw payload of `reports/<name>`.
    pub async fn get_report(&self, name: &str, extra: Option<QueryParams>) -> Result<Value> {
        self.get(&Self::report_path(name), extra).await
    }

    /// Fetches the raw payload of `programs/<id>/reports/<name>`.
    pub async fn get_program_report(
        &self,
        name: &str,
        extra: Option<QueryParams>,
    ) -> Result<Value> {
        self.get(&self.program_report_path(name), extra).await
    }

    /// Fetches and shapes the report of `family`.
    pub async fn fetch_family(
        &self,
        family: ReportFamily,
        extra: Option<QueryParams>,
        survival_group: SurvivalGroup,
    ) -> Result<BuiltReport> {
        let payload = if family.is_program_report() {
            self.get_program_report(family.endpoint(), extra).await?
        } else {
            self.get_report(family.endpoint(), extra).await?
        };
        build_report(family, &payload, survival_group)
    }

    async fn fetch_disaggregated(
        &self,
        family: ReportFamily,
        extra: Option<QueryParams>,
    ) -> Result<AggregatedReport> {
        match self
            .fetch_family(family, extra, SurvivalGroup::default())
            .await?
        {
            BuiltReport::Disaggregated(report) => Ok(report),
            _ => Err(unexpected_shape(family)),
        }
    }

    async fn fetch_counts(&self, family: ReportFamily) -> Result<Vec<CountRow>> {
        match self
            .fetch_family(family, None, SurvivalGroup::default())
            .await?
        {
            BuiltReport::Counts(rows) => Ok(rows),
            _ => Err(unexpected_shape(family)),
        }
    }

    /// Cohort indicator counts for a quarter or an explicit period.
    ///
    /// The cohort endpoint takes its own parameters; the reporting date of
    /// the service is not sent.
    pub async fn cohort(&self, request: &CohortRequest) -> Result<CohortData> {
        self.ensure_facility()?;
        let path = Self::report_path(COHORT_REPORT);
        let params = request.params(&self.context);
        tracing::debug!(path, params = %params, "Requesting cohort report");
        let payload = self.fetcher.get_json(&path, &params).await?;
        let data = cohort_data(&payload)?;
        tracing::info!(report = %request.name(), indicators = data.len(), "Fetched cohort report");
        Ok(data)
    }

    /// Patients behind one cohort indicator.
    pub async fn cohort_drill_down(&self, resource_id: &str) -> Result<Vec<Value>> {
        let params = QueryParams::new()
            .with("id", resource_id)
            .with("date", dates::to_standard_fmt(self.query.date()))
            .with("program_id", self.context.program_id);
        match self
            .fetcher
            .get_json(COHORT_DRILL_DOWN_PATH, &params)
            .await?
        {
            Value::Null => Ok(Vec::new()),
            Value::Array(rows) => Ok(rows),
            other => Err(ReportError::Decode {
                report: COHORT_DRILL_DOWN_PATH.to_string(),
                message: format!("expected a list of patients, got {other}"),
            }),
        }
    }

    /// Asks the EMR to build the disaggregation table; `true` once it exists.
    pub async fn initialize_cohort_disaggregated(
        &self,
        request: &CohortDisaggregation,
    ) -> Result<bool> {
        let payload = self
            .get_report(COHORT_DISAGGREGATED_REPORT, Some(request.params(true)))
            .await?;
        let initialized = is_initialized(&payload);
        tracing::debug!(
            quarter = %request.quarter,
            initialized,
            "Initialized disaggregated cohort"
        );
        Ok(initialized)
    }

    /// Cohort patients by age group and gender.
    pub async fn cohort_disaggregated(
        &self,
        request: &CohortDisaggregation,
    ) -> Result<AggregatedReport> {
        self.fetch_disaggregated(ReportFamily::CohortDisaggregated, Some(request.params(false)))
            .await
    }

    pub async fn clients_given_ipt(
        &self,
        request: &CohortDisaggregation,
        gender: Gender,
    ) -> Result<Value> {
        self.get_report(CLIENTS_GIVEN_IPT_REPORT, Some(request.gender_params(gender)))
            .await
    }

    pub async fn screened_for_tb(
        &self,
        request: &CohortDisaggregation,
        gender: Gender,
    ) -> Result<Value> {
        self.get_report(SCREENED_FOR_TB_REPORT, Some(request.gender_params(gender)))
            .await
    }

    pub async fn regimen_distribution(
        &self,
        request: &CohortDisaggregation,
        gender: Gender,
    ) -> Result<Value> {
        self.get_report(REGIMEN_DISTRIBUTION_REPORT, Some(request.gender_params(gender)))
            .await
    }

    /// Viral load coverage (TX_PVLS) with outcomes rebuilt.
    pub async fn tx_pvls(&self) -> Result<AggregatedReport> {
        let extra = QueryParams::new().with("rebuild_outcomes", true);
        self.fetch_disaggregated(ReportFamily::TxPvls, Some(extra)).await
    }

    pub async fn vl_by_regimen(&self) -> Result<Vec<CountRow>> {
        self.fetch_counts(ReportFamily::VlByRegimen).await
    }

    pub async fn tb_prev(&self) -> Result<AggregatedReport> {
        self.fetch_disaggregated(ReportFamily::TbPrev, None).await
    }

    pub async fn tx_tb(&self, rebuild_outcome: bool) -> Result<AggregatedReport> {
        let extra = QueryParams::new().with("rebuild_outcome", rebuild_outcome);
        self.fetch_disaggregated(ReportFamily::TxTb, Some(extra)).await
    }

    pub async fn regimens_by_weight(&self) -> Result<Vec<CountRow>> {
        self.fetch_counts(ReportFamily::RegimensByWeight).await
    }

    /// TPT initiation rows ordered by gender.
    pub async fn tpt_initiations(&self) -> Result<Vec<Value>> {
        match self
            .fetch_family(ReportFamily::Tpt, None, SurvivalGroup::default())
            .await?
        {
            BuiltReport::Rows(rows) => Ok(rows),
            _ => Err(unexpected_shape(ReportFamily::Tpt)),
        }
    }

    pub async fn survival_analysis(
        &self,
        quarter: &str,
        group: SurvivalGroup,
        regenerate: bool,
    ) -> Result<Vec<SurvivalRow>> {
        let extra = QueryParams::new()
            .with("quarter", quarter)
            .with("regenerate", regenerate)
            .with("age_group", group.as_str());
        match self
            .fetch_family(ReportFamily::Survival, Some(extra), group)
            .await?
        {
            BuiltReport::Survival(rows) => Ok(rows),
            _ => Err(unexpected_shape(ReportFamily::Survival)),
        }
    }

    /// FP, FNP and FBf rows for the female roll-up of `indicators`.
    pub async fn maternity_data(
        &self,
        female: &IndicatorSet,
        indicators: &[&str],
    ) -> Result<Vec<ReportRow>> {
        maternity_rows(self, female, indicators, DEFAULT_REPORT_DEFINITION).await
    }

    /// Maternal rows of a disaggregated `family` report; TB prevention
    /// covers both TPT regimens and leads with the male roll-up.
    pub async fn family_maternity_data(
        &self,
        family: ReportFamily,
        report: &AggregatedReport,
    ) -> Result<Vec<ReportRow>> {
        let indicators = family.indicators();
        let indicators: Vec<&str> = indicators.iter().map(String::as_str).collect();
        let status = lookup_status(
            self,
            &report.female.aggregate,
            &indicators,
            DEFAULT_REPORT_DEFINITION,
        )
        .await?;
        Ok(reclassify_report(family, report, &status))
    }
}

impl<F: JsonFetcher> MaternalStatusLookup for ReportService<F> {
    async fn maternal_status(
        &self,
        patients: &[PatientId],
        report_definition: &str,
    ) -> Result<MaternalStatus> {
        self.ensure_facility()?;
        let params = self.params(Some(
            QueryParams::new().with("report_definition", report_definition),
        ));
        let body = json!({ "patient_ids": patients });
        let value = self
            .fetcher
            .post_json(MATERNAL_STATUS_PATH, &body, &params)
            .await?;
        if value.is_null() {
            return Ok(MaternalStatus::default());
        }
        serde_json::from_value(value).map_err(|e| ReportError::decode(MATERNAL_STATUS_PATH, &e))
    }
}

fn unexpected_shape(family: ReportFamily) -> ReportError {
    ReportError::Decode {
        report: family.endpoint().to_string(),
        message: "report was built into an unexpected shape".to_string(),
    }
}
