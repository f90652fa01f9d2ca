//! Dashboard statistics and their last-value cache.
//!
//! The dashboard shows the most recently fetched numbers while a refresh is
//! pending, so the last result is kept as JSON in the platform data folder.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use directories::ProjectDirs;
use emr_client::{JsonFetcher, QueryParams};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::dates::{self, Quarter};
use crate::error::{ReportError, Result};
use crate::service::ReportService;

const APP_QUALIFIER: &str = "org";
const APP_ORG: &str = "emr-reports";
const APP_NAME: &str = "EMR Reports";
const CACHE_FILENAME: &str = "dashboard_statistics.json";

pub const ENCOUNTERS_REPORT: &str = "encounters";

/// Encounter types counted on the dashboard, with their EMR encounter type ids.
pub const ENCOUNTER_TYPES: [(&str, u32); 9] = [
    ("HIV clinic registration", 9),
    ("HIV reception", 51),
    ("Vitals", 6),
    ("HIV staging", 52),
    ("HIV clinic consultation", 53),
    ("ART adherence", 68),
    ("Prescription", 25),
    ("Dispensing", 54),
    ("Appointments", 7),
];

/// Encounters of one type recorded in the reporting period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterStat {
    pub encounter: String,
    /// Facility-wide encounters with female patients.
    pub female: u64,
    pub male: u64,
    /// Encounters recorded by the current user.
    pub me: u64,
    pub facility: u64,
}

/// Daily visit counts for the current quarter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientVisits {
    /// Display-formatted dates.
    pub dates: Vec<String>,
    pub complete: Vec<u64>,
    pub incomplete: Vec<u64>,
}

/// Everything shown on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub visits: PatientVisits,
    pub missed_appointments: Vec<Value>,
    pub appointments_due: Vec<Value>,
    #[serde(rename = "dueForVL")]
    pub due_for_vl: Vec<Value>,
    pub defaulters: Vec<Value>,
    #[serde(rename = "patientsOnDTG")]
    pub patients_on_dtg: Vec<Value>,
    pub tx_current30: Vec<Value>,
    pub tx_current60: Vec<Value>,
    pub encounters: Vec<EncounterStat>,
}

impl Default for DashboardStats {
    fn default() -> Self {
        Self {
            visits: PatientVisits::default(),
            missed_appointments: Vec::new(),
            appointments_due: Vec::new(),
            due_for_vl: Vec::new(),
            defaulters: Vec::new(),
            patients_on_dtg: Vec::new(),
            tx_current30: Vec::new(),
            tx_current60: Vec::new(),
            encounters: build_encounters(None, None),
        }
    }
}

impl DashboardStats {
    /// Label and size of every list, in display order.
    pub fn counts(&self) -> [(&'static str, usize); 7] {
        [
            ("Missed appointments", self.missed_appointments.len()),
            ("Appointments due", self.appointments_due.len()),
            ("Due for VL", self.due_for_vl.len()),
            ("Defaulters", self.defaulters.len()),
            ("Patients on DTG", self.patients_on_dtg.len()),
            ("TX_CURR (30 days)", self.tx_current30.len()),
            ("TX_CURR (60 days)", self.tx_current60.len()),
        ]
    }
}

/// Last-value store for [`DashboardStats`].
#[derive(Debug, Clone)]
pub struct DashboardCache {
    path: PathBuf,
}

impl DashboardCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache in the platform data folder, if one can be determined.
    pub fn default_location() -> Option<Self> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
            .map(|dirs| Self::new(dirs.data_dir().join(CACHE_FILENAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The cached stats; `None` when missing or unreadable.
    pub fn load(&self) -> Option<DashboardStats> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No dashboard cache at {:?}", self.path);
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to read dashboard cache: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(stats) => Some(stats),
            Err(e) => {
                tracing::warn!("Error parsing cached stats: {}, refresh to load fresh stats", e);
                None
            }
        }
    }

    /// Overwrites the cache with `stats`.
    pub fn save(&self, stats: &DashboardStats) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ReportError::Cache(format!("failed to create cache directory: {e}")))?;
        }
        let content = serde_json::to_string_pretty(stats)
            .map_err(|e| ReportError::Cache(format!("failed to serialize stats: {e}")))?;
        fs::write(&self.path, content)
            .map_err(|e| ReportError::Cache(format!("failed to write cache: {e}")))?;
        tracing::debug!("Saved dashboard cache to {:?}", self.path);
        Ok(())
    }
}

/// One row per [`ENCOUNTER_TYPES`] entry from the facility-wide and
/// per-user encounter counts (`{ type_id: { "F": n, "M": n } }`, optionally
/// inside `data`). Missing counts are 0.
pub fn build_encounters(facility: Option<&Value>, user: Option<&Value>) -> Vec<EncounterStat> {
    let by_type = |counts: Option<&Value>, id: u32, gender: &str| -> u64 {
        counts
            .map(|value| value.get("data").unwrap_or(value))
            .and_then(|value| value.get(id.to_string()))
            .and_then(|value| value.get(gender))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    };
    ENCOUNTER_TYPES
        .iter()
        .map(|(encounter, id)| {
            let female = by_type(facility, *id, "F");
            let male = by_type(facility, *id, "M");
            EncounterStat {
                encounter: (*encounter).to_string(),
                female,
                male,
                me: by_type(user, *id, "F").saturating_add(by_type(user, *id, "M")),
                facility: female.saturating_add(male),
            }
        })
        .collect()
}

/// Encounter counts for the current user and for the whole facility.
async fn fetch_encounters<F: JsonFetcher>(
    service: &ReportService<F>,
) -> Result<Vec<EncounterStat>> {
    let encounter_types: Vec<u32> = ENCOUNTER_TYPES.iter().map(|(_, id)| *id).collect();
    let path = ReportService::<F>::report_path(ENCOUNTERS_REPORT);
    let user = service
        .post_with(
            service.query(),
            &path,
            &json!({ "encounter_types": encounter_types }),
            None,
        )
        .await?;
    let facility = service
        .post_with(
            service.query(),
            &path,
            &json!({ "encounter_types": encounter_types, "all": true }),
            None,
        )
        .await?;
    Ok(build_encounters(Some(&facility), Some(&user)))
}

/// Unwraps list payloads that may arrive inside a `data` envelope.
fn entries(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Reads `{ day: { complete, incomplete } }`, optionally inside `data`.
fn parse_visits(value: &Value) -> PatientVisits {
    let days = value.get("data").unwrap_or(value);
    let mut visits = PatientVisits::default();
    let Some(days) = days.as_object() else {
        return visits;
    };
    for (day, counts) in days {
        let label = dates::parse_date(day).map_or_else(|_| day.clone(), dates::to_display_fmt);
        visits.dates.push(label);
        visits
            .complete
            .push(counts.get("complete").and_then(Value::as_u64).unwrap_or(0));
        visits
            .incomplete
            .push(counts.get("incomplete").and_then(Value::as_u64).unwrap_or(0));
    }
    visits
}

/// Fetches fresh dashboard numbers for the quarter containing `today`.
pub async fn refresh_dashboard<F: JsonFetcher>(
    service: &ReportService<F>,
    today: NaiveDate,
) -> Result<DashboardStats> {
    let encounters = fetch_encounters(service).await?;

    let quarter = Quarter::containing(today);
    let mut query = service.query().clone();
    query.set_period(quarter.start(), quarter.end());
    let tomorrow = dates::to_standard_fmt(today + chrono::Days::new(1));

    let mut visits_query = query.clone();
    visits_query.use_default_params = false;
    let visits = service
        .get_with(
            &visits_query,
            &service.program_report_path("visits"),
            Some(QueryParams::new().with("name", "visits")),
        )
        .await?;

    let program = service.context().program_id;
    let appointments_due = service
        .get_with(
            &query,
            &format!("programs/{program}/booked_appointments"),
            Some(QueryParams::new().with("date", tomorrow)),
        )
        .await?;

    let tx_curr = |days: u64| {
        let start = dates::to_standard_fmt(dates::subtract_days(quarter.start(), days));
        let path = service.program_report_path("tx_curr");
        let query = &query;
        async move {
            service
                .get_with(query, &path, Some(QueryParams::new().with("start_date", start)))
                .await
        }
    };

    let stats = DashboardStats {
        visits: parse_visits(&visits),
        appointments_due: entries(appointments_due),
        patients_on_dtg: entries(
            service
                .get_with(&query, &service.program_report_path("patients_on_dtg"), None)
                .await?,
        ),
        tx_current30: entries(tx_curr(30).await?),
        missed_appointments: entries(
            service
                .get_with(&query, &ReportService::<F>::report_path("missed_appointments"), None)
                .await?,
        ),
        due_for_vl: entries(
            service
                .get_with(&query, &service.program_report_path("vl_due"), None)
                .await?,
        ),
        tx_current60: entries(tx_curr(60).await?),
        defaulters: entries(
            service
                .get_with(
                    &query,
                    &ReportService::<F>::report_path("defaulter_list"),
                    Some(QueryParams::new().with("pepfar", true)),
                )
                .await?,
        ),
        encounters,
    };
    tracing::info!(
        quarter = %quarter,
        defaulters = stats.defaulters.len(),
        "Refreshed dashboard statistics"
    );
    Ok(stats)
}
