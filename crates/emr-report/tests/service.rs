//! Report service tests against an in-memory fetcher.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Mutex;

use chrono::NaiveDate;
use emr_client::{ApiError, JsonFetcher, QueryParams};
use emr_model::{ALL_AGES, Gender, GenderGroup, IndicatorSet, MaternalGroup, PatientId};
use emr_report::{
    CohortDisaggregation, CohortRequest, ReportContext, ReportError, ReportFamily, ReportQuery,
    ReportService, SurvivalGroup, refresh_dashboard,
};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq)]
struct Call {
    path: String,
    params: String,
    body: Option<Value>,
}

/// Answers requests from canned payloads keyed by path.
#[derive(Default)]
struct FakeFetcher {
    responses: BTreeMap<String, Value>,
    calls: Mutex<Vec<Call>>,
}

impl FakeFetcher {
    fn with(mut self, path: &str, payload: Value) -> Self {
        self.responses.insert(path.to_string(), payload);
        self
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(
        &self,
        path: &str,
        params: &QueryParams,
        body: Option<&Value>,
    ) -> emr_client::Result<Value> {
        self.calls.lock().unwrap().push(Call {
            path: path.to_string(),
            params: params.to_string(),
            body: body.cloned(),
        });
        self.responses
            .get(path)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(path.to_string()))
    }
}

impl JsonFetcher for FakeFetcher {
    fn get_json(
        &self,
        path: &str,
        params: &QueryParams,
    ) -> impl Future<Output = emr_client::Result<Value>> + Send {
        std::future::ready(self.answer(path, params, None))
    }

    fn post_json(
        &self,
        path: &str,
        body: &Value,
        params: &QueryParams,
    ) -> impl Future<Output = emr_client::Result<Value>> + Send {
        std::future::ready(self.answer(path, params, Some(body)))
    }
}

fn reporting_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
}

fn service(fetcher: FakeFetcher) -> ReportService<FakeFetcher> {
    ReportService::new(fetcher, ReportContext::for_facility(706))
        .with_query(ReportQuery::new(reporting_date()))
}

#[tokio::test]
async fn refuses_to_fetch_without_facility() {
    let service = ReportService::new(FakeFetcher::default(), ReportContext::default());
    let err = service.tx_pvls().await.unwrap_err();
    assert!(matches!(err, ReportError::NoFacility));
    let err = service
        .cohort(&CohortRequest::quarter("Q1 2024"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::NoFacility));
    assert!(service.fetcher().calls().is_empty());
}

#[tokio::test]
async fn tx_pvls_request_and_shape() {
    let fetcher = FakeFetcher::default().with(
        "reports/viral_load_coverage",
        json!({
            "<1 year": {"M": {"tx_curr": [1], "drawn": {"routine": [1], "targeted": []}}},
            "Unknown": {"M": {"tx_curr": [99]}}
        }),
    );
    let service = service(fetcher);
    let report = service.tx_pvls().await.unwrap();

    assert_eq!(
        service.fetcher().calls()[0].params,
        "location=706&date=2024-03-31&rebuild_outcomes=true"
    );
    assert_eq!(report.male.aggregate_of("tx_curr"), &[PatientId::new(1)]);
    assert_eq!(report.male.aggregate_of("drawn_routine"), &[PatientId::new(1)]);
    assert!(report.female.aggregate_of("tx_curr").is_empty());
}

#[tokio::test]
async fn api_errors_surface_typed() {
    let service = service(FakeFetcher::default());
    let err = service.tb_prev().await.unwrap_err();
    assert!(matches!(
        err,
        ReportError::Api(ApiError::NotFound(ref path)) if path == "reports/tb_prev2"
    ));
}

#[tokio::test]
async fn program_reports_use_program_path() {
    let fetcher = FakeFetcher::default().with(
        "programs/1/reports/regimens_by_weight_and_gender",
        json!([{"weight": "25 - 29.9 Kg", "females": [{"13A": 4}], "males": []}]),
    );
    let service = service(fetcher);
    let rows = service.regimens_by_weight().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("13A"), 4);
    assert_eq!(rows[1].total(), 0);
}

#[tokio::test]
async fn survival_sends_quarter_and_group() {
    let fetcher = FakeFetcher::default().with(
        "reports/cohort_survival_analysis",
        json!({"Q1 2020": {"On antiretrovirals": {"48": 12}}}),
    );
    let service = service(fetcher);
    let rows = service
        .survival_analysis("Q1 2024", SurvivalGroup::Children, false)
        .await
        .unwrap();
    assert_eq!(rows[0].alive, 12);
    assert_eq!(rows[0].sub_group, SurvivalGroup::Children);
    assert_eq!(
        service.fetcher().calls()[0].params,
        "location=706&date=2024-03-31&quarter=Q1 2024&regenerate=false&age_group=Children"
    );
}

#[tokio::test]
async fn maternity_data_posts_unique_patients() {
    let fetcher =
        FakeFetcher::default().with("vl_maternal_status", json!({"FP": [2], "FBf": [3]}));
    let service = service(fetcher);
    let female: IndicatorSet = BTreeMap::from([
        ("tx_curr".to_string(), vec![PatientId::new(1), PatientId::new(2), PatientId::new(3)]),
        ("due_for_vl".to_string(), vec![PatientId::new(3)]),
    ]);

    let rows = service
        .maternity_data(&female, &["tx_curr", "due_for_vl"])
        .await
        .unwrap();

    let calls = service.fetcher().calls();
    assert_eq!(calls[0].path, "vl_maternal_status");
    assert!(calls[0].params.ends_with("report_definition=pepfar"));
    assert_eq!(calls[0].body, Some(json!({"patient_ids": [1, 2, 3]})));

    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|row| row.age_group == ALL_AGES));
    assert_eq!(rows[0].patients("tx_curr"), &[PatientId::new(2)]);
    assert_eq!(rows[1].patients("tx_curr"), &[PatientId::new(1)]);
    assert_eq!(rows[2].patients("due_for_vl"), &[PatientId::new(3)]);
}

#[tokio::test]
async fn maternity_data_skips_lookup_without_patients() {
    let service = service(FakeFetcher::default());
    let rows = service
        .maternity_data(&IndicatorSet::new(), &["tx_curr"])
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert!(service.fetcher().calls().is_empty());
}

#[tokio::test]
async fn fetch_family_builds_tpt_rows() {
    let fetcher = FakeFetcher::default().with(
        "reports/moh_tpt",
        json!([{"gender": "M", "age_group": "<1 year"}, {"gender": "F", "age_group": "<1 year"}]),
    );
    let service = service(fetcher);
    let rows = service.tpt_initiations().await.unwrap();
    assert_eq!(rows[0]["gender"], "F");
    assert!(
        service
            .fetch_family(ReportFamily::Tpt, None, SurvivalGroup::General)
            .await
            .is_ok()
    );
}

#[tokio::test]
async fn dashboard_refresh_collects_every_list() {
    let fetcher = FakeFetcher::default()
        .with("reports/encounters", json!({"6": {"F": 2, "M": 1}}))
        .with(
            "programs/1/reports/visits",
            json!({"2024-03-28": {"complete": 3, "incomplete": 1}}),
        )
        .with("programs/1/booked_appointments", json!([1, 2]))
        .with("programs/1/reports/patients_on_dtg", json!([1, 2, 3]))
        .with("programs/1/reports/tx_curr", json!([1]))
        .with("reports/missed_appointments", json!({"data": [7]}))
        .with("programs/1/reports/vl_due", json!([]))
        .with("reports/defaulter_list", json!([4, 5]));
    let service = service(fetcher);

    let stats = refresh_dashboard(&service, reporting_date()).await.unwrap();
    assert_eq!(stats.visits.dates, ["28/Mar/2024"]);
    assert_eq!(stats.appointments_due.len(), 2);
    assert_eq!(stats.patients_on_dtg.len(), 3);
    assert_eq!(stats.missed_appointments.len(), 1);
    assert_eq!(stats.defaulters.len(), 2);
    assert_eq!(stats.tx_current30.len(), 1);

    let calls = service.fetcher().calls();
    assert_eq!(
        calls[2].params,
        "location=706&start_date=2024-01-01&end_date=2024-03-31&name=visits"
    );
    assert_eq!(
        calls[3].params,
        "location=706&date=2024-04-01&start_date=2024-01-01&end_date=2024-03-31"
    );
    let tx_curr: Vec<_> = calls
        .iter()
        .filter(|call| call.path == "programs/1/reports/tx_curr")
        .map(|call| call.params.clone())
        .collect();
    assert!(tx_curr[0].contains("start_date=2023-12-02"));
    assert!(tx_curr[1].contains("start_date=2023-11-02"));
}

#[tokio::test]
async fn dashboard_encounters_for_user_and_facility() {
    let fetcher = FakeFetcher::default()
        .with("reports/encounters", json!({"6": {"F": 2, "M": 1}}))
        .with("programs/1/reports/visits", json!({}))
        .with("programs/1/booked_appointments", json!([]))
        .with("programs/1/reports/patients_on_dtg", json!([]))
        .with("programs/1/reports/tx_curr", json!([]))
        .with("reports/missed_appointments", json!([]))
        .with("programs/1/reports/vl_due", json!([]))
        .with("reports/defaulter_list", json!([]));
    let service = service(fetcher);

    let stats = refresh_dashboard(&service, reporting_date()).await.unwrap();
    let vitals = stats
        .encounters
        .iter()
        .find(|stat| stat.encounter == "Vitals")
        .unwrap();
    assert_eq!((vitals.female, vitals.male), (2, 1));
    assert_eq!((vitals.facility, vitals.me), (3, 3));
    assert_eq!(stats.encounters.len(), 9);

    let calls = service.fetcher().calls();
    assert_eq!(calls[0].path, "reports/encounters");
    assert_eq!(calls[0].params, "location=706&date=2024-03-31");
    let types = json!([9, 51, 6, 52, 53, 68, 25, 54, 7]);
    assert_eq!(calls[0].body, Some(json!({"encounter_types": types})));
    assert_eq!(
        calls[1].body,
        Some(json!({"encounter_types": types, "all": true}))
    );
}

#[tokio::test]
async fn cohort_disaggregated_initializes_then_fetches() {
    let fetcher = FakeFetcher::default().with(
        "reports/cohort_disaggregated",
        json!({
            "temp_disaggregated": "created",
            "15-19 years": {"M": {"tx_new": [5], "tx_curr": [5, 6]}}
        }),
    );
    let service = service(fetcher);
    let request = CohortDisaggregation::new("Q1 2024").with_age_group("15-19 years");

    assert!(service.initialize_cohort_disaggregated(&request).await.unwrap());
    let report = service.cohort_disaggregated(&request).await.unwrap();
    assert_eq!(
        report.male.aggregate_of("tx_curr"),
        &[PatientId::new(5), PatientId::new(6)]
    );
    assert!(report.female.aggregate_of("tx_given_ipt").is_empty());

    let calls = service.fetcher().calls();
    assert_eq!(
        calls[0].params,
        "location=706&date=2024-03-31&age_group=15-19 years&rebuild_outcome=true\
         &initialize=true&quarter=Q1 2024"
    );
    assert!(calls[1].params.contains("initialize=false"));
}

#[tokio::test]
async fn cohort_disaggregated_siblings_send_gender() {
    let fetcher = FakeFetcher::default()
        .with("reports/clients_given_ipt", json!([1]))
        .with("reports/screened_for_tb", json!([2]))
        .with("reports/disaggregated_regimen_distribution", json!({"4A": 1}));
    let service = service(fetcher);
    let request = CohortDisaggregation::new("Q1 2024");

    assert_eq!(
        service.clients_given_ipt(&request, Gender::Female).await.unwrap(),
        json!([1])
    );
    service.screened_for_tb(&request, Gender::Male).await.unwrap();
    service.regimen_distribution(&request, Gender::Male).await.unwrap();

    let calls = service.fetcher().calls();
    assert!(calls[0].params.ends_with("&gender=F&age_group=<1 year"));
    assert_eq!(calls[1].path, "reports/screened_for_tb");
    assert!(calls[2].params.ends_with("&gender=M&age_group=<1 year"));
}

#[tokio::test]
async fn cohort_report_uses_quarter_params() {
    let fetcher = FakeFetcher::default().with(
        "reports/cohort",
        json!({"values": [
            {"name": "total_registered", "contents": 10},
            {"name": "cum_total_registered", "contents": [1, 2, 3]}
        ]}),
    );
    let service = service(fetcher);
    let data = service
        .cohort(&CohortRequest::quarter("Q1 2024").with_regenerate(true))
        .await
        .unwrap();
    assert_eq!(data.get("total_registered"), Some(10));
    assert_eq!(data.get("cum_total_registered"), Some(3));
    assert_eq!(
        service.fetcher().calls()[0].params,
        "name=Q1 2024&location=706&regenerate=true"
    );
}

#[tokio::test]
async fn cohort_drill_down_sends_program() {
    let fetcher = FakeFetcher::default()
        .with("cohort_report_drill_down", json!([{"patient_id": 4}]));
    let service = service(fetcher);
    let rows = service.cohort_drill_down("total_registered").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        service.fetcher().calls()[0].params,
        "id=total_registered&date=2024-03-31&program_id=1"
    );
}

#[tokio::test]
async fn tb_prev_maternity_covers_both_regimens() {
    let fetcher = FakeFetcher::default()
        .with(
            "reports/tb_prev2",
            json!({
                "25-29 years": {
                    "F": {"3HP": {"started_new_on_art": [1, 2]}, "6H": {"started_new_on_art": [3]}},
                    "M": {"3HP": {"started_new_on_art": [9]}}
                }
            }),
        )
        .with("vl_maternal_status", json!({"FP": [2], "FBf": [3]}));
    let service = service(fetcher);
    let report = service.tb_prev().await.unwrap();

    let rows = service
        .family_maternity_data(ReportFamily::TbPrev, &report)
        .await
        .unwrap();
    let calls = service.fetcher().calls();
    assert_eq!(calls[1].body, Some(json!({"patient_ids": [1, 2, 3]})));

    let groups: Vec<_> = rows.iter().map(|row| row.gender).collect();
    assert_eq!(
        groups,
        [
            GenderGroup::Gender(Gender::Male),
            GenderGroup::Maternal(MaternalGroup::Pregnant),
            GenderGroup::Maternal(MaternalGroup::NotPregnant),
            GenderGroup::Maternal(MaternalGroup::Breastfeeding),
        ]
    );
    assert_eq!(rows[0].patients("3hp_started_new_on_art"), &[PatientId::new(9)]);
    assert_eq!(rows[1].patients("3hp_started_new_on_art"), &[PatientId::new(2)]);
    assert_eq!(rows[2].patients("3hp_started_new_on_art"), &[PatientId::new(1)]);
    assert_eq!(rows[3].patients("6h_started_new_on_art"), &[PatientId::new(3)]);
}
