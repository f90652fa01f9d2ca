//! TB screening of patients currently on ART (TX_TB).

use emr_model::{AggregatedReport, DisaggregatedResponse};

use crate::aggregate::aggregate_disaggregated;

pub const TX_TB_REPORT: &str = "tx_tb";

pub const TX_TB_INDICATORS: [(&str, &str); 10] = [
    ("tx_curr", "TX_CURR"),
    ("symptom_screen_alone", "Symptom Screen (alone)"),
    ("cxr_screen", "CXR Screen"),
    ("mwrd_screen", "mWRD Screen"),
    ("sceen_pos_new", "New on ART/Screen Positive"),
    ("sceen_neg_new", "New on ART/Screen Negative"),
    ("sceen_pos_prev", "Already on ART/Screen Positive"),
    ("sceen_neg_prev", "Already on ART/Screen Negative"),
    ("started_tb_new", "Started TB RX_New on ART"),
    ("started_tb_prev", "Started TB RX_Prev on ART"),
];

pub fn tx_tb_indicators() -> Vec<&'static str> {
    TX_TB_INDICATORS.iter().map(|(name, _)| *name).collect()
}

pub fn build_tx_tb(response: &DisaggregatedResponse) -> AggregatedReport {
    aggregate_disaggregated(response, &tx_tb_indicators())
}
