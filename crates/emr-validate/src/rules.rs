//! Sum-consistency rules for the MoH cohort report.
//!
//! Every rule says: the value under `comparator` equals the sum of the values
//! under `indicators`. Most report sections come as a pair of rules, one
//! against the quarterly total and one against the cumulative total, where
//! cumulative fields carry a `cum_` prefix unless the section names them
//! explicitly.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};

/// Quarterly comparator shared by all section pairs.
pub const QUARTERLY_TOTAL: &str = "total_registered";
/// Cumulative comparator shared by all section pairs.
pub const CUMULATIVE_TOTAL: &str = "cum_total_registered";
/// Comparator for the "alive and on ART" breakdown sections.
pub const TOTAL_ALIVE_ON_ART: &str = "total_alive_and_on_art";
/// Prefix applied to quarterly field names to get their cumulative field.
pub const CUMULATIVE_PREFIX: &str = "cum_";

/// A single "comparator equals sum of indicators" rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawValidationRule")]
pub struct ValidationRule {
    indicators: Vec<String>,
    comparator: String,
    error: String,
}

#[derive(Deserialize)]
struct RawValidationRule {
    indicators: Vec<String>,
    comparator: String,
    error: String,
}

impl TryFrom<RawValidationRule> for ValidationRule {
    type Error = ValidationError;

    fn try_from(raw: RawValidationRule) -> Result<Self> {
        ValidationRule::new(raw.indicators, raw.comparator, raw.error)
    }
}

impl ValidationRule {
    /// Creates a rule, rejecting an empty indicator list.
    pub fn new<I, S>(
        indicators: I,
        comparator: impl Into<String>,
        error: impl Into<String>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let indicators: Vec<String> = indicators.into_iter().map(Into::into).collect();
        let comparator = comparator.into();
        if indicators.is_empty() {
            return Err(ValidationError::EmptyIndicators { comparator });
        }
        Ok(Self {
            indicators,
            comparator,
            error: error.into(),
        })
    }

    pub fn indicators(&self) -> &[String] {
        &self.indicators
    }

    pub fn comparator(&self) -> &str {
        &self.comparator
    }

    /// Message reported when the rule does not hold.
    pub fn error(&self) -> &str {
        &self.error
    }
}

/// Builds the quarterly and cumulative rules for one report section.
///
/// `overrides` maps an indicator position to the cumulative field name to
/// use instead of the `cum_`-prefixed default.
pub fn section_rules(
    indicators: &[&str],
    section: &str,
    description: &str,
    overrides: &[(usize, &str)],
) -> Result<[ValidationRule; 2]> {
    let quarterly = ValidationRule::new(
        indicators.iter().copied(),
        QUARTERLY_TOTAL,
        format!("Section {section}: Total registered (Quartely) is not equal to {description}"),
    )?;
    let cumulative_fields = indicators.iter().enumerate().map(|(index, indicator)| {
        overrides
            .iter()
            .find(|(position, _)| *position == index)
            .map(|(_, name)| (*name).to_string())
            .unwrap_or_else(|| format!("{CUMULATIVE_PREFIX}{indicator}"))
    });
    let cumulative = ValidationRule::new(
        cumulative_fields,
        CUMULATIVE_TOTAL,
        format!("Section {section}: Total registered (Cummulative) is not equal to {description}"),
    )?;
    Ok([quarterly, cumulative])
}

static COHORT_RULES: LazyLock<Vec<ValidationRule>> =
    LazyLock::new(|| build_cohort_rules().expect("default cohort rules are well-formed"));

/// The MoH cohort report rule set, in declaration order.
pub fn cohort_rules() -> &'static [ValidationRule] {
    &COHORT_RULES
}

fn build_cohort_rules() -> Result<Vec<ValidationRule>> {
    let mut rules = Vec::new();

    rules.extend(section_rules(
        &[
            "initial_non_pregnant_females_all_ages",
            "males_initiated_on_art_first_time",
            "initial_pregnant_females_all_ages",
            "unknown_gender",
            "re_initiated_on_art",
            "transfer_in",
        ],
        "26 - 32",
        "Total FT + Re Patients re-initiated on ART + TI Patients transferred in on ART",
        &[],
    )?);

    rules.extend(section_rules(
        &[
            "quarterly_all_males",
            "non_pregnant_females",
            "pregnant_females_all_ages",
        ],
        "33 - 35",
        "M Males (all ages) + FNP Non-pregnant Females (all ages)  + FP Pregnant Females (all ages)",
        &[(0, "cum_all_males")],
    )?);

    rules.extend(section_rules(
        &[
            "children_below_24_months_at_art_initiation",
            "children_24_months_14_years_at_art_initiation",
            "adults_at_art_initiation",
        ],
        "36 - 38",
        "A Children below 24 m at ART initiation + B Children 24 m - 14 yrs at ART initiation + \
         C Adults 15 years+ at ART initiation",
        &[],
    )?);

    rules.extend(section_rules(
        &[
            "presumed_severe_hiv_disease_in_infants",
            "confirmed_hiv_infection_in_infants_pcr",
            "quarterly_children_12_59_months",
            "pregnant_women",
            "breastfeeding_mothers",
            "who_stage_two",
            "asymptomatic",
            "who_stage_three",
            "who_stage_four",
            "unknown_other_reason_outside_guidelines",
        ],
        "39 - 48",
        "Pres. Sev. HIV disease age <12 m + PCR Infants <12 mths PCR + U5 Children 12-59 + \
         mths Preg Pregnant women + BF Breastfeeding mothers + CD4 CD4 below threshold + \
         Asy Asymptomatic / mild + WHO stage 3 + WHO stage 4 + Unknown / reason outside guidelines",
        &[(2, "cum_children_12_59_months")],
    )?);

    rules.extend(section_rules(
        &["no_tb", "tb_within_the_last_two_years", "current_episode_of_tb"],
        "49 - 51",
        "Nev/>2yrs Never TB / TB over 2 years ago + Last 2yrs TB within the last 2 years + \
         Curr Current episode of TB",
        &[],
    )?);

    rules.push(ValidationRule::new(
        [
            "total_alive_and_on_art",
            "died_total",
            "defaulted",
            "stopped_art",
            "transfered_out",
        ],
        CUMULATIVE_TOTAL,
        "Section 53 - 61: Total registered (Cummulative) is not equal to Total alive and on ART + \
         Died total + Defaulted (more than 2 months overdue after expected to have run out of ARVs) + \
         Stopped taking ARVs (clinician or patient own decision, last known alive) + Transferred Out",
    )?);

    rules.push(ValidationRule::new(
        [
            "zero_p", "zero_a", "two_p", "two_a", "four_pp", "four_pa", "four_a", "five_a",
            "six_a", "seven_a", "eight_a", "nine_pp", "nine_pa", "nine_a", "ten_a", "eleven_pp",
            "eleven_pa", "eleven_a", "twelve_pp", "twelve_pa", "twelve_a", "unknown_regimen",
            "thirteen_a", "fourteen_a", "sixteen_a", "seventeen_a", "fourteen_pp", "fourteen_pa",
            "fifteen_pp", "fifteen_pa", "fifteen_a", "sixteen_p", "seventeen_pa", "seventeen_pp",
        ],
        TOTAL_ALIVE_ON_ART,
        "Section 64 - 80: Total alive and on ART is not equal to Regimens sections",
    )?);

    rules.push(ValidationRule::new(
        [
            "total_pregnant_women",
            "total_breastfeeding_women",
            "total_other_patients",
        ],
        TOTAL_ALIVE_ON_ART,
        "Section 81 - 83: Total alive and on ART is not equal to Pregnant + Breastfeeding + \
         All others (not circled)",
    )?);

    rules.push(ValidationRule::new(
        [
            "tb_not_suspected",
            "tb_suspected",
            "tb_confirmed_currently_not_yet_on_tb_treatment",
            "tb_confirmed_on_tb_treatment",
            "unknown_tb_status",
        ],
        TOTAL_ALIVE_ON_ART,
        "Section 84 - 88: Total alive and on ART is not equal to TB not suspected + TB suspected + \
         TB conf., not on Rx + TB conf., on TB Rx + Unknown (not circled)",
    )?);

    rules.push(ValidationRule::new(
        [
            "total_patients_without_side_effects",
            "total_patients_with_side_effects",
            "unknown_side_effects",
        ],
        TOTAL_ALIVE_ON_ART,
        "Section 88 - 91: Total alive and on ART is not equal to None + Any side effects + \
         Unknown (not circled)",
    )?);

    rules.push(ValidationRule::new(
        [
            "patients_with_0_6_doses_missed_at_their_last_visit",
            "patients_with_7_plus_doses_missed_at_their_last_visit",
            "patients_with_unknown_adhrence",
        ],
        TOTAL_ALIVE_ON_ART,
        "Section 92 - 94: Total alive and on ART is not equal to 0 - 3 doses missed + \
         4+ doses missed + Unknown (not circled)",
    )?);

    Ok(rules)
}
