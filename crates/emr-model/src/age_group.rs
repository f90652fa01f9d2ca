//! Canonical PEPFAR/MoH reporting age groups.

/// Age-group label used for roll-up rows that span every age group.
pub const ALL_AGES: &str = "All";

/// Reporting age groups in canonical order.
///
/// Rows are always emitted in this order. Buckets the API returns under any
/// other key (for example `Unknown`) are not part of any report.
pub const AGE_GROUPS: [&str; 20] = [
    "<1 year",
    "1-4 years",
    "5-9 years",
    "10-14 years",
    "15-19 years",
    "20-24 years",
    "25-29 years",
    "30-34 years",
    "35-39 years",
    "40-44 years",
    "45-49 years",
    "50-54 years",
    "55-59 years",
    "60-64 years",
    "65-69 years",
    "70-74 years",
    "75-79 years",
    "80-84 years",
    "85-89 years",
    "90 plus years",
];

/// Upper bound used for the open-ended oldest age group.
pub const MAX_AGE: u32 = 1000;

/// Returns the position of `label` in [`AGE_GROUPS`].
pub fn canonical_index(label: &str) -> Option<usize> {
    AGE_GROUPS.iter().position(|group| *group == label)
}

pub fn is_canonical(label: &str) -> bool {
    canonical_index(label).is_some()
}

/// Inclusive `(min, max)` age range covered by an age-group label.
///
/// `<1 year` covers `(0, 0)` and `90 plus years` covers `(90, MAX_AGE)`;
/// other labels are read from their `N-M` prefix.
pub fn age_range(label: &str) -> Option<(u32, u32)> {
    match label {
        "<1 year" => return Some((0, 0)),
        "90 plus years" => return Some((90, MAX_AGE)),
        _ => {}
    }
    let (min, rest) = label.split_once('-')?;
    let max = rest.split_whitespace().next()?;
    Some((min.trim().parse().ok()?, max.parse().ok()?))
}

/// Label as keyed by the viral-load-by-regimen endpoint, which widens the
/// first dash (`1-4 years` becomes `1 - 4 years`).
pub fn spaced_label(label: &str) -> String {
    label.replacen('-', " - ", 1)
}
