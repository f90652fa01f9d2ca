//! TPT initiation (MoH).

use serde_json::Value;

pub const TPT_REPORT: &str = "moh_tpt";

/// Sorts report rows by their `gender` field, keeping the API's order
/// within a gender. Rows without a gender sort first.
pub fn sort_by_gender(rows: &mut [Value]) {
    rows.sort_by(|a, b| gender_key(a).cmp(gender_key(b)));
}

fn gender_key(row: &Value) -> &str {
    row.get("gender").and_then(Value::as_str).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sort_is_stable() {
        let mut rows = vec![
            json!({"gender": "M", "age_group": "<1 year"}),
            json!({"gender": "F", "age_group": "<1 year"}),
            json!({"gender": "M", "age_group": "1-4 years"}),
            json!({"gender": "F", "age_group": "1-4 years"}),
        ];
        sort_by_gender(&mut rows);
        let order: Vec<_> = rows
            .iter()
            .map(|r| (gender_key(r), r["age_group"].as_str().unwrap()))
            .collect();
        assert_eq!(
            order,
            [("F", "<1 year"), ("F", "1-4 years"), ("M", "<1 year"), ("M", "1-4 years")]
        );
    }
}
