use crate::scoring::{AttributeValue, RawRecord};

/// Upper bound (inclusive) and label of each tenure bucket, in months.
const TENURE_BUCKETS: [(f64, &str); 5] = [
    (6.0, "0-6"),
    (12.0, "6-12"),
    (24.0, "12-24"),
    (48.0, "24-48"),
    (100.0, "48+"),
];

/// Bucket label for a tenure in months. Values outside (-1, 100] have none.
pub fn tenure_group(tenure: f64) -> Option<&'static str> {
    if tenure <= -1.0 {
        return None;
    }
    TENURE_BUCKETS
        .iter()
        .find(|(upper, _)| tenure <= *upper)
        .map(|(_, label)| *label)
}

/// Add behavioral features derived from the raw attributes. Each feature is
/// only written when its inputs are present, so the aligner decides whether
/// the contract uses it.
pub fn derive_features(record: &mut RawRecord) {
    let number = |record: &RawRecord, name: &str| record.get(name).and_then(AttributeValue::as_number);

    let tenure = number(record, "tenure");
    if let Some(group) = tenure.and_then(tenure_group) {
        record.insert("tenure_group", group);
    }
    if let (Some(total), Some(tenure)) = (number(record, "totalcharges"), tenure) {
        record.insert("avg_monthly_spend", total / (tenure + 1.0));
    }
    if let Some(complaints) = number(record, "complaints_count") {
        record.insert("has_complaints", flag(complaints > 0.0));
    }
    if let Some(delays) = number(record, "payment_delays") {
        record.insert("delayed_payments_flag", flag(delays > 0.0));
    }
}

fn flag(set: bool) -> f64 {
    if set {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenure_buckets_are_right_inclusive() {
        assert_eq!(tenure_group(0.0), Some("0-6"));
        assert_eq!(tenure_group(6.0), Some("0-6"));
        assert_eq!(tenure_group(6.5), Some("6-12"));
        assert_eq!(tenure_group(48.0), Some("24-48"));
        assert_eq!(tenure_group(72.0), Some("48+"));
        assert_eq!(tenure_group(120.0), None);
    }

    #[test]
    fn derives_spend_and_flags() {
        let mut record = RawRecord::new()
            .with("tenure", 9.0)
            .with("totalcharges", 500.0)
            .with("complaints_count", 2.0)
            .with("payment_delays", 0.0);

        derive_features(&mut record);

        assert_eq!(
            record.get("tenure_group"),
            Some(&AttributeValue::Categorical("6-12".to_string()))
        );
        assert_eq!(
            record.get("avg_monthly_spend").and_then(AttributeValue::as_number),
            Some(50.0)
        );
        assert_eq!(
            record.get("has_complaints").and_then(AttributeValue::as_number),
            Some(1.0)
        );
        assert_eq!(
            record
                .get("delayed_payments_flag")
                .and_then(AttributeValue::as_number),
            Some(0.0)
        );
    }

    #[test]
    fn absent_inputs_add_nothing() {
        let mut record = RawRecord::new().with("gender", "male");
        derive_features(&mut record);
        assert_eq!(record.len(), 1);
    }
}
