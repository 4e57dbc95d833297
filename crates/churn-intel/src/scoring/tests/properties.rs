use super::common::{
    context_with, contract, encoding, logistic_model, stub_context, telco_record, thresholds,
    RecordingClassifier,
};
use crate::scoring::{
    AttributeValue, RawRecord, RiskTier, ScalerParams, ScoringContext, ScoringPipeline,
    ScoringRequest,
};

#[test]
fn attribute_order_and_spelling_do_not_change_the_vector() {
    let reordered: RawRecord = [
        ("Contract ", AttributeValue::from("Month-to-month")),
        ("SeniorCitizen", AttributeValue::from("No")),
        ("Gender", AttributeValue::from(" FEMALE")),
        ("TotalCharges", AttributeValue::from("840")),
        ("MonthlyCharges", AttributeValue::from(70.0)),
        ("tenure", AttributeValue::from(12.0)),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), value))
    .collect();

    let recorder = RecordingClassifier::default();
    let context = context_with(recorder.clone());
    let pipeline = ScoringPipeline::new(&context);

    pipeline
        .score(&ScoringRequest::new(telco_record()))
        .expect("canonical record scores");
    let canonical = recorder.last_vector();
    pipeline
        .score(&ScoringRequest::new(reordered))
        .expect("reordered record scores");

    assert_eq!(recorder.last_vector(), canonical);
}

#[test]
fn scoring_is_idempotent() {
    let context = ScoringContext::builder(contract())
        .encoding(encoding())
        .classifier(logistic_model().bind(&contract()).expect("model binds"))
        .thresholds(thresholds())
        .build()
        .expect("context builds");
    let pipeline = ScoringPipeline::new(&context);
    let request = ScoringRequest::new(telco_record()).with_customer_id("0001");

    let first = pipeline.score(&request).expect("first pass");
    let second = pipeline.score(&request).expect("second pass");

    assert_eq!(first, second);
}

#[test]
fn longer_contracts_lower_logistic_risk() {
    let context = ScoringContext::builder(contract())
        .encoding(encoding())
        .classifier(logistic_model().bind(&contract()).expect("model binds"))
        .build()
        .expect("context builds");
    let pipeline = ScoringPipeline::new(&context);

    let monthly = pipeline
        .score(&ScoringRequest::new(telco_record()))
        .expect("monthly scores");
    let two_year = pipeline
        .score(&ScoringRequest::new(
            telco_record().with("contract", "Two year"),
        ))
        .expect("two year scores");

    assert!((0.0..=1.0).contains(&monthly.churn_probability));
    assert!(two_year.churn_probability < monthly.churn_probability);
}

#[test]
fn tier_never_drops_as_probability_rises() {
    let mut previous = RiskTier::Low;
    for step in 0..=20 {
        let probability = f64::from(step) / 20.0;
        let context = stub_context(probability);
        let outcome = ScoringPipeline::new(&context)
            .score(&ScoringRequest::new(telco_record()))
            .expect("record scores");
        assert!(
            outcome.risk_tier >= previous,
            "tier fell at probability {probability}"
        );
        previous = outcome.risk_tier;
    }
    assert_eq!(previous, RiskTier::High);
}

#[test]
fn scaler_is_applied_in_contract_order() {
    let scaler = ScalerParams::new()
        .with_column("tenure", 10.0, 2.0)
        .with_column("monthlycharges", 50.0, 10.0)
        .with_column("totalcharges", 840.0, 100.0)
        .with_column("gender_male", 0.0, 1.0)
        .with_column("seniorcitizen_yes", 0.0, 1.0)
        .with_column("contract_one_year", 0.0, 1.0)
        .with_column("contract_two_year", 0.0, 1.0);
    let recorder = RecordingClassifier::default();
    let context = ScoringContext::builder(contract())
        .encoding(encoding())
        .scaler(scaler)
        .classifier(recorder.clone())
        .build()
        .expect("context builds");

    ScoringPipeline::new(&context)
        .score(&ScoringRequest::new(telco_record()))
        .expect("record scores");

    assert_eq!(
        recorder.last_vector(),
        vec![1.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0]
    );
}

#[test]
fn scaler_for_unknown_column_is_rejected() {
    let scaler = ScalerParams::new()
        .with_column("tenure", 10.0, 2.0)
        .with_column("paymentmethod", 1.0, 1.0);

    let err = ScoringContext::builder(contract())
        .scaler(scaler)
        .classifier(RecordingClassifier::default())
        .build()
        .expect_err("scaler and contract disagree");

    assert!(err.to_string().contains("feature contract mismatch"));
}
