#![allow(dead_code)]

use mockall::mock;
use scoring::{Classifier, DecisionPolicy, ScoringService, TransactionRecord};
use std::sync::Arc;

mock! {
    pub Classifier {}

    impl Classifier for Classifier {
        fn score_one(&self, record: &TransactionRecord) -> f64;
        fn name(&self) -> &'static str;
    }
}

/// A classifier that always answers `probability`.
pub fn fixed_classifier(probability: f64) -> MockClassifier {
    let mut classifier = MockClassifier::new();
    classifier.expect_name().return_const("mock_classifier");
    classifier.expect_score_one().returning(move |_| probability);
    classifier
}

/// A classifier that scores a record by its order amount, so tests can tell rows apart.
pub fn amount_classifier() -> MockClassifier {
    let mut classifier = MockClassifier::new();
    classifier.expect_name().return_const("mock_classifier");
    classifier
        .expect_score_one()
        .returning(|record| (record.order_amount / 10_000.0).min(1.0));
    classifier
}

pub fn service_with(classifier: MockClassifier) -> ScoringService {
    ScoringService::new(Arc::new(classifier), DecisionPolicy::default())
}
