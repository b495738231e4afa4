//! Shared Test Helpers for Cross-Crate Use
//!
//! Centralized test utilities used by both the `scoring` and `refunds`
//! crates: request payload factories, a unified test error type and
//! assertion macros that return errors instead of panicking.
use serde_json::{Map, Value, json};

// =============================================================================
// PAYLOAD FACTORIES
// =============================================================================

pub mod payloads {
    use super::*;

    /// The canonical high-risk request: a costly order from a serial returner.
    pub fn high_risk_payload() -> Value {
        json!({
            "order_amount": 5000,
            "product_category": "Electronics",
            "payment_method": "COD",
            "return_reason": "Not Delivered",
            "past_returns": 5,
            "delivery_delay_days": 3,
            "refund_type": "Instant"
        })
    }

    /// A cheap order from a customer with no return history.
    pub fn low_risk_payload() -> Value {
        json!({
            "order_amount": 450,
            "product_category": "Books",
            "payment_method": "Card",
            "return_reason": "Wrong Size",
            "past_returns": 0,
            "delivery_delay_days": 1,
            "refund_type": "Post"
        })
    }

    /// Copy of `payload` with `key` removed.
    pub fn payload_without(payload: &Value, key: &str) -> Value {
        let mut object: Map<String, Value> = payload.as_object().cloned().unwrap_or_default();
        object.remove(key);
        Value::Object(object)
    }

    /// Copy of `payload` with `key` set to `value`.
    pub fn payload_with(payload: &Value, key: &str, value: Value) -> Value {
        let mut object: Map<String, Value> = payload.as_object().cloned().unwrap_or_default();
        object.insert(key.to_string(), value);
        Value::Object(object)
    }
}

// =============================================================================
// UNIFIED TEST ERROR HANDLING
// =============================================================================

/// Unified error type for all test failures
///
/// This provides a consistent error interface across all test suites,
/// making debugging easier and error handling more predictable.
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    #[error("Assertion failed: {message}")]
    AssertionFailure { message: String },

    #[error("Serialization error: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("HTTP error: {source}")]
    HttpError {
        #[from]
        source: http::Error,
    },

    #[error("Probability out of tolerance: expected {expected}, got {actual}")]
    ProbabilityMismatch { expected: f64, actual: f64 },

    #[error("Generic test error: {message}")]
    Generic { message: String },
}

impl TestError {
    /// Create an assertion failure error
    pub fn assertion_failure(message: impl Into<String>) -> Self {
        Self::AssertionFailure {
            message: message.into(),
        }
    }

    pub fn probability_mismatch(expected: f64, actual: f64) -> Self {
        Self::ProbabilityMismatch { expected, actual }
    }

    /// Create a generic error
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }
}

/// Alias for the standard test result type
pub type TestResult<T = ()> = Result<T, TestError>;

/// Helper macro for test assertions that return TestError instead of panicking
#[macro_export]
macro_rules! test_assert {
    ($condition:expr) => {
        if !($condition) {
            return Err($crate::test_helpers::TestError::assertion_failure(
                format!("assertion failed: {}", stringify!($condition))
            ));
        }
    };
    ($condition:expr, $message:expr $(, $arg:expr)*) => {
        if !($condition) {
            return Err($crate::test_helpers::TestError::assertion_failure(
                format!($message $(, $arg)*)
            ));
        }
    };
}

/// Helper macro for test assertions with equality
#[macro_export]
macro_rules! test_assert_eq {
    ($left:expr, $right:expr) => {
        match (&$left, &$right) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    return Err($crate::test_helpers::TestError::assertion_failure(
                        format!("assertion failed: `(left == right)`\n  left: `{:?}`,\n right: `{:?}`",
                                left_val, right_val)
                    ));
                }
            }
        }
    };
    ($left:expr, $right:expr, $message:expr $(, $arg:expr)*) => {
        match (&$left, &$right) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    return Err($crate::test_helpers::TestError::assertion_failure(
                        format!($message $(, $arg)*)
                    ));
                }
            }
        }
    };
}

/// Helper macro for comparing probabilities within a tolerance
#[macro_export]
macro_rules! test_assert_close {
    ($actual:expr, $expected:expr) => {
        $crate::test_assert_close!($actual, $expected, 1e-9)
    };
    ($actual:expr, $expected:expr, $tolerance:expr) => {
        let (actual_val, expected_val): (f64, f64) = ($actual, $expected);
        if (actual_val - expected_val).abs() > $tolerance {
            return Err($crate::test_helpers::TestError::probability_mismatch(
                expected_val,
                actual_val,
            ));
        }
    };
}

/// Utility functions for common test operations
pub mod test_utils {
    use super::*;

    /// Safe HTTP request builder that returns TestError
    pub fn build_request(
        method: &str,
        uri: &str,
        body: Option<String>,
    ) -> TestResult<http::Request<String>> {
        let mut builder = http::Request::builder().uri(uri).method(method);

        if body.is_some() {
            builder = builder.header("Content-Type", "application/json");
        }

        let request = builder
            .body(body.unwrap_or_default())
            .map_err(TestError::from)?;

        Ok(request)
    }

    /// Safe JSON serialization that returns TestError
    pub fn serialize_json<T: serde::Serialize>(value: &T) -> TestResult<String> {
        serde_json::to_string(value).map_err(TestError::from)
    }

    /// Safe response status check
    pub fn check_status_code(
        actual: http::StatusCode,
        expected: http::StatusCode,
    ) -> TestResult<()> {
        if actual != expected {
            return Err(TestError::assertion_failure(format!(
                "Status code mismatch: expected {}, got {}",
                expected, actual
            )));
        }
        Ok(())
    }

    /// Safe error containment check
    pub fn check_error_contains(
        error: &dyn std::error::Error,
        expected_substring: &str,
    ) -> TestResult<()> {
        let error_msg = error.to_string();
        if !error_msg.contains(expected_substring) {
            return Err(TestError::assertion_failure(format!(
                "Error message '{}' does not contain '{}'",
                error_msg, expected_substring
            )));
        }
        Ok(())
    }
}
