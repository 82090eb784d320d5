#![allow(non_snake_case)]

use super::*;
use test_case::test_case;

#[test]
fn DmError___invalid_state___displays_expected_and_actual() {
    let err = DmError::invalid_state("inactive", "WaitingForRequired");

    let display = err.to_string();

    assert_eq!(
        display,
        "invalid lifecycle state: expected inactive, got WaitingForRequired"
    );
}

#[test]
fn DmError___from_serde_error___converts_to_serialization_error() {
    let json_err = serde_json::from_str::<String>("invalid").unwrap_err();

    let err: DmError = json_err.into();

    assert!(matches!(err, DmError::SerializationError(_)));
}

#[test_case(DmError::invalid_state("a", "b"), true)]
#[test_case(DmError::IllegalRegistrationState("poisoned".into()), true)]
#[test_case(DmError::InvalidProperties("bad".into()), false)]
#[test_case(DmError::InvalidFilter("(".into()), false)]
#[test_case(DmError::ConfigError("x".into()), false)]
#[test_case(DmError::DependencyError("x".into()), false)]
#[test_case(DmError::Internal("x".into()), false)]
fn DmError___is_illegal_state___only_for_state_errors(err: DmError, expected: bool) {
    assert_eq!(err.is_illegal_state(), expected);
}

#[test]
fn CallbackError___display___includes_message() {
    let err = CallbackError::new("boom");

    assert_eq!(err.to_string(), "callback failed: boom");
}

#[test]
fn ConfigurationError___without_property___omits_property() {
    let err = ConfigurationError::new("missing port");

    assert_eq!(err.to_string(), "configuration rejected: missing port");
}

#[test]
fn ConfigurationError___with_property___names_property() {
    let err = ConfigurationError::for_property("port", "must be positive");

    assert_eq!(
        err.to_string(),
        "configuration rejected (property port): must be positive"
    );
}
