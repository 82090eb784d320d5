#![allow(non_snake_case)]

use super::*;
use test_case::test_case;

// ============================================================================
// Parameterized transition table rows
// ============================================================================

#[test_case(WaitingForRequired, TrackingOptional, Transition::Activate)]
#[test_case(TrackingOptional, WaitingForRequired, Transition::Suspend)]
#[test_case(Inactive, TrackingOptional, Transition::ActivateFromInactive)]
#[test_case(Inactive, WaitingForRequired, Transition::StartTracking)]
#[test_case(WaitingForRequired, Inactive, Transition::StopTracking)]
#[test_case(TrackingOptional, Inactive, Transition::Shutdown)]
fn transitions___state_change___fires_single_row(
    old: Classification,
    new: Classification,
    expected: Transition,
) {
    assert_eq!(transitions(old, new), vec![expected]);
}

// ============================================================================
// Parameterized unchanged classification
// ============================================================================

#[test_case(Inactive)]
#[test_case(WaitingForRequired)]
#[test_case(TrackingOptional)]
fn transitions___same_classification___fires_nothing(state: Classification) {
    assert!(transitions(state, state).is_empty());
}
