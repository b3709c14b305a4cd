use chrono::{Duration, Utc};
use uuid::Uuid;

use booking_cell::models::{BookingProgress, BookingProgressEntry};
use booking_cell::services::progress::{allowed_successors, current_progress, is_terminal};

use BookingProgress::*;

const ALL_STATES: &[BookingProgress] = &[
    Scheduled,
    Rescheduled,
    Cancelled,
    NoShow,
    GeneratingReport,
    ReportGenerated,
    PaymentReceived,
];

fn entry(
    booking_id: Uuid,
    from: Option<BookingProgress>,
    to: BookingProgress,
    minutes_ago: i64,
) -> BookingProgressEntry {
    BookingProgressEntry {
        id: Uuid::new_v4(),
        booking_id,
        from_progress: from,
        to_progress: to,
        changed_by: Uuid::new_v4(),
        note: None,
        impersonated_by: None,
        created_at: Utc::now() - Duration::minutes(minutes_ago),
    }
}

#[test]
fn scheduled_successors_match_table() {
    assert_eq!(
        allowed_successors(Scheduled),
        &[Rescheduled, Cancelled, NoShow, GeneratingReport]
    );
}

#[test]
fn rescheduled_successors_match_table() {
    assert_eq!(
        allowed_successors(Rescheduled),
        &[Cancelled, NoShow, GeneratingReport]
    );
}

#[test]
fn report_chain_is_linear() {
    assert_eq!(allowed_successors(GeneratingReport), &[ReportGenerated]);
    assert_eq!(allowed_successors(ReportGenerated), &[PaymentReceived]);
}

#[test]
fn terminal_states_have_no_successors() {
    for state in [Cancelled, NoShow, PaymentReceived] {
        assert!(allowed_successors(state).is_empty(), "{} should be terminal", state);
        assert!(is_terminal(state));
    }
}

#[test]
fn non_terminal_states_are_not_terminal() {
    for state in [Scheduled, Rescheduled, GeneratingReport, ReportGenerated] {
        assert!(!is_terminal(state), "{} should not be terminal", state);
    }
}

#[test]
fn every_transition_out_of_a_terminal_state_is_rejected() {
    for from in [Cancelled, NoShow, PaymentReceived] {
        for to in ALL_STATES {
            assert!(
                !allowed_successors(from).contains(to),
                "{} -> {} should be rejected",
                from,
                to
            );
        }
    }
}

#[test]
fn no_state_transitions_to_itself() {
    for state in ALL_STATES {
        assert!(!allowed_successors(*state).contains(state));
    }
}

#[test]
fn current_progress_defaults_to_scheduled() {
    assert_eq!(current_progress(&[]), Scheduled);
}

#[test]
fn current_progress_is_latest_entry_by_creation_time() {
    let booking_id = Uuid::new_v4();
    // Deliberately out of order: the newest entry is in the middle.
    let history = vec![
        entry(booking_id, None, Scheduled, 60),
        entry(booking_id, Some(GeneratingReport), ReportGenerated, 5),
        entry(booking_id, Some(Scheduled), GeneratingReport, 30),
    ];

    assert_eq!(current_progress(&history), ReportGenerated);
}

#[test]
fn full_report_lifecycle_is_walkable() {
    let path = [Scheduled, GeneratingReport, ReportGenerated, PaymentReceived];
    for pair in path.windows(2) {
        assert!(
            allowed_successors(pair[0]).contains(&pair[1]),
            "{} -> {} should be allowed",
            pair[0],
            pair[1]
        );
    }
    assert!(is_terminal(PaymentReceived));
}
