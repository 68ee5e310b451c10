use chrono::{DateTime, Duration, Utc};
use homecal_core::{
    Attendee, AttendeeRole, AttendeeStatus, Event, EventValidationError, AUTO_DECLINE_NOTE,
};

fn at(epoch_ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(epoch_ms).unwrap()
}

fn bob() -> Attendee {
    Attendee::invite(
        "Bob",
        "bob@example.com",
        AttendeeRole::Required,
        "carol@example.com",
        at(1_000),
    )
}

#[test]
fn invite_starts_in_no_response_state() {
    let attendee = bob();
    assert_eq!(attendee.status, AttendeeStatus::NoResponse);
    assert_eq!(attendee.response_at, None);
    assert_eq!(attendee.note, None);
    assert!(attendee.is_response_state_consistent());
}

#[test]
fn respond_sets_status_response_time_and_note() {
    let mut attendee = bob();
    let now = at(5_000);

    attendee
        .respond(AttendeeStatus::Accepted, Some("see you there".into()), now)
        .unwrap();

    assert_eq!(attendee.status, AttendeeStatus::Accepted);
    assert_eq!(attendee.response_at, Some(now));
    assert_eq!(attendee.note.as_deref(), Some("see you there"));
    assert!(attendee.is_response_state_consistent());
}

#[test]
fn respond_rejects_no_response_target() {
    let mut attendee = bob();
    let before = attendee.clone();

    let err = attendee
        .respond(AttendeeStatus::NoResponse, None, at(5_000))
        .unwrap_err();

    assert_eq!(err, EventValidationError::InvalidResponseTarget);
    assert_eq!(attendee, before);
}

#[test]
fn respond_allows_changing_your_mind() {
    let mut attendee = bob();
    attendee
        .respond(AttendeeStatus::Accepted, None, at(5_000))
        .unwrap();
    attendee
        .respond(AttendeeStatus::Declined, Some("plans changed".into()), at(9_000))
        .unwrap();

    assert_eq!(attendee.status, AttendeeStatus::Declined);
    assert_eq!(attendee.response_at, Some(at(9_000)));
    assert_eq!(attendee.note.as_deref(), Some("plans changed"));
}

#[test]
fn auto_expire_declines_overdue_invitation() {
    let mut attendee = bob();
    attendee.response_required_by = Some(at(10_000));
    let now = at(10_001);

    assert!(attendee.auto_expire(now));
    assert_eq!(attendee.status, AttendeeStatus::Declined);
    assert_eq!(attendee.response_at, Some(now));
    assert_eq!(attendee.note.as_deref(), Some(AUTO_DECLINE_NOTE));
}

#[test]
fn auto_expire_is_idempotent() {
    let mut attendee = bob();
    attendee.response_required_by = Some(at(10_000));

    assert!(attendee.auto_expire(at(11_000)));
    let after_first = attendee.clone();

    assert!(!attendee.auto_expire(at(12_000)));
    assert_eq!(attendee, after_first);
}

#[test]
fn auto_expire_skips_missing_or_future_deadlines() {
    let mut without_deadline = bob();
    assert!(!without_deadline.auto_expire(at(99_000)));
    assert_eq!(without_deadline.status, AttendeeStatus::NoResponse);

    let mut future = bob();
    future.response_required_by = Some(at(10_000));
    assert!(!future.auto_expire(at(9_000)));
    // The deadline itself is not yet "exceeded".
    assert!(!future.auto_expire(at(10_000)));
    assert_eq!(future.status, AttendeeStatus::NoResponse);
}

#[test]
fn auto_expire_never_touches_responded_attendees() {
    let mut attendee = bob();
    attendee.response_required_by = Some(at(10_000));
    attendee
        .respond(AttendeeStatus::Tentative, None, at(9_500))
        .unwrap();

    assert!(!attendee.auto_expire(at(20_000)));
    assert_eq!(attendee.status, AttendeeStatus::Tentative);
    assert_eq!(attendee.response_at, Some(at(9_500)));
}

#[test]
fn add_attendee_rejects_duplicate_email() {
    let mut event = sample_event();
    event.add_attendee(bob()).unwrap();

    let mut twin = bob();
    twin.name = "Robert".into();
    let err = event.add_attendee(twin).unwrap_err();

    assert_eq!(
        err,
        EventValidationError::DuplicateAttendeeEmail("bob@example.com".into())
    );
    assert_eq!(event.attendees.len(), 1);
}

#[test]
fn validate_rejects_empty_title() {
    let mut event = sample_event();
    event.title = "   ".into();
    assert_eq!(event.validate(), Err(EventValidationError::EmptyTitle));
}

#[test]
fn validate_rejects_end_not_after_start() {
    let mut event = sample_event();
    event.end_time = event.start_time;
    assert_eq!(event.validate(), Err(EventValidationError::EndNotAfterStart));

    event.end_time = event.start_time - Duration::hours(1);
    assert_eq!(event.validate(), Err(EventValidationError::EndNotAfterStart));
}

#[test]
fn validate_rejects_response_state_mismatch() {
    let mut event = sample_event();
    let mut attendee = bob();
    attendee.response_at = Some(at(5_000));
    event.attendees.push(attendee);

    assert_eq!(
        event.validate(),
        Err(EventValidationError::ResponseStateMismatch(
            "bob@example.com".into()
        ))
    );
}

#[test]
fn event_serializes_with_stable_field_names() {
    let mut event = sample_event();
    event.add_attendee(bob()).unwrap();

    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["created_by"], "carol@example.com");
    assert_eq!(json["attendees"][0]["status"], "no-response");
    assert_eq!(json["attendees"][0]["role"], "required");
    assert_eq!(json["attendees"][0]["invited_by"], "carol@example.com");

    // `description` is always present, null when unset.
    assert_eq!(json.get("description"), Some(&serde_json::Value::Null));

    // The other absent optionals are omitted from the payload.
    assert!(json["attendees"][0].get("response_at").is_none());
    assert!(json["attendees"][0].get("note").is_none());
}

fn sample_event() -> Event {
    Event::draft(
        "School play",
        at(100_000),
        at(200_000),
        "carol@example.com",
    )
}
