use chrono::{DateTime, Utc};
use homecal_core::db::open_db_in_memory;
use homecal_core::{
    Attendee, AttendeeRole, AttendeeStatus, Event, EventService, EventValidationError, RepoError,
    SqliteEventRepository,
};
use rusqlite::Connection;

fn at(epoch_ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(epoch_ms).unwrap()
}

#[test]
fn respond_to_invitation_persists_the_response() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = event_service(&mut conn);

    let mut draft = Event::draft("Swim class", at(0), at(3_600_000), "carol@example.com");
    draft
        .add_attendee(Attendee::invite(
            "Bob",
            "bob@example.com",
            AttendeeRole::Optional,
            "carol@example.com",
            at(0),
        ))
        .unwrap();
    let stored = service.create_event(&draft).unwrap();

    let updated = service
        .respond_to_invitation(
            stored.id,
            "bob@example.com",
            AttendeeStatus::Tentative,
            Some("depends on work".into()),
            at(9_000),
        )
        .unwrap();

    let bob = &updated.attendees[0];
    assert_eq!(bob.status, AttendeeStatus::Tentative);
    assert_eq!(bob.response_at, Some(at(9_000)));
    assert_eq!(bob.note.as_deref(), Some("depends on work"));

    let reloaded = service.get_event(stored.id).unwrap();
    assert_eq!(reloaded.attendees[0].status, AttendeeStatus::Tentative);
}

#[test]
fn respond_to_invitation_rejects_unknown_attendee() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = event_service(&mut conn);

    let stored = service
        .create_event(&Event::draft("Swim class", at(0), at(3_600_000), "carol@example.com"))
        .unwrap();

    let err = service
        .respond_to_invitation(
            stored.id,
            "stranger@example.com",
            AttendeeStatus::Accepted,
            None,
            at(9_000),
        )
        .unwrap_err();

    assert!(matches!(
        err,
        RepoError::Validation(EventValidationError::UnknownAttendee(_))
    ));
}

#[test]
fn respond_to_invitation_rejects_no_response_target() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = event_service(&mut conn);

    let mut draft = Event::draft("Swim class", at(0), at(3_600_000), "carol@example.com");
    draft
        .add_attendee(Attendee::invite(
            "Bob",
            "bob@example.com",
            AttendeeRole::Required,
            "carol@example.com",
            at(0),
        ))
        .unwrap();
    let stored = service.create_event(&draft).unwrap();

    let err = service
        .respond_to_invitation(
            stored.id,
            "bob@example.com",
            AttendeeStatus::NoResponse,
            None,
            at(9_000),
        )
        .unwrap_err();

    assert!(matches!(
        err,
        RepoError::Validation(EventValidationError::InvalidResponseTarget)
    ));

    // Prior state is untouched.
    let reloaded = service.get_event(stored.id).unwrap();
    assert_eq!(reloaded.attendees[0].status, AttendeeStatus::NoResponse);
    assert_eq!(reloaded.attendees[0].response_at, None);
}

#[test]
fn respond_to_invitation_on_unknown_event_is_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = event_service(&mut conn);

    let err = service
        .respond_to_invitation(404, "bob@example.com", AttendeeStatus::Accepted, None, at(0))
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "event", id: 404 }));
}

fn event_service(conn: &mut Connection) -> EventService<SqliteEventRepository<'_>> {
    EventService::new(SqliteEventRepository::try_new(conn).unwrap())
}
