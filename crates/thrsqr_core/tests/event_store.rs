use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use thrsqr_core::db::open_db_in_memory;
use thrsqr_core::{
    Collection, Event, EventStore, RecurrenceDescriptor, RepoError, SqliteEventStore, TimeOfDay,
};
use uuid::Uuid;

fn instant(d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, d, h, mi, 0).unwrap()
}

fn insert_event(store: &SqliteEventStore<'_>, last_update: DateTime<Utc>) -> Event {
    let event_id = store.generate_id(Collection::Events).unwrap();
    let event = Event::new(
        event_id,
        "Friday Night Run",
        "Meet at the fountain",
        RecurrenceDescriptor::new(5, TimeOfDay::new(18, 30), 60),
        last_update,
    );
    store.new_event(&event).unwrap();
    event
}

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEventStore::try_new(&conn).unwrap();

    let event = insert_event(&store, instant(10, 12, 0));
    let loaded = store.get_event(event.event_id).unwrap().unwrap();

    assert_eq!(loaded, event);
    assert!(store.if_exists(event.event_id, Collection::Events).unwrap());
    assert!(!store.if_exists(event.event_id, Collection::Participants).unwrap());
    assert!(store.get_event(Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn update_event_keeps_last_update() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEventStore::try_new(&conn).unwrap();
    let event = insert_event(&store, instant(10, 12, 0));

    let recurrence = RecurrenceDescriptor::new(2, TimeOfDay::new(7, 0), -300);
    store
        .update_event(event.event_id, "Tuesday Swim", "Lane 3", &recurrence)
        .unwrap();

    let loaded = store.get_event(event.event_id).unwrap().unwrap();
    assert_eq!(loaded.title, "Tuesday Swim");
    assert_eq!(loaded.info, "Lane 3");
    assert_eq!(loaded.recurrence, recurrence);
    assert_eq!(loaded.last_update, event.last_update);

    let missing = store
        .update_event(Uuid::new_v4(), "x", "", &recurrence)
        .unwrap_err();
    assert!(matches!(missing, RepoError::EventNotFound(_)));
}

#[test]
fn update_responses_overwrites_and_touches_last_update() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEventStore::try_new(&conn).unwrap();
    let event = insert_event(&store, instant(10, 12, 0));
    let participant = store.new_participant("kim").unwrap();

    store
        .update_responses(event.event_id, "kim", true, participant, Some("on time"), instant(11, 9, 0))
        .unwrap();
    store
        .update_responses(event.event_id, "Kim", false, participant, None, instant(11, 10, 0))
        .unwrap();

    let responses = store.get_responses(event.event_id).unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].participant_id, participant);
    assert_eq!(responses[0].display_name, "Kim");
    assert!(!responses[0].attending);
    assert_eq!(responses[0].comment, None);
    assert_eq!(responses[0].updated_at, instant(11, 10, 0));

    let loaded = store.get_event(event.event_id).unwrap().unwrap();
    assert_eq!(loaded.last_update, instant(11, 10, 0));
}

#[test]
fn responses_keep_first_contact_order() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEventStore::try_new(&conn).unwrap();
    let event = insert_event(&store, instant(10, 12, 0));
    let first = store.new_participant("ana").unwrap();
    let second = store.new_participant("bo").unwrap();

    store
        .update_responses(event.event_id, "ana", true, first, None, instant(11, 9, 0))
        .unwrap();
    store
        .update_responses(event.event_id, "bo", true, second, None, instant(11, 9, 5))
        .unwrap();
    store
        .update_responses(event.event_id, "ana", false, first, None, instant(11, 9, 10))
        .unwrap();

    let names: Vec<_> = store
        .get_responses(event.event_id)
        .unwrap()
        .into_iter()
        .map(|response| response.display_name)
        .collect();
    assert_eq!(names, vec!["ana", "bo"]);
}

#[test]
fn update_responses_on_missing_event_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEventStore::try_new(&conn).unwrap();
    let participant = store.new_participant("kim").unwrap();

    let err = store
        .update_responses(Uuid::new_v4(), "kim", true, participant, None, instant(11, 9, 0))
        .unwrap_err();
    assert!(matches!(err, RepoError::EventNotFound(_)));
}

#[test]
fn update_responses_registers_caller_supplied_participant() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEventStore::try_new(&conn).unwrap();
    let event = insert_event(&store, instant(10, 12, 0));
    let participant = Uuid::new_v4();
    assert!(!store.if_exists(participant, Collection::Participants).unwrap());

    store
        .update_responses(event.event_id, "ana", true, participant, None, instant(11, 9, 0))
        .unwrap();
    assert!(store.if_exists(participant, Collection::Participants).unwrap());

    // A later write under another name keeps the participant row as is.
    store
        .update_responses(event.event_id, "Ana B.", false, participant, None, instant(11, 9, 5))
        .unwrap();
    let registered: String = conn
        .query_row(
            "SELECT display_name FROM participants WHERE participant_id = ?1;",
            [participant.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(registered, "ana");

    let responses = store.get_responses(event.event_id).unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].display_name, "Ana B.");
}

#[test]
fn update_responses_on_missing_event_registers_nothing() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEventStore::try_new(&conn).unwrap();
    let participant = Uuid::new_v4();

    let err = store
        .update_responses(Uuid::new_v4(), "ana", true, participant, None, instant(11, 9, 0))
        .unwrap_err();
    assert!(matches!(err, RepoError::EventNotFound(_)));
    assert!(!store.if_exists(participant, Collection::Participants).unwrap());
}

#[test]
fn remove_response_deletes_once_then_reports_not_found() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEventStore::try_new(&conn).unwrap();
    let event = insert_event(&store, instant(10, 12, 0));
    let participant = store.new_participant("kim").unwrap();
    store
        .update_responses(event.event_id, "kim", true, participant, None, instant(11, 9, 0))
        .unwrap();

    store
        .remove_response(event.event_id, participant, instant(11, 11, 0))
        .unwrap();
    assert!(store.get_responses(event.event_id).unwrap().is_empty());
    assert_eq!(
        store.get_event(event.event_id).unwrap().unwrap().last_update,
        instant(11, 11, 0)
    );

    let err = store
        .remove_response(event.event_id, participant, instant(11, 12, 0))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::ResponseNotFound { participant_id, .. } if participant_id == participant
    ));
    assert_eq!(
        store.get_event(event.event_id).unwrap().unwrap().last_update,
        instant(11, 11, 0),
        "failed removal must not touch last_update"
    );
}

#[test]
fn conditional_reset_only_applies_to_expected_watermark() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEventStore::try_new(&conn).unwrap();
    let event = insert_event(&store, instant(10, 12, 0));
    let participant = store.new_participant("kim").unwrap();
    store
        .update_responses(event.event_id, "kim", true, participant, None, instant(10, 13, 0))
        .unwrap();

    let stale_watermark = instant(10, 12, 0);
    let won = store
        .reset_responses_if_unchanged(event.event_id, stale_watermark, instant(17, 20, 0))
        .unwrap();
    assert!(!won);
    assert_eq!(store.get_responses(event.event_id).unwrap().len(), 1);

    let current = instant(10, 13, 0);
    let won = store
        .reset_responses_if_unchanged(event.event_id, current, instant(17, 20, 0))
        .unwrap();
    assert!(won);
    assert!(store.get_responses(event.event_id).unwrap().is_empty());
    assert_eq!(
        store.get_event(event.event_id).unwrap().unwrap().last_update,
        instant(17, 20, 0)
    );

    let missing = store
        .reset_responses_if_unchanged(Uuid::new_v4(), current, instant(17, 20, 0))
        .unwrap_err();
    assert!(matches!(missing, RepoError::EventNotFound(_)));
}

#[test]
fn unconditional_reset_clears_only_target_event() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEventStore::try_new(&conn).unwrap();
    let target = insert_event(&store, instant(10, 12, 0));
    let other = insert_event(&store, instant(10, 12, 0));
    let participant = store.new_participant("kim").unwrap();
    for event in [&target, &other] {
        store
            .update_responses(event.event_id, "kim", true, participant, None, instant(10, 13, 0))
            .unwrap();
    }

    store
        .reset_responses(target.event_id, instant(17, 20, 0))
        .unwrap();

    assert!(store.get_responses(target.event_id).unwrap().is_empty());
    assert_eq!(store.get_responses(other.event_id).unwrap().len(), 1);
    assert!(matches!(
        store.reset_responses(Uuid::new_v4(), instant(17, 20, 0)),
        Err(RepoError::EventNotFound(_))
    ));
}

#[test]
fn sub_millisecond_precision_is_dropped_on_persist() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteEventStore::try_new(&conn).unwrap();
    let precise = instant(10, 12, 0) + TimeDelta::microseconds(1_500);
    let event = insert_event(&store, precise);

    let loaded = store.get_event(event.event_id).unwrap().unwrap();
    assert_eq!(loaded.last_update, instant(10, 12, 0) + TimeDelta::milliseconds(1));
}
