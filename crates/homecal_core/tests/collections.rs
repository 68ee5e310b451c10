use homecal_core::db::open_db_in_memory;
use homecal_core::{
    CollectionRepository, CollectionValidationError, Event, EventCollection, EventRepository,
    RepoError, SqliteCollectionRepository, SqliteEventRepository,
};
use rusqlite::Connection;

#[test]
fn create_and_get_roundtrip() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteCollectionRepository::try_new(&mut conn).unwrap();

    let mut draft = EventCollection::draft("Emma's school events", "#ffaa00", "carol@example.com");
    draft.description = Some("everything from the newsletter".into());
    draft.icon = Some("🎒".into());

    let stored = repo.create_collection(&draft).unwrap();
    assert!(stored.id > 0);

    let loaded = repo.get_collection(stored.id).unwrap();
    assert_eq!(loaded, stored);
    assert_eq!(loaded.name, "Emma's school events");
    assert_eq!(loaded.icon.as_deref(), Some("🎒"));
    assert!(loaded.event_ids.is_empty());
    assert!(loaded.shares.is_empty());
}

#[test]
fn collection_description_serializes_as_null_when_unset() {
    let collection = EventCollection::draft("School", "#ffaa00", "carol@example.com");
    let json = serde_json::to_value(&collection).unwrap();

    assert_eq!(json.get("description"), Some(&serde_json::Value::Null));
    // `icon` stays omitted when unset.
    assert!(json.get("icon").is_none());
}

#[test]
fn create_rejects_empty_name() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteCollectionRepository::try_new(&mut conn).unwrap();

    let err = repo
        .create_collection(&EventCollection::draft("  ", "#ffaa00", "carol@example.com"))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::CollectionValidation(CollectionValidationError::EmptyName)
    ));
}

#[test]
fn update_rewrites_scalar_fields_and_advances_updated_at() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteCollectionRepository::try_new(&mut conn).unwrap();

    let mut stored = repo
        .create_collection(&EventCollection::draft("Sports", "#00ff00", "carol@example.com"))
        .unwrap();

    std::thread::sleep(std::time::Duration::from_millis(5));
    stored.name = "Weekend sports".into();
    stored.color = "#0000ff".into();
    let updated = repo.update_collection(&stored).unwrap();
    assert!(updated.updated_at > stored.updated_at);

    let loaded = repo.get_collection(stored.id).unwrap();
    assert_eq!(loaded.name, "Weekend sports");
    assert_eq!(loaded.color, "#0000ff");
    assert_eq!(loaded.created_at, stored.created_at);
}

#[test]
fn update_return_value_reflects_stored_created_fields() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteCollectionRepository::try_new(&mut conn).unwrap();

    let stored = repo
        .create_collection(&EventCollection::draft("Sports", "#00ff00", "carol@example.com"))
        .unwrap();

    // A caller tampering with immutable fields in memory gets the stored
    // values back, not its own.
    let mut tampered = stored.clone();
    tampered.created_by = "mallory@example.com".into();
    tampered.created_at = chrono::DateTime::from_timestamp_millis(999_999).unwrap();

    let updated = repo.update_collection(&tampered).unwrap();
    assert_eq!(updated.created_by, "carol@example.com");
    assert_eq!(updated.created_at, stored.created_at);
    assert_eq!(updated, repo.get_collection(stored.id).unwrap());
}

#[test]
fn update_unknown_collection_returns_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteCollectionRepository::try_new(&mut conn).unwrap();

    let mut ghost = EventCollection::draft("Ghost", "#000000", "carol@example.com");
    ghost.id = 31;
    let err = repo.update_collection(&ghost).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: "collection",
            id: 31
        }
    ));
}

#[test]
fn membership_is_a_set_and_shows_up_on_both_sides() {
    let mut conn = open_db_in_memory().unwrap();
    let event = create_event(&mut conn, "Recital");

    let collection_id = {
        let mut repo = SqliteCollectionRepository::try_new(&mut conn).unwrap();
        let collection = repo
            .create_collection(&EventCollection::draft("School", "#ffaa00", "carol@example.com"))
            .unwrap();

        repo.add_event_to_collection(collection.id, event.id).unwrap();
        // Re-adding is a no-op.
        repo.add_event_to_collection(collection.id, event.id).unwrap();

        let loaded = repo.get_collection(collection.id).unwrap();
        assert_eq!(loaded.event_ids, vec![event.id]);
        collection.id
    };

    {
        let repo = SqliteEventRepository::try_new(&mut conn).unwrap();
        let loaded = repo.get_event(event.id).unwrap();
        assert_eq!(loaded.collection_ids, vec![collection_id]);
    }

    {
        let mut repo = SqliteCollectionRepository::try_new(&mut conn).unwrap();
        repo.remove_event_from_collection(collection_id, event.id)
            .unwrap();
        // Removing again is a no-op.
        repo.remove_event_from_collection(collection_id, event.id)
            .unwrap();
        let loaded = repo.get_collection(collection_id).unwrap();
        assert!(loaded.event_ids.is_empty());
    }
}

#[test]
fn adding_unknown_event_or_collection_is_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let event = create_event(&mut conn, "Recital");

    let mut repo = SqliteCollectionRepository::try_new(&mut conn).unwrap();
    let err = repo.add_event_to_collection(55, event.id).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: "collection",
            id: 55
        }
    ));

    let collection = repo
        .create_collection(&EventCollection::draft("School", "#ffaa00", "carol@example.com"))
        .unwrap();
    let err = repo.add_event_to_collection(collection.id, 77).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { entity: "event", id: 77 }));
}

#[test]
fn deleting_an_event_removes_it_from_collections() {
    let mut conn = open_db_in_memory().unwrap();
    let event = create_event(&mut conn, "Recital");

    let collection_id = {
        let mut repo = SqliteCollectionRepository::try_new(&mut conn).unwrap();
        let collection = repo
            .create_collection(&EventCollection::draft("School", "#ffaa00", "carol@example.com"))
            .unwrap();
        repo.add_event_to_collection(collection.id, event.id).unwrap();
        collection.id
    };

    {
        let mut repo = SqliteEventRepository::try_new(&mut conn).unwrap();
        repo.delete_event(event.id).unwrap();
    }

    let repo = SqliteCollectionRepository::try_new(&mut conn).unwrap();
    let loaded = repo.get_collection(collection_id).unwrap();
    assert!(loaded.event_ids.is_empty());
}

#[test]
fn delete_unknown_collection_returns_not_found() {
    let mut conn = open_db_in_memory().unwrap();
    let mut repo = SqliteCollectionRepository::try_new(&mut conn).unwrap();

    let err = repo.delete_collection(12).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: "collection",
            id: 12
        }
    ));
}

fn create_event(conn: &mut Connection, title: &str) -> Event {
    let mut repo = SqliteEventRepository::try_new(conn).unwrap();
    let start = chrono::DateTime::from_timestamp_millis(0).unwrap();
    let end = chrono::DateTime::from_timestamp_millis(3_600_000).unwrap();
    repo.create_event(&Event::draft(title, start, end, "carol@example.com"))
        .unwrap()
}
