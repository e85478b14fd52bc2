use std::sync::Arc;
use std::time::Duration;

use sqlite_orm::{
    Database, DatabaseConfig, Error, FieldType, Model, ModelDef, RecordState, Registry, Result,
    Value,
};
use tempfile::TempDir;

fn person_def() -> ModelDef {
    ModelDef::new("Person")
        .field("name", FieldType::Text)
        .field("age", FieldType::optional(FieldType::Integer))
}

// Helper function to create an in-memory database with the person table
fn create_test_db() -> Result<(Database, Arc<Model>)> {
    let db = Database::open_in_memory()?;
    let mut registry = Registry::new();
    let person = registry.register(person_def())?;
    registry.create_tables(&db, false)?;
    Ok((db, person))
}

// Helper function to create a file-based database inside a temporary directory
fn create_temp_db() -> anyhow::Result<(Database, DatabaseConfig, TempDir)> {
    let dir = tempfile::tempdir()?;
    let config = DatabaseConfig::new(dir.path().join("records.db"));
    let db = Database::open(&config)?;
    Ok((db, config, dir))
}

fn row_count(db: &Database, table: &str) -> rusqlite::Result<i64> {
    db.connection()
        .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
}

#[test]
fn insert_with_null_optional_field() -> Result<()> {
    let (db, person) = create_test_db()?;

    let mut record = person
        .new_record()
        .with("name", "a")?
        .with("age", Option::<i64>::None)?;
    assert_eq!(record.save(&db)?, 1);
    assert_eq!(record.state(), RecordState::Saved);

    let (id, name, age): (i64, String, Option<i64>) = db.connection().query_row(
        "SELECT id, name, age FROM person",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;
    assert_eq!((id, name.as_str(), age), (1, "a", None));

    let found = person.find(&db, 1)?;
    assert_eq!(found.get("age"), Some(&Value::Null));
    assert_eq!(found.get("name"), Some(&Value::from("a")));
    Ok(())
}

#[test]
fn omitted_optional_field_is_stored_as_null() -> Result<()> {
    let (db, person) = create_test_db()?;
    let id = person.new_record().with("name", "b")?.save(&db)?;
    assert_eq!(person.find(&db, id)?.get("age"), Some(&Value::Null));
    Ok(())
}

#[test]
fn missing_required_field_violates_constraint() -> Result<()> {
    let (db, person) = create_test_db()?;

    let err = person.new_record().with("age", 40)?.save(&db).unwrap_err();
    assert!(err.is_constraint_violation(), "unexpected error: {err}");

    let err = person
        .new_record()
        .with("name", Value::Null)?
        .save(&db)
        .unwrap_err();
    assert!(err.is_constraint_violation(), "unexpected error: {err}");

    assert_eq!(row_count(&db, "person")?, 0);
    Ok(())
}

#[test]
fn round_trip_every_kind() -> Result<()> {
    let db = Database::open_in_memory()?;
    let mut registry = Registry::new();
    let sample = registry.register(
        ModelDef::new("SampleRow")
            .field("count", FieldType::Integer)
            .field("ratio", FieldType::Real)
            .field("label", FieldType::Text)
            .field("payload", FieldType::Blob)
            .field("active", FieldType::Boolean)
            .field("note", FieldType::optional(FieldType::Text)),
    )?;
    assert_eq!(sample.table(), "sample_row");
    registry.create_tables(&db, false)?;

    let mut record = sample
        .new_record()
        .with("count", 42)?
        .with("ratio", 0.25)?
        .with("label", "forty-two")?
        .with("payload", vec![0u8, 1, 2, 255])?
        .with("active", true)?
        .with("note", Some("hello"))?;
    let id = record.save(&db)?;

    let found = sample.find(&db, id)?;
    assert_eq!(found, record);
    assert_eq!(found.get("active"), Some(&Value::Boolean(true)));
    assert_eq!(found.get("payload"), Some(&Value::Blob(vec![0, 1, 2, 255])));
    Ok(())
}

#[test]
fn save_on_saved_record_updates_in_place() -> Result<()> {
    let (db, person) = create_test_db()?;
    let id = person
        .new_record()
        .with("name", "Jo")?
        .with("age", 30)?
        .save(&db)?;

    let mut found = person.find(&db, id)?;
    found.set("age", 31)?;
    assert_eq!(found.save(&db)?, id);

    let again = person.find(&db, id)?;
    assert_eq!(again.get("age"), Some(&Value::Integer(31)));
    assert_eq!(row_count(&db, "person")?, 1);
    Ok(())
}

#[test]
fn delete_removes_row_and_is_terminal() -> Result<()> {
    let (db, person) = create_test_db()?;
    let mut record = person.new_record().with("name", "gone")?;
    let id = record.save(&db)?;

    record.delete(&db)?;
    assert_eq!(record.state(), RecordState::Deleted);
    assert_eq!(record.id(), Some(id));

    match person.find(&db, id) {
        Err(Error::NotFound { table, field }) => {
            assert_eq!(table, "person");
            assert_eq!(field, "id");
        }
        other => panic!("expected not found, got {other:?}"),
    }

    assert!(matches!(
        record.save(&db),
        Err(Error::InvalidState {
            state: RecordState::Deleted,
            ..
        })
    ));
    assert!(record.delete(&db).is_err());
    assert_eq!(row_count(&db, "person")?, 0);
    Ok(())
}

#[test]
fn delete_requires_a_saved_record() -> Result<()> {
    let (db, person) = create_test_db()?;
    let mut record = person.new_record().with("name", "never saved")?;
    assert!(matches!(
        record.delete(&db),
        Err(Error::InvalidState {
            state: RecordState::Unsaved,
            ..
        })
    ));
    Ok(())
}

#[test]
fn find_by_and_delete_by_field() -> Result<()> {
    let (db, person) = create_test_db()?;
    for (name, age) in [("Ann", 20), ("Bo", 20), ("Cy", 45)] {
        person
            .new_record()
            .with("name", name)?
            .with("age", age)?
            .save(&db)?;
    }

    let cy = person.find_by(&db, "name", "Cy")?;
    assert_eq!(cy.get("age"), Some(&Value::Integer(45)));

    assert!(matches!(
        person.find_by(&db, "name", "Dee"),
        Err(Error::NotFound { .. })
    ));
    assert!(matches!(
        person.find_by(&db, "email", "x"),
        Err(Error::UnknownField { .. })
    ));

    person.delete_by(&db, "age", 20)?;
    let left: Vec<_> = person.all(&db)?.collect::<Result<_>>()?;
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].get("name"), Some(&Value::from("Cy")));
    Ok(())
}

#[test]
fn all_over_empty_and_filled_tables() -> Result<()> {
    let (db, person) = create_test_db()?;
    assert_eq!(person.all(&db)?.count(), 0);

    let names = ["a", "b", "c", "d"];
    for name in names {
        person.new_record().with("name", name)?.save(&db)?;
    }

    let mut records: Vec<_> = person.all(&db)?.collect::<Result<_>>()?;
    records.sort_by_key(|r| r.id());
    assert_eq!(records.len(), names.len());
    for (record, name) in records.iter().zip(names) {
        assert_eq!(record.state(), RecordState::Saved);
        assert_eq!(record.get("name"), Some(&Value::from(name)));
        assert_eq!(record.get("age"), Some(&Value::Null));
    }
    Ok(())
}

#[test]
fn recreate_table_drops_rows() -> Result<()> {
    let (db, person) = create_test_db()?;
    person.new_record().with("name", "x")?.save(&db)?;
    person.create_table(&db, true)?;
    assert_eq!(person.all(&db)?.count(), 0);

    person.drop_table(&db)?;
    assert!(person.all(&db).unwrap_err().to_string().contains("no such table"));
    Ok(())
}

#[test]
fn file_database_survives_reopen() -> anyhow::Result<()> {
    let (db, config, _dir) = create_temp_db()?;
    let mut registry = Registry::new();
    let person = registry.register(person_def())?;
    registry.create_tables(&db, false)?;
    let id = person.new_record().with("name", "kept")?.save(&db)?;
    db.close()?;

    let db = Database::open(&config)?;
    assert_eq!(db.path(), Some(config.path.as_path()));
    let journal: String = db
        .connection()
        .query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
    assert_eq!(journal, "wal");

    let mut registry = Registry::new();
    let person = registry.register(person_def())?;
    let found = person.find(&db, id)?;
    assert_eq!(found.get("name"), Some(&Value::from("kept")));
    Ok(())
}

#[test]
fn keyword_names_round_trip() -> Result<()> {
    let db = Database::open_in_memory()?;
    let mut registry = Registry::new();
    let order = registry.register(
        ModelDef::new("Order")
            .field("total", FieldType::Integer)
            .field("group", FieldType::Text),
    )?;
    assert_eq!(order.table(), "order");
    registry.create_tables(&db, false)?;

    let id = order
        .new_record()
        .with("total", 42)?
        .with("group", "wholesale")?
        .save(&db)?;
    let found = order.find_by(&db, "group", "wholesale")?;
    assert_eq!(found.id(), Some(id));
    assert_eq!(found.get("total"), Some(&Value::Integer(42)));

    order.delete_by(&db, "group", "wholesale")?;
    assert_eq!(order.all(&db)?.count(), 0);
    registry.create_tables(&db, true)?;
    Ok(())
}

#[test]
fn contention_surfaces_as_busy() -> anyhow::Result<()> {
    let (writer, config, _dir) = create_temp_db()?;
    let mut registry = Registry::new();
    let person = registry.register(person_def())?;
    registry.create_tables(&writer, false)?;

    let contender = Database::open(&config)?;
    contender.connection().busy_timeout(Duration::from_millis(50))?;

    writer.connection().execute_batch("BEGIN IMMEDIATE")?;
    let mut record = person.new_record().with("name", "late")?;
    let err = record.save(&contender).unwrap_err();
    assert!(err.is_busy(), "unexpected error: {err}");
    assert!(!err.is_constraint_violation());
    assert_eq!(record.state(), RecordState::Unsaved);

    writer.connection().execute_batch("COMMIT")?;
    let id = record.save(&contender)?;
    assert_eq!(person.find(&writer, id)?.get("name"), Some(&Value::from("late")));
    Ok(())
}
