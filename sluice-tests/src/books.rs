use crate::serial_primary_key;
use sluice::{Connection, Driver, Entity, SluiceError};
use time::PrimitiveDateTime;

#[derive(Debug, Default, Clone, PartialEq, Entity)]
#[sluice(name = "sluice_books")]
struct Book {
    #[sluice(primary_key)]
    id: Option<i64>,
    title: String,
    author: String,
    published: Option<i32>,
    #[sluice(default = "CURRENT_TIMESTAMP")]
    added: Option<PrimitiveDateTime>,
    #[sluice(skip)]
    shelf: String,
}

pub fn books<D: Driver>(connection: &Connection<D>) {
    // Setup
    connection
        .execute("DROP TABLE IF EXISTS sluice_books", &[])
        .expect("Failed to drop sluice_books table");
    connection
        .execute(
            &format!(
                "CREATE TABLE sluice_books (id {}, title VARCHAR(128) NOT NULL, author VARCHAR(128) NOT NULL, published INTEGER, added TIMESTAMP DEFAULT CURRENT_TIMESTAMP)",
                serial_primary_key::<D>()
            ),
            &[],
        )
        .expect("Failed to create sluice_books table");

    // Insert
    let mut dune = Book {
        title: "Dune".into(),
        author: "Frank Herbert".into(),
        published: Some(1965),
        shelf: "A1".into(),
        ..Default::default()
    };
    connection
        .entity_insert(&mut dune)
        .expect("Failed to insert Dune");
    let id = dune.id.expect("The generated id is read back");
    assert!(dune.added.is_some(), "Default column is read back");
    assert_eq!(dune.shelf, "A1");
    let mut neuromancer = Book {
        title: "Neuromancer".into(),
        author: "William Gibson".into(),
        ..Default::default()
    };
    connection
        .entity_insert(&mut neuromancer)
        .expect("Failed to insert Neuromancer");
    assert_ne!(neuromancer.id, Some(id));
    assert_eq!(neuromancer.published, None);

    // Select
    let mut found = Book {
        id: Some(id),
        ..Default::default()
    };
    connection
        .entity_select(&mut found)
        .expect("Failed to select Dune");
    assert_eq!(found.title, "Dune");
    assert_eq!(found.published, Some(1965));
    assert_eq!(found.added, dune.added);

    // Update
    found.title = "Dune Messiah".into();
    found.published = Some(1969);
    connection
        .entity_update(&mut found)
        .expect("Failed to update Dune");
    assert!(!connection.in_transaction());
    let mut reloaded = Book {
        id: Some(id),
        ..Default::default()
    };
    connection
        .entity_select(&mut reloaded)
        .expect("Failed to select Dune Messiah");
    assert_eq!(reloaded.title, "Dune Messiah");
    assert_eq!(reloaded.published, Some(1969));
    let mut ghost = Book {
        id: Some(-1),
        title: "Ghost".into(),
        ..Default::default()
    };
    let error = connection.entity_update(&mut ghost).unwrap_err();
    assert!(matches!(
        SluiceError::of(&error),
        Some(SluiceError::NoRowsUpdated { .. })
    ));
    assert!(!connection.in_transaction());

    // Delete
    connection
        .entity_delete(&reloaded)
        .expect("Failed to delete Dune Messiah");
    let error = connection.entity_delete(&reloaded).unwrap_err();
    assert!(matches!(
        SluiceError::of(&error),
        Some(SluiceError::UnexpectedRowCount { rows: 0, .. })
    ));
    let error = connection.entity_select(&mut reloaded).unwrap_err();
    assert!(matches!(
        SluiceError::of(&error),
        Some(SluiceError::EntityNotFound(..))
    ));
}
