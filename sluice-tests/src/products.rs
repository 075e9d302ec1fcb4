use indoc::indoc;
use rust_decimal::Decimal;
use sluice::{AsValue, Connection, Driver, SluiceError, Value, params};

pub fn products<D: Driver>(connection: &Connection<D>) {
    // Setup
    connection
        .execute("DROP TABLE IF EXISTS sluice_products", &[])
        .expect("Failed to drop sluice_products table");
    connection
        .execute(
            indoc! {"
                CREATE TABLE sluice_products (
                    id INTEGER PRIMARY KEY,
                    name VARCHAR(64) NOT NULL,
                    price DOUBLE PRECISION,
                    weight DECIMAL(8, 3),
                    available BOOLEAN NOT NULL
                )
            "},
            &[],
        )
        .expect("Failed to create sluice_products table");

    // Insert
    let rows = connection
        .execute(
            "INSERT INTO sluice_products (id, name, price, weight, available) VALUES (?, ?, ?, ?, ?)",
            &params![1i32, "Hammer", 12.5f64, Decimal::new(1250, 3), true],
        )
        .expect("Failed to insert Hammer");
    assert_eq!(rows, 1);
    connection
        .execute(
            "INSERT INTO sluice_products (id, name, price, weight, available) VALUES (?, ?, ?, ?, ?)",
            &params![2i32, "Saw's blade", 20.0f64, None::<Decimal>, false],
        )
        .expect("Failed to insert Saw's blade");
    connection
        .insert(
            "sluice_products",
            &[
                ("id", 3i32.into()),
                ("name", "Drill".into()),
                ("price", 99.9f64.into()),
                ("weight", Value::Decimal(None)),
                ("available", true.into()),
            ],
            false,
        )
        .expect("Failed to insert Drill");

    // Select
    let mut statement = connection
        .query(
            "SELECT id, name, price, available FROM sluice_products WHERE price > ? ORDER BY id",
            &params![15i32],
        )
        .expect("Failed to select the products");
    let rows = statement.fetch_row_set().expect("Failed to fetch the products");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get::<i32>("id").unwrap(), 2);
    assert_eq!(rows[0].get::<String>("name").unwrap(), "Saw's blade");
    assert!(!rows[0].get::<bool>("available").unwrap());
    assert_eq!(rows[1].get::<f64>("price").unwrap(), 99.9);
    assert!(statement.fetch_row().unwrap().is_none());

    // Named binds
    let mut statement = connection.prepare(
        "SELECT name, weight FROM sluice_products WHERE name = :name AND available = :available",
    );
    statement
        .bind("name", "Hammer")
        .bind("available", true)
        .execute(&[])
        .expect("Failed to select by name");
    let row = statement
        .fetch_row()
        .expect("Failed to fetch Hammer")
        .expect("Hammer exists");
    assert_eq!(row.get::<Decimal>("weight").unwrap(), Decimal::new(1250, 3));

    // Lists
    let mut statement =
        connection.prepare("SELECT id FROM sluice_products WHERE id IN (:ids) ORDER BY id");
    statement
        .bind("ids", vec![1i32, 3])
        .execute(&[])
        .expect("Failed to select a list of ids");
    let ids = statement
        .fetch_row_set()
        .expect("Failed to fetch the ids")
        .iter()
        .map(|v| v.get::<i64>("id").unwrap())
        .collect::<Vec<_>>();
    assert_eq!(ids, [1, 3]);

    // Scalars
    let mut statement = connection
        .query("SELECT COUNT(*), MAX(price) FROM sluice_products", &[])
        .expect("Failed to count the products");
    let count = i64::try_from_value(statement.fetch().unwrap().expect("Has a count")).unwrap();
    assert_eq!(count, 3);
    let max = f64::try_from_value(statement.fetch().unwrap().expect("Has a max")).unwrap();
    assert_eq!(max, 99.9);
    assert_eq!(statement.fetch().unwrap(), None);

    // Keyed
    let by_name = connection
        .query("SELECT name, price FROM sluice_products", &[])
        .expect("Failed to select the products")
        .fetch_row_set_by("name")
        .expect("Names are unique");
    assert_eq!(by_name.len(), 3);
    assert!(by_name.keys().any(|v| v.as_text().as_deref() == Some("Drill")));
    let error = connection
        .query("SELECT available FROM sluice_products", &[])
        .expect("Failed to select the products")
        .fetch_row_set_by("available")
        .unwrap_err();
    assert!(matches!(
        SluiceError::of(&error),
        Some(SluiceError::DuplicateKey { .. })
    ));

    // Update and delete
    let updated = connection
        .update(
            "sluice_products",
            &[("price", 10.0f64.into())],
            "available = ?",
            &params![true],
            false,
        )
        .expect("Failed to update the prices")
        .rows();
    assert_eq!(updated, 2);
    let updated = connection
        .update(
            "sluice_products",
            &[("price", 10.0f64.into())],
            "available = ?",
            &params![true],
            false,
        )
        .expect("Failed to update the prices again")
        .rows();
    assert_eq!(updated, 2, "Matched rows are counted even when unchanged");
    let deleted = connection
        .execute("DELETE FROM sluice_products WHERE price = ?", &params![10.0f64])
        .expect("Failed to delete");
    assert_eq!(deleted, 2);

    // Backend failure
    let error;
    crate::silent_logs! {
        error = connection
            .execute("SELECT * FROM sluice_missing_table WHERE id = ?", &params![1i32])
            .expect_err("Selecting from a missing table fails");
    }
    assert!(matches!(
        SluiceError::of(&error),
        Some(SluiceError::Backend { query, .. }) if query.contains("sluice_missing_table")
    ));
}
