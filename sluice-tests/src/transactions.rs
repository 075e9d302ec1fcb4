use sluice::{AsValue, Connection, Driver, Error, SluiceError, params};

fn count<D: Driver>(connection: &Connection<D>) -> i64 {
    let value = connection
        .query("SELECT COUNT(*) FROM sluice_accounts", &[])
        .expect("Failed to count the accounts")
        .fetch()
        .expect("Failed to fetch the count")
        .expect("Count returns a value");
    i64::try_from_value(value).expect("Count is an integer")
}

pub fn transactions<D: Driver>(connection: &Connection<D>) {
    // Setup
    connection
        .execute("DROP TABLE IF EXISTS sluice_accounts", &[])
        .expect("Failed to drop sluice_accounts table");
    connection
        .execute(
            "CREATE TABLE sluice_accounts (id INTEGER PRIMARY KEY, balance INTEGER NOT NULL)",
            &[],
        )
        .expect("Failed to create sluice_accounts table");

    // Rollback
    connection.begin().expect("Could not begin a transaction");
    assert!(connection.in_transaction());
    let error = connection.begin().unwrap_err();
    assert!(matches!(
        SluiceError::of(&error),
        Some(SluiceError::TransactionOpen)
    ));
    connection
        .execute(
            "INSERT INTO sluice_accounts (id, balance) VALUES (?, ?)",
            &params![1i32, 100i32],
        )
        .expect("Failed to insert the account");
    assert_eq!(count(connection), 1);
    connection.rollback().expect("Failed to rollback");
    assert!(!connection.in_transaction());
    assert_eq!(count(connection), 0);

    // Commit
    connection
        .transaction(|c| {
            c.execute(
                "INSERT INTO sluice_accounts (id, balance) VALUES (?, ?), (?, ?)",
                &params![1i32, 100i32, 2i32, 50i32],
            )
        })
        .expect("Failed to run the transaction");
    assert_eq!(count(connection), 2);

    // Failure rolls back
    let result = connection.transaction(|c| {
        c.execute(
            "UPDATE sluice_accounts SET balance = balance - ? WHERE id = ?",
            &params![70i32, 2i32],
        )?;
        let balance = c
            .query("SELECT balance FROM sluice_accounts WHERE id = ?", &params![2i32])?
            .fetch()?
            .map(i64::try_from_value)
            .transpose()?
            .unwrap_or_default();
        if balance < 0 {
            return Err(Error::msg("Insufficient funds"));
        }
        Ok(())
    });
    assert!(result.is_err());
    assert!(!connection.in_transaction());
    let balance = connection
        .query("SELECT balance FROM sluice_accounts WHERE id = ?", &params![2i32])
        .expect("Failed to select the balance")
        .fetch()
        .expect("Failed to fetch the balance")
        .map(i64::try_from_value)
        .transpose()
        .expect("Balance is an integer");
    assert_eq!(balance, Some(50));

    // Nothing to end
    let error = connection.commit().unwrap_err();
    assert!(matches!(
        SluiceError::of(&error),
        Some(SluiceError::NoTransaction)
    ));
}
