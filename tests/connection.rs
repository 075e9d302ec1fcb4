mod common;

#[cfg(test)]
mod tests {
    use crate::common::{Call, ScriptedCursor, ScriptedDriver, connect, connect_with};
    use sluice::{
        BindStrategy, Connection, Error, Options, Retention, SluiceError, Value, params,
    };

    #[test]
    fn options_from_url() {
        let connection = Connection::<ScriptedDriver>::connect(
            "scripted://host/db?sluice_strategy=marker&sluice_placeholder=%23&sluice_telemetry=true&sluice_registry_capacity=4",
        )
        .expect("Failed to connect");
        let options = connection.options();
        assert_eq!(options.strategy, BindStrategy::ParameterMarker);
        assert_eq!(options.placeholder, '#');
        assert!(options.telemetry);
        assert_eq!(options.registry_retention, Retention::Capacity(4));
        assert!(connection.is_connected());

        assert!(Connection::<ScriptedDriver>::connect("not a url").is_err());
        assert!(
            Connection::<ScriptedDriver>::connect("scripted://host/db?sluice_telemetry=maybe")
                .is_err()
        );
    }

    #[test]
    fn transaction_state_errors() {
        let (connection, journal) = connect(Options::default());
        let error = connection.commit().unwrap_err();
        assert!(matches!(
            SluiceError::of(&error),
            Some(SluiceError::NoTransaction)
        ));
        assert!(connection.rollback().is_err());

        connection.begin().expect("Failed to begin");
        assert!(connection.in_transaction());
        let error = connection.begin().unwrap_err();
        assert!(matches!(
            SluiceError::of(&error),
            Some(SluiceError::TransactionOpen)
        ));
        let error = connection.disconnect().unwrap_err();
        assert!(matches!(
            SluiceError::of(&error),
            Some(SluiceError::TransactionOpen)
        ));
        assert!(connection.is_connected());
        connection.commit().expect("Failed to commit");
        assert!(!connection.in_transaction());
        assert_eq!(journal.calls(), [Call::Begin, Call::Commit]);

        connection.disconnect().expect("Failed to disconnect");
        assert!(!connection.is_connected());
        for error in [
            connection.begin().unwrap_err(),
            connection.disconnect().unwrap_err(),
            connection.execute("SELECT 1", &[]).unwrap_err(),
        ] {
            assert!(matches!(
                SluiceError::of(&error),
                Some(SluiceError::NotConnected)
            ));
        }

        connection
            .open("scripted://again")
            .expect("Failed to reopen");
        assert!(connection.is_connected());
        assert_eq!(journal.calls().last(), Some(&Call::Connect("scripted://again".into())));
    }

    #[test]
    fn open_twice_keeps_prepared_statements() {
        let (connection, journal) =
            connect(Options::default().strategy(BindStrategy::ParameterMarker));
        connection
            .execute("UPDATE t SET a = ?", &params![1i32])
            .expect("Failed to update");
        let error = connection.open("scripted://again").unwrap_err();
        assert!(matches!(
            SluiceError::of(&error),
            Some(SluiceError::AlreadyConnected)
        ));
        assert!(!journal.calls().iter().any(|v| matches!(v, Call::Connect(..))));
        assert_eq!(connection.registered_statements(), 1);
        connection
            .execute("UPDATE t SET a = ?", &params![2i32])
            .expect("Failed to update again");
        assert_eq!(
            journal.calls().last(),
            Some(&Call::Execute("sluice_1".into(), vec![Value::Int32(Some(2))]))
        );
    }

    #[test]
    fn transaction_commits_on_success() {
        let (connection, journal) = connect(Options::default());
        journal.respond(ScriptedCursor::affected(2));
        let rows = connection
            .transaction(|c| c.execute("DELETE FROM t WHERE a = ?", &params![1i32]))
            .expect("Failed to run the transaction");
        assert_eq!(rows, 2);
        assert_eq!(
            journal.calls(),
            [
                Call::Begin,
                Call::Query("DELETE FROM t WHERE a = '1'".into()),
                Call::Commit,
            ]
        );
    }

    #[test]
    fn transaction_rolls_back_on_failure() {
        let (connection, journal) = connect(Options::default());
        journal.fail("deadlock detected");
        let error = connection
            .transaction(|c| {
                c.execute("UPDATE t SET a = 1", &[])?;
                Ok::<_, Error>(())
            })
            .unwrap_err();
        assert!(format!("{:#}", error).contains("deadlock detected"));
        assert_eq!(
            journal.calls(),
            [
                Call::Begin,
                Call::Query("UPDATE t SET a = 1".into()),
                Call::Rollback,
            ]
        );
        assert!(!connection.in_transaction());
    }

    #[test]
    fn insert_and_update_helpers() {
        let (connection, journal) =
            connect_with(ScriptedDriver::default().with_returning(), Options::default());
        journal
            .respond(ScriptedCursor::rows(
                &["id", "name"],
                vec![vec![
                    Value::Int64(Some(9)),
                    Value::Varchar(Some("Drill".into())),
                ]],
            ))
            .respond(ScriptedCursor::affected(1));
        let mut inserted = connection
            .insert(
                "shop.items",
                &[("name", "Drill".into()), ("price", Value::Float64(None))],
                true,
            )
            .expect("Failed to insert");
        let row = inserted
            .fetch_row()
            .expect("Failed to fetch")
            .expect("The inserted row is returned");
        assert_eq!(row.get_column("id"), Some(&Value::Int64(Some(9))));

        let updated = connection
            .update(
                "items",
                &[("name", "Saw".into())],
                "\"id\" = ?",
                &params![9i64],
                false,
            )
            .expect("Failed to update");
        assert_eq!(updated.rows(), 1);
        assert_eq!(
            journal.queries(),
            [
                r#"INSERT INTO "shop"."items" ("name", "price") VALUES ('Drill', NULL) RETURNING *"#,
                r#"UPDATE "items" SET "name" = 'Saw' WHERE "id" = '9'"#,
            ]
        );
    }
}
