mod common;

#[cfg(test)]
mod tests {
    use crate::common::{Call, ScriptedCursor, ScriptedDriver, connect, connect_with};
    use sluice::{Entity, Options, PrimaryKeyType, RowLabeled, RowNames, SluiceError, Value};
    use time::{PrimitiveDateTime, macros::datetime};
    use uuid::Uuid;

    #[derive(Debug, Default, Clone, PartialEq, Entity)]
    #[sluice(name = "items", schema = "shop")]
    struct Item {
        #[sluice(primary_key)]
        id: Option<i64>,
        name: String,
        #[sluice(name = "unit_price")]
        price: Option<f64>,
        #[sluice(default = "now()")]
        created: Option<PrimitiveDateTime>,
        #[sluice(skip)]
        label: String,
    }

    #[derive(Debug, Default, Entity)]
    #[sluice(primary_key = ("order_id", "line"))]
    struct OrderLine {
        order_id: i64,
        line: i32,
        quantity: u16,
    }

    #[derive(Debug, Default, Entity)]
    struct Token {
        #[sluice(primary_key, default = "gen_random_uuid()")]
        id: Option<Uuid>,
        owner: String,
    }

    #[derive(Entity)]
    struct AuditLog {
        _message: String,
    }

    const CREATED: PrimitiveDateTime = datetime!(2025-03-04 10:20:30);

    fn item_row(id: i64, name: &str, price: f64) -> Vec<Value> {
        vec![
            Value::Int64(Some(id)),
            Value::Varchar(Some(name.into())),
            Value::Float64(Some(price)),
            Value::Timestamp(Some(CREATED)),
        ]
    }

    const ITEM_COLUMNS: &[&str] = &["id", "name", "unit_price", "created"];

    #[test]
    fn table_definition() {
        let def = Item::table_def();
        assert_eq!(def.name, "items");
        assert_eq!(def.schema, "shop");
        assert_eq!(def.full_name(), "shop.items");
        let names: Vec<_> = def.columns.iter().map(|c| c.name).collect();
        assert_eq!(names, ["id", "name", "unit_price", "created"]);
        assert_eq!(def.columns[2].field, "price");
        assert!(matches!(def.columns[0].value, Value::Int64(None)));
        assert!(matches!(def.columns[3].value, Value::Timestamp(None)));
        assert_eq!(def.columns[0].primary_key, PrimaryKeyType::PrimaryKey);
        assert!(!def.columns[0].nullable);
        assert!(!def.columns[1].nullable);
        assert!(def.columns[2].nullable);
        assert_eq!(def.columns[3].default, Some("now()"));

        let def = OrderLine::table_def();
        assert_eq!(def.full_name(), "order_line");
        let key: Vec<_> = def.primary_key().map(|(_, c)| (c.name, c.primary_key)).collect();
        assert_eq!(
            key,
            [
                ("order_id", PrimaryKeyType::PartOfPrimaryKey),
                ("line", PrimaryKeyType::PartOfPrimaryKey)
            ]
        );

        assert_eq!(AuditLog::table_def().columns[0].name, "message");
    }

    #[test]
    fn values_and_hydration() {
        let mut item = Item {
            id: Some(3),
            name: "Hammer".into(),
            label: "kept".into(),
            ..Default::default()
        };
        assert_eq!(
            item.values(),
            [
                Value::Int64(Some(3)),
                Value::Varchar(Some("Hammer".into())),
                Value::Float64(None),
                Value::Timestamp(None),
            ]
        );
        let labels: RowNames = ["unit_price", "other"]
            .iter()
            .map(|v| v.to_string())
            .collect();
        let row = RowLabeled::new(
            labels,
            [Value::Unknown(Some("9.5".into())), Value::Int32(Some(1))].into(),
        );
        item.hydrate(&row).expect("Failed to hydrate");
        assert_eq!(item.price, Some(9.5));
        assert_eq!(item.name, "Hammer");
        assert_eq!(item.label, "kept");
    }

    #[test]
    fn insert_with_returning() {
        let (connection, journal) =
            connect_with(ScriptedDriver::default().with_returning(), Options::default());
        journal.respond(ScriptedCursor::rows(
            ITEM_COLUMNS,
            vec![item_row(1, "Hammer", 12.5)],
        ));
        let mut item = Item {
            name: "Hammer".into(),
            price: Some(12.5),
            ..Default::default()
        };
        connection.entity_insert(&mut item).expect("Failed to insert");
        assert_eq!(
            journal.queries(),
            [r#"INSERT INTO "shop"."items" ("name", "unit_price") VALUES ('Hammer', '12.5') RETURNING *"#]
        );
        assert_eq!(item.id, Some(1));
        assert_eq!(item.created, Some(CREATED));
    }

    #[test]
    fn insert_reselects_by_generated_id() {
        let (connection, journal) = connect(Options::default());
        journal
            .respond(ScriptedCursor::affected(1).with_insert_id(7))
            .respond(ScriptedCursor::rows(ITEM_COLUMNS, vec![item_row(7, "Saw", 20.0)]));
        let mut item = Item {
            name: "Saw".into(),
            price: Some(20.0),
            ..Default::default()
        };
        connection.entity_insert(&mut item).expect("Failed to insert");
        assert_eq!(
            journal.queries(),
            [
                r#"INSERT INTO "shop"."items" ("name", "unit_price") VALUES ('Saw', '20.0')"#,
                r#"SELECT * FROM "shop"."items" WHERE "id" = '7'"#,
            ]
        );
        assert_eq!(item.id, Some(7));
        assert_eq!(item.created, Some(CREATED));
    }

    #[test]
    fn insert_reselects_by_key() {
        let (connection, journal) = connect(Options::default());
        journal
            .respond(ScriptedCursor::affected(1))
            .respond(ScriptedCursor::rows(
                &["order_id", "line", "quantity"],
                vec![vec![
                    Value::Int64(Some(5)),
                    Value::Int32(Some(2)),
                    Value::Int32(Some(10)),
                ]],
            ));
        let mut line = OrderLine {
            order_id: 5,
            line: 2,
            quantity: 10,
        };
        connection.entity_insert(&mut line).expect("Failed to insert");
        assert_eq!(
            journal.queries()[1],
            r#"SELECT * FROM "order_line" WHERE "order_id" = '5' AND "line" = '2'"#
        );
        assert_eq!(line.quantity, 10);
    }

    #[test]
    fn insert_refused_when_row_cannot_be_reloaded() {
        let (connection, journal) = connect(Options::default());
        let mut token = Token {
            owner: "ada".into(),
            ..Default::default()
        };
        let error = connection.entity_insert(&mut token).unwrap_err();
        assert!(matches!(
            SluiceError::of(&error),
            Some(SluiceError::PrimaryKeyNotSet { column, .. }) if column == "id"
        ));
        let error = connection
            .entity_insert(&mut AuditLog {
                _message: "boot".into(),
            })
            .unwrap_err();
        assert!(matches!(
            SluiceError::of(&error),
            Some(SluiceError::MissingPrimaryKey(table)) if table == "audit_log"
        ));
        assert!(journal.calls().is_empty());

        // Read back through RETURNING
        let (connection, journal) =
            connect_with(ScriptedDriver::default().with_returning(), Options::default());
        let id = Uuid::from_u128(0x5eed);
        journal.respond(ScriptedCursor::rows(
            &["id", "owner"],
            vec![vec![Value::Uuid(Some(id)), Value::Varchar(Some("ada".into()))]],
        ));
        connection.entity_insert(&mut token).expect("Failed to insert");
        assert_eq!(token.id, Some(id));
        assert_eq!(
            journal.queries(),
            [r#"INSERT INTO "token" ("owner") VALUES ('ada') RETURNING *"#]
        );
    }

    #[test]
    fn update_exactly_one_row() {
        let (connection, journal) = connect(Options::default());
        journal
            .respond(ScriptedCursor::affected(1))
            .respond(ScriptedCursor::rows(ITEM_COLUMNS, vec![item_row(1, "Saw", 20.0)]));
        let mut item = Item {
            id: Some(1),
            name: "Saw".into(),
            price: Some(20.0),
            ..Default::default()
        };
        connection.entity_update(&mut item).expect("Failed to update");
        let update = r#"UPDATE "shop"."items" SET "name" = 'Saw', "unit_price" = '20.0', "created" = NULL WHERE "id" = '1'"#;
        let select = r#"SELECT * FROM "shop"."items" WHERE "id" = '1'"#;
        assert_eq!(
            journal.calls(),
            [
                Call::Begin,
                Call::Query(update.into()),
                Call::Commit,
                Call::Query(select.into()),
            ]
        );
        assert_eq!(item.created, Some(CREATED));
        assert!(!connection.in_transaction());
    }

    #[test]
    fn update_no_rows_rolls_back() {
        let (connection, journal) = connect(Options::default());
        journal.respond(ScriptedCursor::affected(0));
        let mut item = Item {
            id: Some(404),
            ..Default::default()
        };
        let error = connection.entity_update(&mut item).unwrap_err();
        assert!(matches!(
            SluiceError::of(&error),
            Some(SluiceError::NoRowsUpdated { table }) if table == "shop.items"
        ));
        let calls = journal.calls();
        assert_eq!(calls.first(), Some(&Call::Begin));
        assert_eq!(calls.last(), Some(&Call::Rollback));
        assert!(!calls.contains(&Call::Commit));
        assert!(!connection.in_transaction());
    }

    #[test]
    fn update_many_rows_rolls_back() {
        let (connection, journal) = connect(Options::default());
        journal.respond(ScriptedCursor::affected(2));
        let mut item = Item {
            id: Some(1),
            ..Default::default()
        };
        let error = connection.entity_update(&mut item).unwrap_err();
        assert!(matches!(
            SluiceError::of(&error),
            Some(SluiceError::AmbiguousUpdate { rows: 2, .. })
        ));
        assert_eq!(journal.calls().last(), Some(&Call::Rollback));
    }

    #[test]
    fn update_joins_open_transaction() {
        let (connection, journal) = connect(Options::default());
        connection.begin().expect("Failed to begin");
        journal.respond(ScriptedCursor::affected(0));
        let mut item = Item {
            id: Some(1),
            ..Default::default()
        };
        assert!(connection.entity_update(&mut item).is_err());
        assert!(connection.in_transaction());
        assert_eq!(journal.calls().iter().filter(|v| **v == Call::Begin).count(), 1);
        assert!(!journal.calls().contains(&Call::Rollback));
        connection.rollback().expect("Failed to rollback");
    }

    #[test]
    fn select_by_key() {
        let (connection, journal) = connect(Options::default());
        journal
            .respond(ScriptedCursor::rows(ITEM_COLUMNS, vec![item_row(2, "Drill", 99.0)]))
            .respond(ScriptedCursor::rows(ITEM_COLUMNS, vec![]));
        let mut item = Item {
            id: Some(2),
            ..Default::default()
        };
        connection.entity_select(&mut item).expect("Failed to select");
        assert_eq!(item.name, "Drill");
        assert_eq!(item.price, Some(99.0));

        let error = connection.entity_select(&mut item).unwrap_err();
        assert!(matches!(
            SluiceError::of(&error),
            Some(SluiceError::EntityNotFound(..))
        ));

        let mut unsaved = Item::default();
        let error = connection.entity_select(&mut unsaved).unwrap_err();
        assert!(matches!(
            SluiceError::of(&error),
            Some(SluiceError::PrimaryKeyNotSet { column, .. }) if column == "id"
        ));
        assert_eq!(journal.round_trips(), 2);
    }

    #[test]
    fn delete_exactly_one_row() {
        let (connection, journal) = connect(Options::default());
        journal
            .respond(ScriptedCursor::affected(1))
            .respond(ScriptedCursor::affected(0))
            .respond(ScriptedCursor::affected(3));
        let line = OrderLine {
            order_id: 5,
            line: 2,
            quantity: 1,
        };
        connection.entity_delete(&line).expect("Failed to delete");
        assert_eq!(
            journal.queries(),
            [r#"DELETE FROM "order_line" WHERE "order_id" = '5' AND "line" = '2'"#]
        );
        for expected in [0, 3] {
            let error = connection.entity_delete(&line).unwrap_err();
            assert!(matches!(
                SluiceError::of(&error),
                Some(SluiceError::UnexpectedRowCount { rows, .. }) if *rows == expected
            ));
        }

        let error = connection
            .entity_delete(&AuditLog {
                _message: "boot".into(),
            })
            .unwrap_err();
        assert!(matches!(
            SluiceError::of(&error),
            Some(SluiceError::MissingPrimaryKey(table)) if table == "audit_log"
        ));
    }
}
