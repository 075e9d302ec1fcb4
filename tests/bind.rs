mod common;

#[cfg(test)]
mod tests {
    use crate::common::{Call, connect};
    use indoc::indoc;
    use sluice::{Bind, BindStrategy, BindType, Options, SluiceError, Value, params};

    #[test]
    fn declared_type_checked_at_bind_time() {
        let (connection, journal) = connect(Options::default());
        let mut statement = connection.prepare("SELECT * FROM t WHERE a = :a");
        let error = statement
            .bind_typed("a", "1", BindType::Int16)
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(
            SluiceError::of(&error),
            Some(SluiceError::BindType {
                declared: BindType::Int16,
                ..
            })
        ));
        assert!(statement.binds().is_empty());
        assert!(statement.bind_typed("a", 70000i32, BindType::Int16).is_err());
        assert!(statement.bind_typed("a", vec![1i32, 300i32], BindType::Int8).is_err());
        assert!(statement.bind_typed("a", 2.5f64, BindType::Int64).is_err());
        assert!(statement.bind_typed("a", "1.5", BindType::Float64).is_err());
        assert!(journal.calls().is_empty());

        statement
            .bind_typed("a", 7i64, BindType::Int16)
            .expect("Fits in Int16");
        assert!(statement.bind_typed("b", 7i32, BindType::Float32).is_ok());
        assert!(statement.bind_typed("c", None::<String>, BindType::Int32).is_ok());
        assert!(statement.bind_typed("d", vec![1u8, 2u8], BindType::UInt16).is_ok());
    }

    #[test]
    fn named_values_are_written_by_family() {
        let (connection, journal) = connect(Options::default());
        let mut statement = connection.prepare(indoc! {"
            SELECT * FROM t
            WHERE a = :a AND ab = :ab AND c = :c::bytea AND d IN (:d)
            AND e = ':a' AND f = :f AND g = :g
        "});
        statement
            .bind("a", 1i32)
            .bind(":ab", "it's")
            .bind("c", Box::<[u8]>::from(b"\x01\xff".as_slice()))
            .bind("d", vec![1i64, 2i64, 3i64])
            .bind("f", true)
            .bind("g", None::<i32>);
        statement.execute(&[]).expect("Failed to execute");
        assert_eq!(
            journal.queries(),
            [indoc! {r"
                SELECT * FROM t
                WHERE a = 1 AND ab = 'it''s' AND c = '\x01ff'::bytea AND d IN (1,2,3)
                AND e = ':a' AND f = true AND g = NULL
            "}]
        );
    }

    #[test]
    fn declared_type_drives_rendering() {
        let (connection, journal) = connect(Options::default());
        let mut statement =
            connection.prepare("SELECT * FROM t WHERE name = :n AND data = :d AND n IN (:ids)");
        statement
            .bind_typed("n", 5i32, BindType::Varchar)
            .and_then(|v| v.bind_typed("d", "abc", BindType::Blob))
            .and_then(|v| v.bind_typed("ids", vec![1i32, 2i32], BindType::Text))
            .expect("Text and binary accept any value");
        statement.execute(&[]).expect("Failed to execute");
        assert_eq!(
            journal.queries(),
            [r"SELECT * FROM t WHERE name = '5' AND data = '\x616263' AND n IN ('1','2')"]
        );
    }

    #[test]
    fn names_match_whole_words() {
        let (connection, journal) = connect(Options::default());
        let mut statement = connection.prepare("SELECT :id, :id_2, :identifier, x:id");
        statement
            .bind("id", 1i32)
            .bind("id_2", 2i32)
            .bind("identifier", 3i32);
        statement.execute(&[]).expect("Failed to execute");
        assert_eq!(journal.queries(), ["SELECT 1, 2, 3, x:id"]);
    }

    #[test]
    fn last_bind_wins() {
        let (connection, journal) = connect(Options::default());
        let mut statement = connection.prepare("SELECT * FROM t WHERE v = :v");
        statement.bind("v", 1i32).bind("v", 2i32);
        statement.execute(&[]).expect("Failed to execute");
        statement.clear_bindings().push_bind(Bind::infer("v", "x").with_column("v"));
        statement.execute(&[]).expect("Failed to execute again");
        assert_eq!(
            journal.queries(),
            [
                "SELECT * FROM t WHERE v = 2",
                "SELECT * FROM t WHERE v = 'x'",
            ]
        );
    }

    #[test]
    fn unmatched_names_fail() {
        let (connection, journal) = connect(Options::default());
        let mut statement = connection.prepare("SELECT * FROM t WHERE a = :a");
        let error = statement.execute(&[]).unwrap_err();
        assert!(matches!(
            SluiceError::of(&error),
            Some(SluiceError::UnboundPlaceholder(name)) if name == "a"
        ));
        statement.bind("a", 1i32).bind("b", 2i32);
        let error = statement.execute(&[]).unwrap_err();
        assert!(matches!(
            SluiceError::of(&error),
            Some(SluiceError::UnknownBind(name)) if name == "b"
        ));
        assert!(journal.calls().is_empty());
    }

    #[test]
    fn nested_lists_cannot_be_escaped() {
        let (connection, journal) = connect(Options::default());
        let mut statement = connection.prepare("SELECT * FROM t WHERE a IN (:a)");
        statement.bind("a", vec![vec![1i32], vec![2i32]]);
        let error = statement.execute(&[]).unwrap_err();
        assert!(matches!(
            SluiceError::of(&error),
            Some(SluiceError::UnescapableValue(..))
        ));
        assert!(journal.calls().is_empty());
    }

    #[test]
    fn named_binds_with_parameter_markers() {
        let (connection, journal) =
            connect(Options::default().strategy(BindStrategy::ParameterMarker));
        let mut statement = connection.prepare("SELECT * FROM t WHERE a = ? AND b = :b AND c = ?");
        statement.bind("b", "x");
        statement
            .execute(&params![1i32, 2i32])
            .expect("Failed to execute");
        assert_eq!(
            journal.calls(),
            [
                Call::Prepare(
                    "sluice_1".into(),
                    "SELECT * FROM t WHERE a = $1 AND b = 'x' AND c = $2".into()
                ),
                Call::Execute(
                    "sluice_1".into(),
                    vec![Value::Int32(Some(1)), Value::Int32(Some(2))]
                ),
            ]
        );
    }

    #[test]
    fn custom_placeholder() {
        let (connection, journal) = connect(Options::default().placeholder('#'));
        connection
            .execute("SELECT '#', ? FROM t WHERE id = #", &params![5i32])
            .expect("Failed to execute");
        assert_eq!(journal.queries(), ["SELECT '#', ? FROM t WHERE id = '5'"]);
    }
}
