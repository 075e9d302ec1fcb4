
#[cfg(test)]
mod tests {
    use super::init::init;
    use sluice_core::{BindStrategy, Connection, params};
    use sluice_postgres::PostgresDriver;
    use sluice_tests::{execute_tests, init_logs, silent_logs};
    use std::sync::Mutex;

    static MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn postgres() {
        init_logs();
        let _guard = MUTEX.lock().unwrap();
        let (url, _container) = init();

        // Inline literals
        let error_msg = format!("Could not connect to `{url}`");
        let connection = Connection::<PostgresDriver>::connect(&url).expect(&error_msg);
        execute_tests(connection);

        // Parameter markers
        let separator = if url.contains('?') { '&' } else { '?' };
        let url = format!("{url}{separator}sluice_strategy=marker&sluice_registry_capacity=4");
        let connection = Connection::<PostgresDriver>::connect(&url).expect(&error_msg);
        assert_eq!(connection.options().strategy, BindStrategy::ParameterMarker);
        execute_tests(connection);
    }

    #[test]
    fn registry_deallocates() {
        init_logs();
        let _guard = MUTEX.lock().unwrap();
        let (url, _container) = init();
        let separator = if url.contains('?') { '&' } else { '?' };
        let connection = Connection::<PostgresDriver>::connect(&format!(
            "{url}{separator}sluice_strategy=marker&sluice_registry_capacity=2"
        ))
        .expect("Could not connect");
        for i in 0..5i32 {
            let mut statement = connection
                .query(&format!("SELECT ? + {i} AS v"), &params![i])
                .expect("Failed to run the statement");
            let value = statement.fetch().unwrap().expect("Has a value");
            assert_eq!(value.as_i128(), Some(2 * i as i128));
        }
        assert_eq!(connection.registered_statements(), 2);
        connection.disconnect().expect("Could not disconnect");
        assert_eq!(connection.registered_statements(), 0);
    }

    #[test]
    fn wrong_url() {
        silent_logs! {
            assert!(Connection::<PostgresDriver>::connect("mysql://some_url").is_err());
            assert!(
                Connection::<PostgresDriver>::connect("postgres://localhost/db?sslmode=sometimes")
                    .is_err()
            );
        }
    }
}
