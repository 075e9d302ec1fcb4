use sluice::{Connection, Driver, MemoryCache, Retention, ResultSource, params};
use std::time::Duration;

pub fn cache<D: Driver>(connection: Connection<D>) {
    let connection = connection.with_cache(MemoryCache::new(Retention::Capacity(8)));

    // Setup
    connection
        .execute("DROP TABLE IF EXISTS sluice_rates", &[])
        .expect("Failed to drop sluice_rates table");
    connection
        .execute(
            "CREATE TABLE sluice_rates (code VARCHAR(3) PRIMARY KEY, rate DOUBLE PRECISION NOT NULL)",
            &[],
        )
        .expect("Failed to create sluice_rates table");
    connection
        .execute(
            "INSERT INTO sluice_rates (code, rate) VALUES (?, ?), (?, ?)",
            &params!["EUR", 1.0f64, "USD", 1.08f64],
        )
        .expect("Failed to insert the rates");

    let query = "SELECT code, rate FROM sluice_rates WHERE rate >= ? ORDER BY code";
    let live = connection
        .query(query, &params![1.0f64])
        .expect("Failed to select the rates")
        .fetch_row_set()
        .expect("Failed to fetch the rates");
    assert_eq!(live.len(), 2);

    // Populate
    let mut statement = connection.prepare(query);
    statement
        .cache("rates", Duration::from_secs(60))
        .expect("A select can be cached")
        .execute(&params![1.0f64])
        .expect("Failed to populate the cache");
    assert!(!statement.cache_hit());
    assert_eq!(statement.result_source(), ResultSource::Cache);
    assert_eq!(statement.fetch_row_set().unwrap(), live);

    // The backend changes, the cache does not
    connection
        .execute("DELETE FROM sluice_rates WHERE code = ?", &params!["USD"])
        .expect("Failed to delete USD");
    statement
        .execute(&params![1.0f64])
        .expect("Failed to read the cache");
    assert!(statement.cache_hit());
    assert_eq!(statement.rows(), 2);
    assert_eq!(statement.fetch_row_set().unwrap(), live);

    // Invalidate
    connection
        .invalidate("rates")
        .expect("Failed to invalidate the rates");
    statement
        .execute(&params![1.0f64])
        .expect("Failed to repopulate the cache");
    assert!(!statement.cache_hit());
    assert_eq!(statement.fetch_row_set().unwrap().len(), 1);
    statement
        .no_cache()
        .execute(&params![1.0f64])
        .expect("Failed to read the backend");
    assert_eq!(statement.result_source(), ResultSource::Backend);
    assert_eq!(statement.fetch_row_set().unwrap().len(), 1);
}
