mod books;
mod cache;
mod products;
mod transactions;

use crate::{books::books, cache::cache, products::products, transactions::transactions};
use log::LevelFilter;
use sluice::{Connection, Driver};
use std::env;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Run the whole suite on an open connection, consumed because the cache tests install a
/// cache gateway on it.
pub fn execute_tests<D: Driver>(connection: Connection<D>) {
    products(&connection);
    transactions(&connection);
    books(&connection);
    cache(connection);
}

/// Auto generated `BIGINT` primary key column, in the dialect of the driver.
pub(crate) fn serial_primary_key<D: Driver>() -> &'static str {
    match D::NAME {
        "mysql" => "BIGINT AUTO_INCREMENT PRIMARY KEY",
        _ => "BIGSERIAL PRIMARY KEY",
    }
}

#[macro_export]
macro_rules! silent_logs {
    ($($code:tt)+) => {{
        let level = log::max_level();
        log::set_max_level(log::LevelFilter::Off);
        $($code)+
        log::set_max_level(level);
    }};
}
