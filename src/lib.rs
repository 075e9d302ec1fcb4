//! One statement pipeline over many database backends.
//!
//! A template with positional (`?`) and named (`:name`) placeholders is compiled for the
//! backend, answered by the cache or by the backend, and read back through the same accessors
//! whatever the origin of the rows.
//!
//! ```ignore
//! use sluice::{Connection, params};
//! use sluice_postgres::PostgresDriver;
//!
//! let connection = Connection::<PostgresDriver>::connect("postgres://localhost/app")?;
//! let mut statement = connection.prepare("SELECT * FROM item WHERE kind = :kind AND id > ?");
//! statement.bind("kind", "tool");
//! statement.execute(&params![10i64])?;
//! for row in statement.fetch_row_set()? {
//!     println!("{:?}", row.get::<String>("name")?);
//! }
//! ```
pub use ::sluice_core::*;
pub use ::sluice_macros::*;
