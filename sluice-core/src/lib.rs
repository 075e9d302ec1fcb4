mod as_value;
mod bind;
mod cache;
mod compiler;
mod connection;
mod convert;
mod driver;
mod entity;
mod error;
mod mapper;
mod options;
mod query;
mod registry;
mod session;
mod sql_writer;
mod statement;
mod telemetry;
mod util;
mod value;

pub use ::anyhow::Context;
pub use as_value::*;
pub use bind::*;
pub use cache::*;
pub use compiler::*;
pub use connection::*;
pub use convert::*;
pub use driver::*;
pub use entity::*;
pub use error::*;
pub use options::*;
pub use query::*;
pub use registry::*;
pub use sql_writer::*;
pub use statement::*;
pub use telemetry::*;
pub use util::*;
pub use value::*;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
