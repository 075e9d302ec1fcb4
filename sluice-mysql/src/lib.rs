mod cursor;
mod driver;
mod row_wrap;
mod sql_writer;
mod value_wrap;

pub use cursor::*;
pub use driver::*;
pub use sql_writer::*;
