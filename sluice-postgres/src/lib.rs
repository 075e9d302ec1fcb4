mod cursor;
mod driver;
mod sql_writer;
mod util;
mod value_holder;

pub use cursor::*;
pub use driver::*;
pub use sql_writer::*;
pub use value_holder::*;
