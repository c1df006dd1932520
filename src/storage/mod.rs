pub mod table_writer;

pub use table_writer::*;
