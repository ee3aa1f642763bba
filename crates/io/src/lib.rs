// File I/O operations: reference tables in, reports out

pub mod csv;
pub mod error;
pub mod json;
pub mod reference;
pub mod xlsx;

pub use error::{IoError, IoResult};
pub use reference::{audit, ReferenceFile, ReferenceFormat, ReferenceIssue, ReferenceSink, ReferenceSource};
