//! DDL fragment and statement builders.
//!
//! Pure SQL-text generation; execution stays with the caller.

pub mod column;
pub mod index;

pub use column::{build_column_alteration, build_column_definition};
pub use index::{foreign_key_statement, index_create_or_edit, IndexRef};
