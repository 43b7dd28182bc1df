pub mod notestore;
pub mod dbnotes;
pub mod memnotes;

pub use notestore::*;
pub use dbnotes::PgNoteStore;
pub use memnotes::MemoryNoteStore;

#[cfg(test)]
pub mod testing;
