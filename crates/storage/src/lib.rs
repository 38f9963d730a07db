#![forbid(unsafe_code)]

pub mod memory;
pub mod repository;
pub mod sqlite;
pub mod supabase;

pub use memory::{FailPoint, InMemoryRepository};
pub use repository::{Storage, StorageError};
