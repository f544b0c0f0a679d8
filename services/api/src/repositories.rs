//! Repositories for database operations

pub mod todo;

pub use todo::TodoRepository;
