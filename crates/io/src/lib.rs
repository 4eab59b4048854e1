// File I/O operations

pub mod cache;
pub mod csv;
pub mod error;

pub use cache::ResponseCache;
pub use error::IoError;
