pub use error::ModelError;

mod error;
pub mod loc;
