pub mod agency;
pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod io;
pub mod load;
pub mod paths;
pub mod reallocation;
pub mod store;
pub mod types;
pub mod verify;

pub use error::{CaseflowError, Result};
