//! Common system operations

mod error;
pub use error::*;
mod path;
pub use path::PathExt;
mod fs;
pub use fs::*;
mod executor;
pub use executor::*;
