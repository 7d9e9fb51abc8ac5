pub mod error;
pub mod types;
pub mod value;

pub use error::DlgError;
pub use types::*;
pub use value::*;
