pub mod aid;
pub mod config;
pub mod error;
pub mod error_utils;
pub mod store;
pub mod text;
pub mod types;

pub use aid::*;
pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use store::*;
pub use text::*;
pub use types::*;
