pub mod requests;
pub mod search;
pub mod state;

pub use requests::*;
pub use search::*;
pub use state::*;
