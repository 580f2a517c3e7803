pub mod cache;
pub mod charts;
pub mod engine;
pub mod indicators;
pub mod sentiment;
pub mod stats;
pub mod taxonomy;
pub mod timeline;

pub use cache::*;
pub use charts::*;
pub use engine::*;
pub use indicators::*;
pub use sentiment::*;
pub use stats::*;
pub use taxonomy::*;
pub use timeline::*;
