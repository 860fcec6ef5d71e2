pub mod lead;
pub mod task;

pub use lead::*;
pub use task::*;
