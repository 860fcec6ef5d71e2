pub mod browser;
pub mod classifier;
pub mod droid;
pub mod events;
pub mod orchestrator;
pub mod pacing;
pub mod paginator;

pub use browser::*;
pub use classifier::*;
pub use droid::*;
pub use events::*;
pub use orchestrator::*;
pub use pacing::*;
pub use paginator::*;
