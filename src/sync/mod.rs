pub mod notes;
pub mod scheduler;

pub use notes::{NoteSyncController, SaveOutcome, SaveStatus};
pub use scheduler::RateRefreshScheduler;
