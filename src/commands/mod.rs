pub mod calendar;
pub mod currency;
pub mod notes;
pub mod state;
pub mod stats;

pub use calendar::*;
pub use currency::*;
pub use notes::*;
pub use state::*;
pub use stats::*;
