pub mod date_key;
pub mod note;
pub mod settings;
pub mod trade;

pub use date_key::*;
pub use note::*;
pub use settings::*;
pub use trade::*;
