pub mod constants;
pub mod error;
pub mod event;
pub mod params;
pub mod records;
pub mod types;

pub use constants::*;
pub use error::{ErrorKind, ForgeError};
pub use event::ForgeEvent;
pub use params::ForgeParams;
pub use records::*;
pub use types::*;
