pub mod note;
pub mod health;
pub mod messages;
pub mod diagnostics;
pub mod error;

pub use note::*;
pub use health::*;
pub use messages::*;
pub use diagnostics::*;
pub use error::*;
