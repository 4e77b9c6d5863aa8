pub mod health;
pub mod ready;
pub mod diagnostics;
pub mod session;
pub mod messages;
pub mod error;

pub use health::*;
pub use ready::*;
pub use diagnostics::*;
pub use session::*;
pub use messages::*;
pub use error::*;
