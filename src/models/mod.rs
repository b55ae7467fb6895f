pub mod activity;
pub mod enums;
pub mod occurrence;
pub mod protocol;

pub use activity::*;
pub use occurrence::*;
pub use protocol::*;
