pub mod entities;
pub mod messages;

pub use entities::*;
pub use messages::*;
