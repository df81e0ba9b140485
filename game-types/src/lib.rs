pub mod game;
pub mod messages;
pub mod records;
pub mod errors;

// Re-export all types
pub use game::*;
pub use messages::*;
pub use records::*;
pub use errors::*;

/// Five-digit join code over the shape alphabet `3..=8`.
pub type GameCode = String;
pub type PlayerId = String;
