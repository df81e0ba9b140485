pub mod grid;
pub mod goal;
pub mod patterns;
pub mod game_state;
pub mod cleanup;

// Re-export main components
pub use grid::*;
pub use goal::*;
pub use patterns::*;
pub use game_state::*;
pub use cleanup::*;
