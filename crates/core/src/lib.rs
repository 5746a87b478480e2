//! Draw resolution and effect aggregation. Keep this crate free of IO and
//! presentation concerns.

pub mod cards;
pub mod config;
pub mod deck;
pub mod dice;
pub mod draw;
pub mod effects;
pub mod events;
pub mod resistance;
pub mod rng;
pub mod session;

pub use cards::*;
pub use config::*;
pub use deck::*;
pub use dice::*;
pub use draw::*;
pub use effects::*;
pub use events::*;
pub use resistance::*;
pub use rng::*;
pub use session::*;
