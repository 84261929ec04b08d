//! Compute module - Game simulation and controller evolution.

mod agent;
mod collision;
mod episode;
mod game;
mod network;
mod obstacle;
mod sensor;

pub mod evolution;

pub use agent::*;
pub use collision::*;
pub use episode::*;
pub use game::*;
pub use network::*;
pub use obstacle::*;
pub use sensor::*;
