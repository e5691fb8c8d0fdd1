pub mod player;

pub use player::{PlaybackReport, Player};
