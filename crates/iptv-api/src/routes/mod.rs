mod player;

pub use player::router;
