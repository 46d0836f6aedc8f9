use std::sync::Arc;

use iptv_core::{Player, StatusBoard};

/// One player session and the view it renders into.
#[derive(Clone)]
pub struct AppState {
    pub player: Player,
    pub board: Arc<StatusBoard>,
}

impl AppState {
    /// `board` must be the view `player` was built with.
    pub fn new(player: Player, board: Arc<StatusBoard>) -> Self {
        Self { player, board }
    }
}
