use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use iptv_core::{
    Channel, ChannelKind, PlaybackFailure, PlayerEvent, PlayerInfo, QualityChoice, ViewSnapshot,
};

use crate::error::ApiError;
use crate::state::AppState;

/// `"auto"` or a level index.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LevelInput {
    Index(usize),
    Named(String),
}

impl LevelInput {
    fn into_choice(self) -> Result<QualityChoice, ApiError> {
        match self {
            LevelInput::Index(i) => Ok(QualityChoice::Level(i)),
            LevelInput::Named(name) if name.eq_ignore_ascii_case("auto") => Ok(QualityChoice::Auto),
            LevelInput::Named(name) => Err(ApiError::BadRequest(format!(
                "Invalid quality level: {}",
                name
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QualityRequest {
    pub level: LevelInput,
}

#[derive(Serialize)]
pub struct ChannelSummary {
    pub index: usize,
    pub name: String,
    pub kind: ChannelKind,
    #[serde(rename = "type")]
    pub raw_type: String,
    pub link: String,
    pub logo: String,
    pub protected: bool,
}

impl From<&Channel> for ChannelSummary {
    fn from(c: &Channel) -> Self {
        Self {
            index: c.index,
            name: c.name.clone(),
            kind: c.kind,
            raw_type: c.raw_type.clone(),
            link: c.link.clone(),
            logo: c.logo.clone(),
            protected: c.license_server.is_some() || c.has_clear_keys(),
        }
    }
}

#[derive(Serialize)]
pub struct ChannelsResponse {
    pub channels: Vec<ChannelSummary>,
}

#[derive(Serialize)]
pub struct SelectResponse {
    pub message: String,
    pub channel: usize,
    pub name: String,
}

#[derive(Serialize)]
pub struct PlayerStatus {
    #[serde(flatten)]
    pub info: PlayerInfo,
    pub view: ViewSnapshot,
}

#[derive(Serialize)]
pub struct EventsResponse {
    pub events: Vec<PlayerEvent>,
}

#[derive(Serialize)]
pub struct ErrorsResponse {
    pub state: String,
    pub errors: Vec<PlaybackFailure>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/channels", get(list_channels))
        .route("/channels/{index}/select", post(select_channel))
        .route("/player", get(get_player))
        .route("/player/quality", put(set_quality))
        .route("/player/stop", post(stop_player))
        .route("/events", get(get_events))
        .route("/errors", get(get_errors).delete(clear_errors))
}

fn parse_channel_index(index: &str) -> Result<usize, ApiError> {
    index
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid channel index: {}", index)))
}

/// GET /api/v1/channels
async fn list_channels(State(state): State<AppState>) -> Json<ChannelsResponse> {
    let channels = state.player.channels();
    Json(ChannelsResponse {
        channels: channels.iter().map(ChannelSummary::from).collect(),
    })
}

/// POST /api/v1/channels/:index/select
async fn select_channel(
    State(state): State<AppState>,
    Path(index): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let index = parse_channel_index(&index)?;
    // The load runs on its own task; progress is visible through /player and /events.
    state.player.select_channel(index)?;

    let name = state
        .player
        .current_channel()
        .map(|c| c.name)
        .unwrap_or_default();

    Ok((
        StatusCode::ACCEPTED,
        Json(SelectResponse {
            message: "Channel load started".into(),
            channel: index,
            name,
        }),
    ))
}

/// GET /api/v1/player
async fn get_player(State(state): State<AppState>) -> Json<PlayerStatus> {
    Json(PlayerStatus {
        info: state.player.info().await,
        view: state.board.snapshot(),
    })
}

/// PUT /api/v1/player/quality
async fn set_quality(
    State(state): State<AppState>,
    Json(body): Json<QualityRequest>,
) -> Result<StatusCode, ApiError> {
    let choice = body.level.into_choice()?;
    state.player.select_quality(choice)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/player/stop
async fn stop_player(State(state): State<AppState>) -> Json<MessageResponse> {
    state.player.shutdown();
    Json(MessageResponse {
        message: "Player stopped".into(),
    })
}

/// GET /api/v1/events
async fn get_events(State(state): State<AppState>) -> Json<EventsResponse> {
    Json(EventsResponse {
        events: state.player.events(),
    })
}

/// GET /api/v1/errors
async fn get_errors(State(state): State<AppState>) -> Json<ErrorsResponse> {
    Json(ErrorsResponse {
        state: state.player.state().to_string(),
        errors: state.player.failures(),
    })
}

/// DELETE /api/v1/errors
async fn clear_errors(State(state): State<AppState>) -> Json<MessageResponse> {
    state.player.clear_failures();
    Json(MessageResponse {
        message: "Errors cleared".into(),
    })
}
