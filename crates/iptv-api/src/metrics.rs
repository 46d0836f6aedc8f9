use std::collections::BTreeMap;
use std::fmt::Write;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;

use iptv_core::{EngineKind, PlaybackState};

use crate::state::AppState;

const STATES: [PlaybackState; 4] = [
    PlaybackState::Idle,
    PlaybackState::Loading,
    PlaybackState::Playing,
    PlaybackState::Failed,
];

const ENGINES: [EngineKind; 4] = [
    EngineKind::None,
    EngineKind::EmbeddedVideo,
    EngineKind::AdaptiveHttp,
    EngineKind::EncryptedAdaptive,
];

pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let info = state.player.info().await;
    let failures = state.player.failures();
    let mut out = String::with_capacity(2048);

    let _ = writeln!(out, "# TYPE iptv_player_state stateset");
    let _ = writeln!(out, "# HELP iptv_player_state Current playback state");
    for s in STATES {
        let _ = writeln!(
            out,
            "iptv_player_state{{state=\"{}\"}} {}",
            s,
            u8::from(info.state == s)
        );
    }

    let _ = writeln!(out, "# TYPE iptv_player_engine stateset");
    let _ = writeln!(out, "# HELP iptv_player_engine Engine attached to the session");
    for e in ENGINES {
        let _ = writeln!(
            out,
            "iptv_player_engine{{engine=\"{}\"}} {}",
            e,
            u8::from(info.engine == e)
        );
    }

    let _ = writeln!(out, "# TYPE iptv_player_channels gauge");
    let _ = writeln!(out, "# HELP iptv_player_channels Number of channels in the catalog");
    let _ = writeln!(out, "iptv_player_channels {}", info.channel_count);

    if let Some(channel) = &info.channel {
        let _ = writeln!(out, "# TYPE iptv_player_current_channel info");
        let _ = writeln!(out, "# HELP iptv_player_current_channel Channel most recently selected");
        let _ = writeln!(
            out,
            "iptv_player_current_channel_info{{index=\"{}\",name=\"{}\"}} 1",
            channel.index,
            escape_label(&channel.name)
        );
    }

    let _ = writeln!(out, "# TYPE iptv_player_retries gauge");
    let _ = writeln!(out, "# HELP iptv_player_retries Fallback retries by scope");
    let _ = writeln!(out, "iptv_player_retries{{scope=\"global\"}} {}", info.retries.global);
    let _ = writeln!(out, "iptv_player_retries{{scope=\"channel\"}} {}", info.retries.channel);

    let _ = writeln!(out, "# TYPE iptv_player_switching gauge");
    let _ = writeln!(out, "# HELP iptv_player_switching Whether a channel load holds the switch guard");
    let _ = writeln!(out, "iptv_player_switching {}", u8::from(info.switching));

    let _ = writeln!(out, "# TYPE iptv_player_current_errors gauge");
    let _ = writeln!(
        out,
        "# HELP iptv_player_current_errors Failures in the buffer by type and engine"
    );
    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    for f in &failures {
        *counts
            .entry((f.failure_type.to_string(), f.engine.to_string()))
            .or_default() += 1;
    }
    for ((failure_type, engine), count) in &counts {
        let _ = writeln!(
            out,
            "iptv_player_current_errors{{failure_type=\"{}\",engine=\"{}\"}} {}",
            failure_type, engine, count
        );
    }

    let _ = writeln!(out, "# EOF");

    (
        [(
            header::CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        out,
    )
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
