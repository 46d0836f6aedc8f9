use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use iptv_core::drm::{DrmConfig, DrmSupport, KeySystem, KeySystemAccess, ProbeError};
use iptv_core::engine::{
    codes, AdaptiveEngine, EmbedFrame, EncryptedEngine, EngineError, EngineFactory, MediaSurface,
    PlayError, QualityChoice, QualityLevel,
};
use iptv_core::player::{AttemptStage, EventKind, FailureType, LoadOutcome, LIVE_BADGE};
use iptv_core::{
    BufferProfile, CatalogError, CatalogSource, EngineKind, PlaybackState, Player, PlayerConfig,
    SelectError, StaticKeySystems, StatusBoard, StreamingProfile,
};
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

// --- scripted engines ---

#[derive(Debug, Clone)]
enum Outcome {
    Ready(Vec<QualityLevel>),
    Live,
    Fail(EngineError),
    Hang,
}

#[derive(Debug, Clone, PartialEq)]
struct Attach {
    engine: EngineKind,
    source: String,
    with_drm: bool,
}

/// Answers every load from a queue of outcomes (default: ready) and records what was attached.
#[derive(Default)]
struct Script {
    outcomes: Mutex<VecDeque<Outcome>>,
    attaches: Mutex<Vec<Attach>>,
    levels_set: Mutex<Vec<i32>>,
    errors: Mutex<Option<UnboundedSender<EngineError>>>,
}

impl Script {
    fn new(outcomes: impl IntoIterator<Item = Outcome>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            ..Self::default()
        })
    }

    fn next(&self, engine: EngineKind, source: &str, with_drm: bool) -> Outcome {
        self.attaches.lock().unwrap().push(Attach {
            engine,
            source: source.to_string(),
            with_drm,
        });
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Outcome::Ready(Vec::new()))
    }

    fn attaches(&self) -> Vec<Attach> {
        self.attaches.lock().unwrap().clone()
    }

    /// Reports an error on the most recently loaded engine.
    fn report(&self, error: EngineError) {
        let errors = self.errors.lock().unwrap();
        errors.as_ref().unwrap().send(error).unwrap();
    }

    fn error_channel(&self) -> UnboundedReceiver<EngineError> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.errors.lock().unwrap() = Some(tx);
        rx
    }
}

async fn settle(outcome: Outcome) -> Result<bool, EngineError> {
    match outcome {
        Outcome::Ready(_) => Ok(false),
        Outcome::Live => Ok(true),
        Outcome::Fail(e) => Err(e),
        Outcome::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(false)
        }
    }
}

struct FakeSurface {
    autoplay_blocked: bool,
}

#[async_trait]
impl MediaSurface for FakeSurface {
    async fn play(&self) -> Result<(), PlayError> {
        if self.autoplay_blocked {
            Err(PlayError::AutoplayBlocked("NotAllowedError".to_string()))
        } else {
            Ok(())
        }
    }
    fn pause(&self) -> Result<(), EngineError> {
        Ok(())
    }
    fn detach_source(&self) -> Result<(), EngineError> {
        Ok(())
    }
    fn remove(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

struct FakeEmbed {
    script: Arc<Script>,
}

#[async_trait]
impl EmbedFrame for FakeEmbed {
    async fn load(&self, src: &str) -> Result<(), EngineError> {
        settle(self.script.next(EngineKind::EmbeddedVideo, src, false))
            .await
            .map(|_| ())
    }
    fn remove(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

struct FakeAdaptive {
    script: Arc<Script>,
    errors: Mutex<Option<UnboundedReceiver<EngineError>>>,
}

#[async_trait]
impl AdaptiveEngine for FakeAdaptive {
    fn attach_media(&self, _surface: Arc<dyn MediaSurface>) -> Result<(), EngineError> {
        Ok(())
    }
    async fn load_source(&self, manifest: &str) -> Result<Vec<QualityLevel>, EngineError> {
        match self.script.next(EngineKind::AdaptiveHttp, manifest, false) {
            Outcome::Ready(levels) => Ok(levels),
            other => settle(other).await.map(|_| Vec::new()),
        }
    }
    fn take_errors(&self) -> Option<UnboundedReceiver<EngineError>> {
        self.errors.lock().unwrap().take()
    }
    fn set_current_level(&self, level: i32) {
        self.script.levels_set.lock().unwrap().push(level);
    }
    fn stop_load(&self) -> Result<(), EngineError> {
        Ok(())
    }
    fn destroy(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

struct FakeEncrypted {
    script: Arc<Script>,
    with_drm: Mutex<bool>,
    live: Mutex<bool>,
    errors: Mutex<Option<UnboundedReceiver<EngineError>>>,
}

#[async_trait]
impl EncryptedEngine for FakeEncrypted {
    async fn attach(&self, _surface: Arc<dyn MediaSurface>) -> Result<(), EngineError> {
        Ok(())
    }
    fn configure(
        &self,
        drm: Option<&DrmConfig>,
        _streaming: &StreamingProfile,
    ) -> Result<(), EngineError> {
        *self.with_drm.lock().unwrap() = drm.is_some();
        Ok(())
    }
    async fn load(&self, manifest: &str) -> Result<(), EngineError> {
        let with_drm = *self.with_drm.lock().unwrap();
        let live = settle(self.script.next(EngineKind::EncryptedAdaptive, manifest, with_drm)).await?;
        *self.live.lock().unwrap() = live;
        Ok(())
    }
    fn take_errors(&self) -> Option<UnboundedReceiver<EngineError>> {
        self.errors.lock().unwrap().take()
    }
    fn is_live(&self) -> bool {
        *self.live.lock().unwrap()
    }
    fn destroy(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

struct FakeFactory {
    script: Arc<Script>,
    autoplay_blocked: bool,
}

impl EngineFactory for FakeFactory {
    fn create_surface(&self) -> Arc<dyn MediaSurface> {
        Arc::new(FakeSurface {
            autoplay_blocked: self.autoplay_blocked,
        })
    }
    fn create_embed(&self) -> Arc<dyn EmbedFrame> {
        Arc::new(FakeEmbed {
            script: Arc::clone(&self.script),
        })
    }
    fn create_adaptive(&self, _profile: &BufferProfile) -> Result<Arc<dyn AdaptiveEngine>, EngineError> {
        Ok(Arc::new(FakeAdaptive {
            script: Arc::clone(&self.script),
            errors: Mutex::new(Some(self.script.error_channel())),
        }))
    }
    fn create_encrypted(&self) -> Result<Arc<dyn EncryptedEngine>, EngineError> {
        Ok(Arc::new(FakeEncrypted {
            script: Arc::clone(&self.script),
            with_drm: Mutex::new(false),
            live: Mutex::new(false),
            errors: Mutex::new(Some(self.script.error_channel())),
        }))
    }
}

/// A platform whose capability queries never answer.
struct SilentKeySystems;

#[async_trait]
impl KeySystemAccess for SilentKeySystems {
    async fn request_access(&self, _key_system: KeySystem) -> Result<(), ProbeError> {
        std::future::pending().await
    }
}

// --- catalog ---

struct StaticCatalog(Result<Vec<Value>, String>);

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn fetch(&self) -> Result<Vec<Value>, CatalogError> {
        self.0.clone().map_err(CatalogError::Parse)
    }
    fn describe(&self) -> String {
        "static".to_string()
    }
}

fn catalog() -> StaticCatalog {
    StaticCatalog(Ok(vec![
        json!({"name": "Alpha", "type": "mpd", "link": "https://cdn.test/alpha.mpd"}),
        json!({"name": "Beta", "type": "mpd", "link": "https://cdn.test/beta.mpd"}),
        json!({"name": "News", "type": "hls", "link": "https://cdn.test/news.m3u8"}),
        json!({
            "name": "Secure",
            "type": "dash",
            "link": "https://cdn.test/secure.mpd",
            "licenseServer": "https://license.test/wv"
        }),
        json!({"name": "Clip", "type": "youtube", "link": "https://video.test/embed/x"}),
        json!({"name": "Odd", "type": "rtmp", "link": "rtmp://x/live"}),
    ]))
}

const ALPHA: usize = 0;
const BETA: usize = 1;
const NEWS: usize = 2;
const SECURE: usize = 3;
const CLIP: usize = 4;
const ODD: usize = 5;

// --- harness ---

struct Harness {
    player: Player,
    board: Arc<StatusBoard>,
    script: Arc<Script>,
}

fn test_config() -> PlayerConfig {
    PlayerConfig::default()
        .with_fallback_delay(0)
        .with_autoplay_delay(0)
}

async fn harness(config: PlayerConfig, outcomes: Vec<Outcome>, autoplay_blocked: bool) -> Harness {
    let key_systems = StaticKeySystems {
        widevine: true,
        clearkey: true,
        playready: false,
    };
    harness_with_keys(config, outcomes, autoplay_blocked, Arc::new(key_systems)).await
}

async fn harness_with_keys(
    config: PlayerConfig,
    outcomes: Vec<Outcome>,
    autoplay_blocked: bool,
    key_systems: Arc<dyn KeySystemAccess>,
) -> Harness {
    let script = Script::new(outcomes);
    let board = Arc::new(StatusBoard::new());
    let factory = FakeFactory {
        script: Arc::clone(&script),
        autoplay_blocked,
    };
    let player = Player::new(config, Arc::new(factory), key_systems, board.clone());
    player.load_catalog(&catalog(), false).await.unwrap();
    Harness {
        player,
        board,
        script,
    }
}

fn generic() -> EngineError {
    EngineError::fatal(codes::BAD_HTTP_STATUS, "Bad HTTP status")
}

fn level(height: u32, bitrate: u64) -> QualityLevel {
    QualityLevel {
        height: Some(height),
        bitrate: Some(bitrate),
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

// --- tests ---

#[tokio::test]
async fn encrypted_channel_gives_up_after_channel_ceiling() {
    let h = harness(test_config(), vec![Outcome::Fail(generic()); 5], false).await;

    let outcome = h.player.select_channel(ALPHA).unwrap().await.unwrap();
    assert_eq!(
        outcome,
        LoadOutcome::Failed {
            channel: ALPHA,
            message: "Unable to load".to_string()
        }
    );

    let engines: Vec<EngineKind> = h.script.attaches().iter().map(|a| a.engine).collect();
    assert_eq!(
        engines,
        [
            EngineKind::EncryptedAdaptive,
            EngineKind::EncryptedAdaptive,
            EngineKind::AdaptiveHttp,
            EngineKind::EncryptedAdaptive,
            EngineKind::AdaptiveHttp,
        ]
    );
    assert_eq!(h.script.attaches()[2].source, "https://cdn.test/alpha.m3u8");

    let counters = h.player.counters();
    assert_eq!((counters.global, counters.channel), (4, 2));
    assert_eq!(h.player.state(), PlaybackState::Failed);
    assert!(!h.player.is_switching());

    let view = h.board.snapshot();
    assert_eq!(view.channel_label, "Alpha - Unable to load");
    assert!(!view.loading);
    assert_eq!(h.player.failures().len(), 5);
    assert_eq!(h.player.events()[0].kind, EventKind::GaveUp);
}

#[tokio::test]
async fn global_ceiling_spans_channel_switches() {
    let config = test_config().with_max_total_retries(5);
    let h = harness(config, vec![Outcome::Fail(generic()); 7], false).await;

    h.player.select_channel(ALPHA).unwrap().await.unwrap();
    assert_eq!(h.player.counters().global, 4);

    let outcome = h.player.select_channel(BETA).unwrap().await.unwrap();
    assert_eq!(
        outcome,
        LoadOutcome::Failed {
            channel: BETA,
            message: "Maximum retries exceeded".to_string()
        }
    );
    assert_eq!(h.player.counters().global, 5);
    assert_eq!(h.player.counters().channel, 1);
    assert_eq!(h.board.snapshot().channel_label, "Beta - Maximum retries exceeded");
}

#[tokio::test]
async fn license_rejection_strips_drm_then_substitutes_clear_manifest() {
    let outcomes = vec![
        Outcome::Fail(EngineError::fatal(
            codes::KEY_SYSTEM_UNAVAILABLE,
            "Key system unavailable",
        )),
        Outcome::Fail(generic()),
        Outcome::Fail(generic()),
        Outcome::Ready(Vec::new()),
    ];
    let h = harness(test_config(), outcomes, false).await;

    let outcome = h.player.select_channel(SECURE).unwrap().await.unwrap();
    assert_eq!(
        outcome,
        LoadOutcome::Playing {
            channel: SECURE,
            engine: EngineKind::AdaptiveHttp,
            stage: AttemptStage::ClearSubstitute,
        }
    );

    let attaches = h.script.attaches();
    let drm: Vec<bool> = attaches.iter().map(|a| a.with_drm).collect();
    assert_eq!(drm, [true, false, true, false]);
    assert_eq!(attaches[1].source, "https://cdn.test/secure.mpd");
    assert_eq!(attaches[3].source, "https://cdn.test/secure.m3u8");

    let counters = h.player.counters();
    assert!(counters.drm_stripped);
    assert_eq!((counters.global, counters.channel), (3, 1));

    let failures = h.player.failures();
    let first = failures.last().unwrap();
    assert_eq!(first.failure_type, FailureType::License);
    assert_eq!(first.code, Some(codes::KEY_SYSTEM_UNAVAILABLE));
    assert_eq!(first.stage, Some(AttemptStage::Primary));

    assert_eq!(h.player.state(), PlaybackState::Playing);
    assert_eq!(h.board.snapshot().channel_label, "Secure");
}

#[tokio::test]
async fn second_selection_is_refused_while_loading() {
    let h = harness(test_config(), vec![Outcome::Hang], false).await;

    let _pending = h.player.select_channel(ALPHA).unwrap();
    assert_eq!(h.player.select_channel(BETA).unwrap_err(), SelectError::InFlight);
    assert!(h.player.is_switching());
    assert_eq!(h.player.current_channel().unwrap().index, ALPHA);
    assert_eq!(h.player.state(), PlaybackState::Loading);
    assert!(h.board.snapshot().loading);

    h.player.shutdown();
    assert!(!h.player.is_switching());
    assert_eq!(h.player.state(), PlaybackState::Idle);
}

#[tokio::test(start_paused = true)]
async fn stuck_load_is_force_released() {
    let config = test_config().with_switch_guard_timeout(8000);
    let h = harness(config, vec![Outcome::Hang], false).await;

    let stuck = h.player.select_channel(ALPHA).unwrap();
    tokio::time::sleep(Duration::from_millis(7000)).await;
    assert_eq!(h.player.select_channel(NEWS).unwrap_err(), SelectError::InFlight);

    tokio::time::sleep(Duration::from_millis(1001)).await;
    let outcome = h.player.select_channel(NEWS).unwrap().await.unwrap();
    assert!(matches!(outcome, LoadOutcome::Playing { channel: NEWS, .. }));
    assert_eq!(h.board.snapshot().channel_label, "News");
    stuck.abort();
}

#[tokio::test]
async fn multi_level_stream_offers_quality_menu() {
    let outcomes = vec![Outcome::Ready(vec![
        level(720, 2_500_000),
        QualityLevel {
            height: None,
            bitrate: None,
        },
    ])];
    let h = harness(test_config(), outcomes, false).await;

    let outcome = h.player.select_channel(NEWS).unwrap().await.unwrap();
    assert!(matches!(
        outcome,
        LoadOutcome::Playing {
            engine: EngineKind::AdaptiveHttp,
            stage: AttemptStage::Primary,
            ..
        }
    ));

    let labels: Vec<String> = h
        .board
        .snapshot()
        .quality_options
        .unwrap()
        .into_iter()
        .map(|o| o.label)
        .collect();
    assert_eq!(labels, ["Auto", "720p (2500kbps)", "Unknown"]);

    h.player.select_quality(QualityChoice::Level(1)).unwrap();
    h.player.select_quality(QualityChoice::Auto).unwrap();
    assert_eq!(*h.script.levels_set.lock().unwrap(), [1, -1]);
    assert!(h.player.select_quality(QualityChoice::Level(2)).is_err());

    h.player.shutdown();
    assert!(h.board.snapshot().quality_options.is_none());
    assert!(h.player.select_quality(QualityChoice::Auto).is_err());
}

#[tokio::test]
async fn single_level_stream_has_no_quality_menu() {
    let h = harness(test_config(), vec![Outcome::Ready(vec![level(1080, 5_000_000)])], false).await;
    h.player.select_channel(NEWS).unwrap().await.unwrap();
    assert!(h.board.snapshot().quality_options.is_none());
    assert_eq!(h.player.info().await.quality_levels.len(), 1);
}

#[tokio::test]
async fn blocked_autoplay_shows_prompt_but_keeps_playing() {
    let h = harness(test_config(), Vec::new(), true).await;

    h.player.select_channel(NEWS).unwrap().await.unwrap();

    assert_eq!(h.player.state(), PlaybackState::Playing);
    let view = h.board.snapshot();
    assert!(view.play_prompt);
    assert!(!view.loading);
    assert!(h
        .player
        .events()
        .iter()
        .any(|e| e.kind == EventKind::AutoplayBlocked));
}

#[tokio::test]
async fn live_encrypted_stream_shows_badge_until_next_selection() {
    let h = harness(test_config(), vec![Outcome::Live, Outcome::Ready(Vec::new())], false).await;

    h.player.select_channel(ALPHA).unwrap().await.unwrap();
    assert_eq!(h.board.snapshot().live_badge.as_deref(), Some(LIVE_BADGE));

    h.player.select_channel(NEWS).unwrap().await.unwrap();
    assert!(h.board.snapshot().live_badge.is_none());
}

#[tokio::test]
async fn fatal_error_after_load_resumes_fallback() {
    let h = harness(test_config(), Vec::new(), false).await;
    h.player.select_channel(ALPHA).unwrap().await.unwrap();

    h.script
        .report(EngineError::recoverable(codes::MEDIA_NETWORK, "Fragment load error"));
    wait_until(|| {
        h.player
            .events()
            .iter()
            .any(|e| e.kind == EventKind::EngineErrorIgnored)
    })
    .await;
    assert_eq!(h.player.state(), PlaybackState::Playing);
    assert_eq!(h.script.attaches().len(), 1);

    h.script
        .report(EngineError::fatal(codes::MEDIA_DECODE, "Decode error"));
    wait_until(|| {
        h.script.attaches().len() == 2
            && h.player.state() == PlaybackState::Playing
            && !h.player.is_switching()
    })
    .await;

    let failure = &h.player.failures()[0];
    assert_eq!(failure.failure_type, FailureType::EngineRuntime);
    assert_eq!(failure.engine, EngineKind::EncryptedAdaptive);
    assert_eq!(h.player.counters().channel, 1);
}

#[tokio::test]
async fn recoverable_adaptive_errors_are_ignored() {
    let h = harness(test_config(), Vec::new(), false).await;
    h.player.select_channel(NEWS).unwrap().await.unwrap();

    h.script
        .report(EngineError::recoverable(codes::MEDIA_NETWORK, "Fragment load error"));
    wait_until(|| {
        h.player
            .events()
            .iter()
            .any(|e| e.kind == EventKind::EngineErrorIgnored)
    })
    .await;

    assert_eq!(h.player.state(), PlaybackState::Playing);
    assert_eq!(h.script.attaches().len(), 1);
    assert!(h.player.failures().is_empty());
    assert_eq!(h.player.counters().global, 0);
    assert_eq!(h.board.snapshot().channel_label, "News");
}

#[tokio::test(start_paused = true)]
async fn unanswered_drm_probe_blocks_no_channel() {
    let config = test_config().with_drm_probe_timeout(3000);
    let h = harness_with_keys(config, Vec::new(), false, Arc::new(SilentKeySystems)).await;

    let outcome = h.player.select_channel(NEWS).unwrap().await.unwrap();
    assert!(matches!(outcome, LoadOutcome::Playing { channel: NEWS, .. }));
    let outcome = h.player.select_channel(CLIP).unwrap().await.unwrap();
    assert!(matches!(outcome, LoadOutcome::Playing { channel: CLIP, .. }));
    assert_eq!(h.player.info().await.drm_support, None);

    let started = tokio::time::Instant::now();
    let outcome = h.player.select_channel(SECURE).unwrap().await.unwrap();
    assert!(started.elapsed() < PlayerConfig::default().switch_guard_timeout);
    assert_eq!(
        outcome,
        LoadOutcome::Playing {
            channel: SECURE,
            engine: EngineKind::EncryptedAdaptive,
            stage: AttemptStage::Primary,
        }
    );
    assert_eq!(h.player.info().await.drm_support, Some(DrmSupport::default()));
    let last = h.script.attaches().pop().unwrap();
    assert!(!last.with_drm);
    assert!(!h.player.is_switching());
}

#[tokio::test]
async fn channels_without_fallback_path_fail_with_error_label() {
    let h = harness(test_config(), vec![Outcome::Fail(generic())], false).await;

    let outcome = h.player.select_channel(NEWS).unwrap().await.unwrap();
    assert_eq!(
        outcome,
        LoadOutcome::Failed {
            channel: NEWS,
            message: "Playback failed".to_string()
        }
    );
    assert_eq!(
        h.board.snapshot().channel_label,
        "News - Error: Bad HTTP status"
    );
    assert_eq!(h.player.counters().global, 0);

    let outcome = h.player.select_channel(ODD).unwrap().await.unwrap();
    assert!(matches!(outcome, LoadOutcome::Failed { .. }));
    assert_eq!(
        h.board.snapshot().channel_label,
        "Odd - Error: Unsupported stream type: rtmp"
    );
    assert_eq!(h.player.failures()[0].failure_type, FailureType::Channel);
    assert_eq!(h.script.attaches().len(), 1);
}

#[tokio::test]
async fn embedded_channel_plays_in_frame() {
    let h = harness(test_config(), Vec::new(), true).await;

    let outcome = h.player.select_channel(CLIP).unwrap().await.unwrap();
    assert_eq!(
        outcome,
        LoadOutcome::Playing {
            channel: CLIP,
            engine: EngineKind::EmbeddedVideo,
            stage: AttemptStage::Primary,
        }
    );
    // Frames have no surface, so there is nothing to be refused.
    assert!(!h.board.snapshot().play_prompt);
    let info = h.player.info().await;
    assert_eq!(info.engine, EngineKind::EmbeddedVideo);
    assert!(!info.surface_attached);
}

#[tokio::test]
async fn selection_bounds_are_checked() {
    let h = harness(test_config(), Vec::new(), false).await;
    assert_eq!(
        h.player.select_channel(42).unwrap_err(),
        SelectError::UnknownChannel(42)
    );
    assert!(!h.player.is_switching());
}

#[tokio::test]
async fn catalog_failure_and_empty_catalog_set_labels() {
    let h = harness(test_config(), Vec::new(), false).await;

    let err = h
        .player
        .load_catalog(&StaticCatalog(Err("expected value".to_string())), true)
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Parse(_)));
    assert_eq!(h.board.snapshot().channel_label, "Failed to load channels");
    assert!(h.player.channels().is_empty());
    assert_eq!(h.player.failures()[0].failure_type, FailureType::Catalog);
    assert_eq!(h.player.select_channel(0).unwrap_err(), SelectError::NoCatalog);

    let count = h
        .player
        .load_catalog(&StaticCatalog(Ok(Vec::new())), true)
        .await
        .unwrap();
    assert_eq!(count, 0);
    assert_eq!(h.board.snapshot().channel_label, "No channels available");
}

#[tokio::test]
async fn autoplay_selects_first_channel() {
    let h = harness(test_config(), Vec::new(), false).await;
    assert_eq!(h.board.snapshot().channel_label, "Alpha");
    assert_eq!(h.player.state(), PlaybackState::Idle);

    h.player.load_catalog(&catalog(), true).await.unwrap();
    wait_until(|| h.player.state() == PlaybackState::Playing && !h.player.is_switching()).await;

    assert_eq!(h.player.current_channel().unwrap().index, ALPHA);
    let info = h.player.info().await;
    assert_eq!(info.channel_count, 6);
    assert_eq!(info.engine, EngineKind::EncryptedAdaptive);
    assert!(info.drm_support.unwrap().widevine);
}
