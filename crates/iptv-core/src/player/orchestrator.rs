use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::error::{FailureRing, FailureType, PlaybackFailure};
use super::event::{EventKind, EventRing, PlayerEvent};
use super::fallback::{AttemptStage, FallbackAction, FallbackPolicy, RetryCounters, Terminal};
use super::guard::SwitchGuard;
use super::ledger::ResourceLedger;
use super::state::{ChannelRef, PlaybackState, PlayerInfo};
use crate::catalog::{validate_channels, CatalogError, CatalogSource, Channel, ChannelKind};
use crate::config::{BufferProfile, PlayerConfig, StreamingProfile};
use crate::drm::{DrmConfig, DrmSupport, DrmSupportCache, KeySystemAccess};
use crate::engine::{
    build_plan, codes, quality_options, EngineError, EngineFactory, EngineHandle, EngineKind,
    EnginePlan, MediaSurface, PlayError, QualityChoice, QualityLevel,
};
use crate::view::PlayerView;

pub const LIVE_BADGE: &str = "● LIVE";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectError {
    #[error("A channel load is already in progress")]
    InFlight,
    #[error("No channel at index {0}")]
    UnknownChannel(usize),
    #[error("No channels loaded")]
    NoCatalog,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QualityError {
    #[error("No adaptive engine attached")]
    NoAdaptiveEngine,
    #[error("No quality level {0}")]
    UnknownLevel(usize),
}

/// How one selection (or one post-load recovery) ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoadOutcome {
    Playing {
        channel: usize,
        engine: EngineKind,
        stage: AttemptStage,
    },
    Failed {
        channel: usize,
        message: String,
    },
    /// A newer selection or a shutdown took over.
    Superseded,
}

enum Attempt {
    Started,
    Failed(EngineError),
    Superseded,
}

enum Next {
    Retry(EnginePlan, AttemptStage),
    Stop(LoadOutcome),
}

/// The playback orchestrator. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct Player {
    inner: Arc<Inner>,
}

struct Inner {
    config: PlayerConfig,
    policy: FallbackPolicy,
    factory: Arc<dyn EngineFactory>,
    drm: DrmSupportCache,
    view: Arc<dyn PlayerView>,
    guard: Arc<SwitchGuard>,
    channels: Mutex<Vec<Channel>>,
    ledger: Mutex<ResourceLedger>,
    state: Mutex<PlaybackState>,
    current: Mutex<Option<usize>>,
    counters: Mutex<RetryCounters>,
    levels: Mutex<Vec<QualityLevel>>,
    events: Mutex<EventRing>,
    failures: Mutex<FailureRing>,
}

impl Player {
    pub fn new(
        config: PlayerConfig,
        factory: Arc<dyn EngineFactory>,
        key_systems: Arc<dyn KeySystemAccess>,
        view: Arc<dyn PlayerView>,
    ) -> Self {
        let inner = Inner {
            policy: FallbackPolicy::from_config(&config),
            events: Mutex::new(EventRing::new(config.event_limit)),
            failures: Mutex::new(FailureRing::new(config.error_limit)),
            drm: DrmSupportCache::new(key_systems, config.drm_probe_timeout),
            config,
            factory,
            view,
            guard: Arc::new(SwitchGuard::default()),
            channels: Mutex::new(Vec::new()),
            ledger: Mutex::new(ResourceLedger::new()),
            state: Mutex::new(PlaybackState::Idle),
            current: Mutex::new(None),
            counters: Mutex::new(RetryCounters::default()),
            levels: Mutex::new(Vec::new()),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.inner.config
    }

    pub fn state(&self) -> PlaybackState {
        *lock(&self.inner.state)
    }

    pub fn channels(&self) -> Vec<Channel> {
        lock(&self.inner.channels).clone()
    }

    pub fn current_channel(&self) -> Option<Channel> {
        let index = (*lock(&self.inner.current))?;
        lock(&self.inner.channels).get(index).cloned()
    }

    pub fn counters(&self) -> RetryCounters {
        *lock(&self.inner.counters)
    }

    /// Whether a load currently holds the switch guard.
    pub fn is_switching(&self) -> bool {
        self.inner.guard.is_held()
    }

    pub fn events(&self) -> Vec<PlayerEvent> {
        lock(&self.inner.events).list()
    }

    pub fn failures(&self) -> Vec<PlaybackFailure> {
        lock(&self.inner.failures).list()
    }

    pub fn clear_failures(&self) {
        lock(&self.inner.failures).clear();
    }

    /// Probes key systems on first use; cached afterwards.
    pub async fn drm_support(&self) -> DrmSupport {
        self.inner.drm.get().await
    }

    pub async fn info(&self) -> PlayerInfo {
        let drm_support = self.inner.drm.peek().await;
        let (engine, surface_attached) = {
            let ledger = lock(&self.inner.ledger);
            (ledger.engine_kind(), ledger.surface().is_some())
        };
        let channel = self.current_channel().map(|c| ChannelRef {
            index: c.index,
            name: c.name,
        });
        PlayerInfo {
            state: self.state(),
            channel,
            engine,
            surface_attached,
            drm_support,
            retries: self.counters(),
            switching: self.is_switching(),
            quality_levels: lock(&self.inner.levels).clone(),
            channel_count: lock(&self.inner.channels).len(),
        }
    }

    /// Replaces the channel list from `source`. With `autoplay`, the first
    /// channel is selected after the configured delay.
    pub async fn load_catalog(
        &self,
        source: &dyn CatalogSource,
        autoplay: bool,
    ) -> Result<usize, CatalogError> {
        let records = match source.fetch().await {
            Ok(records) => records,
            Err(e) => {
                error!(source = %source.describe(), error = %e, "Failed to load channels");
                lock(&self.inner.channels).clear();
                self.inner.view.set_channel_label("Failed to load channels");
                self.record_failure(PlaybackFailure::new(
                    FailureType::Catalog,
                    None,
                    "",
                    e.to_string(),
                ));
                self.record_event(EventKind::CatalogFailed, None, e.to_string());
                return Err(e);
            }
        };

        let channels = validate_channels(&records);
        let count = channels.len();
        let first = channels.first().map(|c| c.name.clone());
        *lock(&self.inner.channels) = channels;
        lock(&self.inner.counters).reset_channel();
        info!(count, source = %source.describe(), "Channels loaded");
        self.record_event(EventKind::CatalogLoaded, None, format!("{count} channels"));

        match first {
            None => {
                warn!("Channel list is empty");
                self.inner.view.set_channel_label("No channels available");
            }
            Some(name) => {
                self.inner.view.set_channel_label(&name);
                if autoplay {
                    self.schedule_autoplay();
                }
            }
        }
        Ok(count)
    }

    /// Starts loading channel `index` in a background task.
    ///
    /// Refused while another load holds the switch guard; the refusal is the
    /// whole effect, nothing is queued. Must be called within a Tokio runtime.
    pub fn select_channel(&self, index: usize) -> Result<JoinHandle<LoadOutcome>, SelectError> {
        let channel = {
            let channels = lock(&self.inner.channels);
            if channels.is_empty() {
                return Err(SelectError::NoCatalog);
            }
            channels
                .get(index)
                .cloned()
                .ok_or(SelectError::UnknownChannel(index))?
        };
        let epoch = self
            .inner
            .guard
            .acquire(self.inner.config.switch_guard_timeout)
            .ok_or(SelectError::InFlight)?;

        lock(&self.inner.counters).reset_channel();
        *lock(&self.inner.current) = Some(index);
        lock(&self.inner.ledger).reset();
        self.transition(PlaybackState::Loading);
        self.inner.view.set_channel_label(&channel.name);
        self.inner.view.show_loader(true);

        info!(channel = index, name = %channel.name, kind = %channel.kind, epoch, "Channel selected");
        self.record_event(EventKind::ChannelSelected, Some(index), channel.name.clone());

        Ok(tokio::spawn(self.clone().run_selection(epoch, channel)))
    }

    /// Pins the adaptive engine to a level, or back to automatic selection.
    pub fn select_quality(&self, choice: QualityChoice) -> Result<(), QualityError> {
        let engine = match lock(&self.inner.ledger).engine() {
            Some(EngineHandle::Adaptive(engine)) => Arc::clone(engine),
            _ => return Err(QualityError::NoAdaptiveEngine),
        };
        if let QualityChoice::Level(level) = choice {
            if level >= lock(&self.inner.levels).len() {
                return Err(QualityError::UnknownLevel(level));
            }
        }
        engine.set_current_level(choice.engine_level());
        info!(level = choice.engine_level(), "Quality changed");
        self.record_event(
            EventKind::QualityChanged,
            *lock(&self.inner.current),
            choice.engine_level().to_string(),
        );
        Ok(())
    }

    /// Tears the session down and abandons any load in flight.
    pub fn shutdown(&self) {
        self.inner.guard.invalidate();
        lock(&self.inner.ledger).reset();
        lock(&self.inner.levels).clear();
        self.transition(PlaybackState::Idle);
        self.inner.view.show_loader(false);
        self.inner.view.show_play_prompt(false);
        info!("Player shut down");
        self.record_event(EventKind::Shutdown, None, "");
    }

    fn schedule_autoplay(&self) {
        let player = self.clone();
        let delay = self.inner.config.autoplay_delay;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(e) = player.select_channel(0) {
                debug!(error = %e, "Autoplay skipped");
            }
        });
        lock(&self.inner.ledger).register_timer(timer);
    }

    /// Key systems only matter to encrypted channels; others never wait on the probe.
    async fn support_for(&self, channel: &Channel) -> DrmSupport {
        if channel.kind == ChannelKind::EncryptedAdaptive {
            self.inner.drm.get().await
        } else {
            DrmSupport::default()
        }
    }

    async fn run_selection(self, epoch: u64, channel: Channel) -> LoadOutcome {
        let support = self.support_for(&channel).await;
        let outcome = if !self.is_current(epoch) {
            LoadOutcome::Superseded
        } else {
            match build_plan(&channel, &support, &self.inner.config) {
                Ok(plan) => self.drive(epoch, &channel, plan, AttemptStage::Primary).await,
                Err(error) => {
                    let failure = self.classify(&error, false);
                    match self
                        .fall_back(epoch, &channel, EngineKind::None, AttemptStage::Primary, &error, failure)
                        .await
                    {
                        Next::Retry(plan, stage) => self.drive(epoch, &channel, plan, stage).await,
                        Next::Stop(outcome) => outcome,
                    }
                }
            }
        };
        self.inner.guard.release(epoch);
        debug!(channel = channel.index, ?outcome, "Selection finished");
        outcome
    }

    /// Post-load fatal error: resumes the fallback chain under the guard.
    fn recover(
        &self,
        epoch: u64,
        channel: Channel,
        engine: EngineKind,
        stage: AttemptStage,
        error: EngineError,
    ) -> BoxFuture<'static, ()> {
        let player = self.clone();
        async move {
            let timeout = player.inner.config.switch_guard_timeout;
            if !player.inner.guard.resume(epoch, timeout) {
                debug!(channel = channel.index, "Recovery skipped, session superseded");
                return;
            }
            let failure = player.classify(&error, true);
            let outcome = match player
                .fall_back(epoch, &channel, engine, stage, &error, failure)
                .await
            {
                Next::Retry(plan, stage) => player.drive(epoch, &channel, plan, stage).await,
                Next::Stop(outcome) => outcome,
            };
            player.inner.guard.release(epoch);
            debug!(channel = channel.index, ?outcome, "Recovery finished");
        }
        .boxed()
    }

    async fn drive(
        &self,
        epoch: u64,
        channel: &Channel,
        mut plan: EnginePlan,
        mut stage: AttemptStage,
    ) -> LoadOutcome {
        loop {
            let error = match self.attempt(epoch, channel, &plan, stage).await {
                Attempt::Started => {
                    return LoadOutcome::Playing {
                        channel: channel.index,
                        engine: plan.engine_kind(),
                        stage,
                    }
                }
                Attempt::Superseded => return LoadOutcome::Superseded,
                Attempt::Failed(error) => error,
            };
            let failure = self.classify(&error, false);
            match self
                .fall_back(epoch, channel, plan.engine_kind(), stage, &error, failure)
                .await
            {
                Next::Retry(next, next_stage) => {
                    plan = next;
                    stage = next_stage;
                }
                Next::Stop(outcome) => return outcome,
            }
        }
    }

    async fn fall_back(
        &self,
        epoch: u64,
        channel: &Channel,
        engine: EngineKind,
        stage: AttemptStage,
        error: &EngineError,
        failure: FailureType,
    ) -> Next {
        if !self.is_current(epoch) {
            return Next::Stop(LoadOutcome::Superseded);
        }
        self.show_failure(channel, engine, stage, error, failure);

        let action = {
            let mut counters = lock(&self.inner.counters);
            self.inner
                .policy
                .decide(&mut counters, &channel.link, stage, error)
        };
        let config = &self.inner.config;
        let (plan, next_stage) = match action {
            FallbackAction::GiveUp(terminal) => {
                return Next::Stop(self.give_up(channel, terminal));
            }
            FallbackAction::StripDrm => {
                let support = self.support_for(channel).await;
                match build_plan(&channel.without_drm(), &support, config) {
                    Ok(plan) => (plan, AttemptStage::DrmStripped),
                    Err(e) => {
                        warn!(channel = channel.index, error = %e, "Cannot rebuild plan without DRM");
                        return Next::Stop(self.give_up(channel, Terminal::FailedToLoad));
                    }
                }
            }
            FallbackAction::RetryEncrypted => {
                let drm = Some(DrmConfig::from_channel_credentials(channel)).filter(|d| !d.is_empty());
                (
                    EnginePlan::encrypted(&channel.link, drm, config),
                    AttemptStage::EncryptedOverride,
                )
            }
            FallbackAction::SubstituteClear { link } => (
                EnginePlan::adaptive(link, config),
                AttemptStage::ClearSubstitute,
            ),
        };

        let counters = self.counters();
        info!(
            channel = channel.index,
            from = %stage,
            to = %next_stage,
            source = plan.source(),
            global = counters.global,
            attempt = counters.channel,
            "Falling back"
        );
        self.record_event(
            EventKind::FallbackAttempt,
            Some(channel.index),
            format!("{stage} -> {next_stage}"),
        );

        if !config.fallback_delay.is_zero() {
            tokio::time::sleep(config.fallback_delay).await;
        }
        if !self.is_current(epoch) {
            return Next::Stop(LoadOutcome::Superseded);
        }
        Next::Retry(plan, next_stage)
    }

    async fn attempt(
        &self,
        epoch: u64,
        channel: &Channel,
        plan: &EnginePlan,
        stage: AttemptStage,
    ) -> Attempt {
        if !self.begin_attempt(epoch, channel) {
            return Attempt::Superseded;
        }
        debug!(channel = channel.index, engine = %plan.engine_kind(), %stage, source = plan.source(), "Attaching engine");

        match plan {
            EnginePlan::Embed { src } => self.attach_embed(epoch, src).await,
            EnginePlan::Adaptive { manifest, profile } => {
                self.attach_adaptive(epoch, channel, stage, manifest, profile)
                    .await
            }
            EnginePlan::Encrypted {
                manifest,
                drm,
                streaming,
            } => {
                self.attach_encrypted(epoch, channel, stage, manifest, drm.as_ref(), streaming)
                    .await
            }
        }
    }

    /// Resets the session for a fresh attach. False when `epoch` is stale.
    fn begin_attempt(&self, epoch: u64, channel: &Channel) -> bool {
        {
            let mut ledger = lock(&self.inner.ledger);
            if !self.is_current(epoch) {
                return false;
            }
            ledger.reset();
        }
        lock(&self.inner.levels).clear();
        self.transition(PlaybackState::Loading);
        let view = &self.inner.view;
        view.set_channel_label(&channel.name);
        view.show_loader(true);
        view.show_play_prompt(false);
        view.set_quality_options(None);
        true
    }

    async fn attach_embed(&self, epoch: u64, src: &str) -> Attempt {
        let frame = self.inner.factory.create_embed();
        if !self.install(epoch, None, EngineHandle::Embed(Arc::clone(&frame))) {
            return Attempt::Superseded;
        }
        let loaded = frame.load(src).await;
        if !self.is_current(epoch) {
            return Attempt::Superseded;
        }
        match loaded {
            Ok(()) => self.started(epoch, EngineKind::EmbeddedVideo, None).await,
            Err(error) => Attempt::Failed(error),
        }
    }

    async fn attach_adaptive(
        &self,
        epoch: u64,
        channel: &Channel,
        stage: AttemptStage,
        manifest: &str,
        profile: &BufferProfile,
    ) -> Attempt {
        let surface = self.inner.factory.create_surface();
        let engine = match self.inner.factory.create_adaptive(profile) {
            Ok(engine) => engine,
            Err(error) => return Attempt::Failed(error),
        };
        let handle = EngineHandle::Adaptive(Arc::clone(&engine));
        if !self.install(epoch, Some(Arc::clone(&surface)), handle) {
            return Attempt::Superseded;
        }
        if let Err(error) = engine.attach_media(Arc::clone(&surface)) {
            return Attempt::Failed(error);
        }
        let errors = engine.take_errors();
        let loaded = engine.load_source(manifest).await;
        if !self.is_current(epoch) {
            return Attempt::Superseded;
        }
        let levels = match loaded {
            Ok(levels) => levels,
            Err(error) => return Attempt::Failed(error),
        };

        self.publish_levels(epoch, levels);
        if let Some(errors) = errors {
            self.watch_errors(epoch, channel, EngineKind::AdaptiveHttp, stage, errors);
        }
        self.started(epoch, EngineKind::AdaptiveHttp, Some(surface)).await
    }

    async fn attach_encrypted(
        &self,
        epoch: u64,
        channel: &Channel,
        stage: AttemptStage,
        manifest: &str,
        drm: Option<&DrmConfig>,
        streaming: &StreamingProfile,
    ) -> Attempt {
        let surface = self.inner.factory.create_surface();
        let engine = match self.inner.factory.create_encrypted() {
            Ok(engine) => engine,
            Err(error) => return Attempt::Failed(error),
        };
        let handle = EngineHandle::Encrypted(Arc::clone(&engine));
        if !self.install(epoch, Some(Arc::clone(&surface)), handle) {
            return Attempt::Superseded;
        }
        let attached = engine.attach(Arc::clone(&surface)).await;
        if !self.is_current(epoch) {
            return Attempt::Superseded;
        }
        if let Err(error) = attached.and_then(|()| engine.configure(drm, streaming)) {
            return Attempt::Failed(error);
        }
        debug!(
            key_system = ?drm.and_then(DrmConfig::key_system),
            "Encrypted engine configured"
        );

        let errors = engine.take_errors();
        let loaded = engine.load(manifest).await;
        if !self.is_current(epoch) {
            return Attempt::Superseded;
        }
        if let Err(error) = loaded {
            return Attempt::Failed(error);
        }

        if engine.is_live() {
            let view = Arc::clone(&self.inner.view);
            if self.register_teardown(epoch, move || view.show_live_badge(None)) {
                self.inner.view.show_live_badge(Some(LIVE_BADGE));
            }
        }
        if let Some(errors) = errors {
            self.watch_errors(epoch, channel, EngineKind::EncryptedAdaptive, stage, errors);
        }
        self.started(epoch, EngineKind::EncryptedAdaptive, Some(surface)).await
    }

    /// Starts playback and marks the session playing. A refused autoplay
    /// only brings up the play prompt.
    async fn started(
        &self,
        epoch: u64,
        engine: EngineKind,
        surface: Option<Arc<dyn MediaSurface>>,
    ) -> Attempt {
        let current = *lock(&self.inner.current);
        if let Some(surface) = surface {
            let played = surface.play().await;
            if !self.is_current(epoch) {
                return Attempt::Superseded;
            }
            match played {
                Ok(()) => {}
                Err(PlayError::AutoplayBlocked(reason)) => {
                    info!(%reason, "Autoplay prevented, waiting for user");
                    self.inner.view.show_play_prompt(true);
                    self.record_event(EventKind::AutoplayBlocked, current, reason);
                }
                Err(PlayError::Failed(reason)) => {
                    warn!(%reason, "Playback did not start on its own");
                    self.inner.view.show_play_prompt(true);
                }
            }
        }
        self.inner.view.show_loader(false);
        self.transition(PlaybackState::Playing);
        info!(channel = ?current, %engine, "Playing");
        self.record_event(EventKind::Playing, current, engine.to_string());
        Attempt::Started
    }

    /// Records the engine (and surface) in the ledger, or releases them at
    /// once when a newer selection already owns the session.
    fn install(
        &self,
        epoch: u64,
        surface: Option<Arc<dyn MediaSurface>>,
        engine: EngineHandle,
    ) -> bool {
        let mut ledger = lock(&self.inner.ledger);
        if self.is_current(epoch) {
            if let Some(surface) = surface {
                ledger.set_surface(surface);
            }
            ledger.set_engine(engine);
            return true;
        }
        drop(ledger);

        debug!(epoch, engine = %engine.kind(), "Releasing engine of superseded load");
        let mut orphan = ResourceLedger::new();
        if let Some(surface) = surface {
            orphan.set_surface(surface);
        }
        orphan.set_engine(engine);
        false
    }

    fn register_teardown(&self, epoch: u64, action: impl FnOnce() + Send + 'static) -> bool {
        let mut ledger = lock(&self.inner.ledger);
        if !self.is_current(epoch) {
            return false;
        }
        ledger.register_teardown(action);
        true
    }

    fn publish_levels(&self, epoch: u64, levels: Vec<QualityLevel>) {
        if levels.len() > 1 {
            let view = Arc::clone(&self.inner.view);
            if self.register_teardown(epoch, move || view.set_quality_options(None)) {
                self.inner
                    .view
                    .set_quality_options(Some(&quality_options(&levels)));
            }
        }
        *lock(&self.inner.levels) = levels;
    }

    /// Listens for errors reported after load. Non-fatal ones are logged and
    /// dropped; the first fatal one hands over to recovery in a new task, since
    /// recovery resets the ledger this listener is registered in.
    fn watch_errors(
        &self,
        epoch: u64,
        channel: &Channel,
        engine: EngineKind,
        stage: AttemptStage,
        mut errors: UnboundedReceiver<EngineError>,
    ) {
        let player = self.clone();
        let channel = channel.clone();
        let watcher = tokio::spawn(async move {
            while let Some(error) = errors.recv().await {
                if !player.is_current(epoch) {
                    return;
                }
                if !error.fatal {
                    debug!(channel = channel.index, code = error.code, error = %error.message, "Ignoring non-fatal engine error");
                    player.record_event(
                        EventKind::EngineErrorIgnored,
                        Some(channel.index),
                        error.to_string(),
                    );
                    continue;
                }
                warn!(channel = channel.index, %engine, code = error.code, error = %error.message, "Fatal engine error after load");
                tokio::spawn(player.recover(epoch, channel, engine, stage, error));
                return;
            }
        });

        let mut ledger = lock(&self.inner.ledger);
        if self.is_current(epoch) {
            ledger.register_timer(watcher);
        } else {
            watcher.abort();
        }
    }

    fn show_failure(
        &self,
        channel: &Channel,
        engine: EngineKind,
        stage: AttemptStage,
        error: &EngineError,
        failure: FailureType,
    ) {
        warn!(
            channel = channel.index,
            name = %channel.name,
            %engine,
            %stage,
            code = error.code,
            error = %error.message,
            "Channel load failed"
        );
        let view = &self.inner.view;
        view.show_loader(false);
        view.set_channel_label(&format!("{} - Error: {}", channel.name, error.message));
        self.transition(PlaybackState::Failed);
        self.record_failure(
            PlaybackFailure::new(failure, Some(channel.index), &channel.name, &error.message)
                .with_engine(engine, stage)
                .with_code(error.code),
        );
    }

    fn give_up(&self, channel: &Channel, terminal: Terminal) -> LoadOutcome {
        // The error annotation already on the label stays for channels without a fallback path.
        if terminal != Terminal::PlaybackFailed {
            self.inner
                .view
                .set_channel_label(&format!("{} - {}", channel.name, terminal));
        }
        let counters = self.counters();
        error!(
            channel = channel.index,
            name = %channel.name,
            reason = %terminal,
            global = counters.global,
            attempts = counters.channel,
            "Giving up on channel"
        );
        self.record_event(EventKind::GaveUp, Some(channel.index), terminal.message());
        LoadOutcome::Failed {
            channel: channel.index,
            message: terminal.message().to_string(),
        }
    }

    fn classify(&self, error: &EngineError, after_load: bool) -> FailureType {
        if self.inner.config.is_license_error(error.code) {
            FailureType::License
        } else if matches!(error.code, codes::NO_STREAM_LINK | codes::UNSUPPORTED_TYPE) {
            FailureType::Channel
        } else if after_load {
            FailureType::EngineRuntime
        } else {
            FailureType::EngineLoad
        }
    }

    fn transition(&self, target: PlaybackState) {
        let mut state = lock(&self.inner.state);
        let from = *state;
        if from == target {
            return;
        }
        if !from.can_transition_to(target) {
            warn!(%from, to = %target, "Ignoring invalid state transition");
            return;
        }
        debug!(%from, to = %target, "State transition");
        *state = target;
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.inner.guard.is_current(epoch)
    }

    fn record_event(&self, kind: EventKind, channel: Option<usize>, details: impl Into<String>) {
        lock(&self.inner.events).push(PlayerEvent::new(kind, channel, details));
    }

    fn record_failure(&self, failure: PlaybackFailure) {
        lock(&self.inner.failures).push(failure);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
