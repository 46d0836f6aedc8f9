pub mod error;
pub mod event;
pub mod fallback;
pub(crate) mod guard;
pub mod ledger;
pub mod orchestrator;
pub mod state;

pub use error::{FailureRing, FailureType, PlaybackFailure};
pub use event::{EventKind, EventRing, PlayerEvent};
pub use fallback::{AttemptStage, FallbackAction, FallbackPolicy, RetryCounters, Terminal};
pub use ledger::ResourceLedger;
pub use orchestrator::{LoadOutcome, Player, QualityError, SelectError, LIVE_BADGE};
pub use state::{ChannelRef, PlaybackState, PlayerInfo};
