//! Core library for the driving scenario choreography engine.
//!
//! A chosen action is classified into a maneuver [`Intent`], and the
//! [`Choreographer`] plays that intent's [`Choreography`] across the stage's
//! motion channels, sprite frames and visibility flag. Each module owns one
//! piece of that pipeline; the application crate wires them to a CLI.

pub mod choreographer;
pub mod choreography;
pub mod config;
pub mod error;
pub mod intent;
pub mod motion;
pub mod render;
pub mod scenario;
pub mod stage;
pub mod timeline;

pub use choreographer::{
    Choreographer, Completion, CompletionState, RunHandle, RunReport, RunState,
};
pub use choreography::{ChannelSeeds, Choreography, Effect, Move, Phase, RunParams, Target};
pub use config::{AppConfig, PlaybackConfig, StageConfig};
pub use error::{ChoreoError, Result};
pub use intent::{classify, Intent};
pub use motion::{AnimationTicket, ChannelId, Easing, Generation, MotionChannel};
pub use render::{SnapshotLog, StageSnapshot};
pub use scenario::{Choice, Decision, Scenario};
pub use stage::{Facing, SpriteFrameController, Stage, VisibilityController};
pub use timeline::FrameClock;
