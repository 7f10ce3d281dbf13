//! Static per-intent animation plans.
//!
//! A [`Choreography`] is an ordered list of [`Phase`]s. The moves inside a
//! phase run concurrently and the phase completes when the slowest of them
//! settles. Phases run strictly one after another. Side effects are bound to
//! phase boundaries: `on_enter` effects apply when the phase starts (after the
//! previous barrier), `on_settle` effects apply after the phase's own barrier.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    intent::Intent,
    motion::{ChannelId, Easing},
    stage::Facing,
};

/// Geometry and seed values supplied by the UI layer for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunParams {
    pub tile_size: f32,
    pub screen_width: f32,
    pub screen_height: f32,
    pub player_width: f32,
    pub non_player_height: f32,
    /// Lane the player moves into while overtaking.
    pub target_lane: Option<f32>,
    /// Lane the player returns to after overtaking.
    pub center_lane: Option<f32>,
    /// Channel values the UI wants in place before the run starts.
    #[serde(default)]
    pub seeds: ChannelSeeds,
    /// Non-player visibility the UI wants in place before the run starts.
    #[serde(default)]
    pub non_player_visible: Option<bool>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            tile_size: 64.0,
            screen_width: 320.0,
            screen_height: 640.0,
            player_width: 32.0,
            non_player_height: 64.0,
            target_lane: None,
            center_lane: None,
            seeds: ChannelSeeds::default(),
            non_player_visible: None,
        }
    }
}

impl RunParams {
    pub fn target_lane(&self) -> f32 {
        self.target_lane
            .unwrap_or(self.tile_size + self.tile_size / 2.0 - self.player_width / 2.0)
    }

    pub fn center_lane(&self) -> f32 {
        self.center_lane
            .unwrap_or(self.screen_width / 2.0 - self.player_width / 2.0)
    }

    /// Offset that puts the non-player vehicle fully below the screen.
    pub fn off_screen_offset(&self) -> f32 {
        self.screen_height + self.non_player_height
    }

    pub fn with_seeds(mut self, seeds: ChannelSeeds) -> Self {
        self.seeds = seeds;
        self
    }

    pub fn with_non_player_visible(mut self, visible: bool) -> Self {
        self.non_player_visible = Some(visible);
        self
    }
}

/// Optional starting values, one per channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelSeeds {
    pub scroll: Option<f32>,
    pub lane: Option<f32>,
    pub non_player_offset: Option<f32>,
}

impl ChannelSeeds {
    pub fn get(&self, id: ChannelId) -> Option<f32> {
        match id {
            ChannelId::Scroll => self.scroll,
            ChannelId::Lane => self.lane,
            ChannelId::NonPlayerOffset => self.non_player_offset,
        }
    }
}

/// Where a move ends, resolved against the channel when its phase starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    /// Absolute value.
    To(f32),
    /// Offset from the channel value at phase start.
    By(f32),
    /// The channel value recorded when the run started.
    RunOrigin,
}

impl Target {
    pub fn resolve(self, current: f32, origin: f32) -> f32 {
        match self {
            Self::To(value) => value,
            Self::By(delta) => current + delta,
            Self::RunOrigin => origin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Move {
    pub channel: ChannelId,
    pub target: Target,
    pub duration: Duration,
    pub easing: Easing,
}

impl Move {
    pub fn new(channel: ChannelId, target: Target, duration_ms: u64, easing: Easing) -> Self {
        Self {
            channel,
            target,
            duration: Duration::from_millis(duration_ms),
            easing,
        }
    }
}

/// Discrete side effects bound to a phase boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    HideNonPlayer,
    Face(Facing),
    /// Face toward the lane move of the phase being entered.
    SteerTowardLane,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Phase {
    pub moves: Vec<Move>,
    pub on_enter: Vec<Effect>,
    pub on_settle: Vec<Effect>,
}

impl Phase {
    /// A group of moves that run concurrently.
    pub fn parallel(moves: Vec<Move>) -> Self {
        Self {
            moves,
            ..Self::default()
        }
    }

    pub fn on_enter(mut self, effect: Effect) -> Self {
        self.on_enter.push(effect);
        self
    }

    pub fn on_settle(mut self, effect: Effect) -> Self {
        self.on_settle.push(effect);
        self
    }

    /// Longest member duration, which is when the barrier resolves.
    pub fn duration(&self) -> Duration {
        self.moves
            .iter()
            .map(|m| m.duration)
            .max()
            .unwrap_or(Duration::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Choreography {
    pub intent: Intent,
    pub phases: Vec<Phase>,
}

impl Choreography {
    pub fn new(intent: Intent, phases: Vec<Phase>) -> Self {
        Self { intent, phases }
    }

    pub fn for_intent(intent: Intent, params: &RunParams) -> Self {
        match intent {
            Intent::Proceed => Self::proceed(params),
            Intent::Stop => Self::stop(),
            Intent::Overtake => Self::overtake(params),
        }
    }

    /// Scroll forward two tiles.
    pub fn proceed(params: &RunParams) -> Self {
        let tile = params.tile_size;
        Self::new(
            Intent::Proceed,
            vec![Phase::parallel(vec![Move::new(
                ChannelId::Scroll,
                Target::By(-2.0 * tile),
                1000,
                Easing::EaseOut,
            )])],
        )
    }

    /// Lurch, then bounce back to where the run started.
    pub fn stop() -> Self {
        Self::new(
            Intent::Stop,
            vec![
                Phase::parallel(vec![Move::new(
                    ChannelId::Scroll,
                    Target::By(10.0),
                    200,
                    Easing::EaseOut,
                )]),
                Phase::parallel(vec![Move::new(
                    ChannelId::Scroll,
                    Target::RunOrigin,
                    300,
                    Easing::Bounce,
                )]),
            ],
        )
    }

    /// Change lane, pass the non-player vehicle, merge back to center.
    pub fn overtake(params: &RunParams) -> Self {
        let tile = params.tile_size;
        Self::new(
            Intent::Overtake,
            vec![
                Phase::parallel(vec![
                    Move::new(
                        ChannelId::Lane,
                        Target::To(params.target_lane()),
                        300,
                        Easing::EaseOut,
                    ),
                    Move::new(ChannelId::Scroll, Target::By(-0.5 * tile), 300, Easing::EaseOut),
                ])
                .on_enter(Effect::SteerTowardLane),
                Phase::parallel(vec![
                    Move::new(
                        ChannelId::NonPlayerOffset,
                        Target::To(params.off_screen_offset()),
                        1000,
                        Easing::Linear,
                    ),
                    Move::new(ChannelId::Scroll, Target::By(-3.0 * tile), 1000, Easing::Linear),
                ])
                .on_enter(Effect::Face(Facing::North))
                .on_settle(Effect::HideNonPlayer),
                Phase::parallel(vec![
                    Move::new(
                        ChannelId::Lane,
                        Target::To(params.center_lane()),
                        400,
                        Easing::EaseOut,
                    ),
                    Move::new(ChannelId::Scroll, Target::By(-0.5 * tile), 400, Easing::EaseOut),
                ])
                .on_enter(Effect::SteerTowardLane)
                .on_settle(Effect::Face(Facing::North)),
            ],
        )
    }

    /// Every channel any phase moves, deduplicated and in stable order.
    pub fn channels(&self) -> Vec<ChannelId> {
        let mut channels: Vec<ChannelId> = self
            .phases
            .iter()
            .flat_map(|phase| phase.moves.iter().map(|m| m.channel))
            .collect();
        channels.sort();
        channels.dedup();
        channels
    }

    /// Sum of the phase durations.
    pub fn duration(&self) -> Duration {
        self.phases.iter().map(Phase::duration).sum()
    }
}
