use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::motion::{AnimationTicket, ChannelId, MotionChannel};

/// Heading of the player sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Facing {
    #[default]
    North,
    NorthEast,
    NorthWest,
}

/// Frame index into a sprite sheet of `count` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteFrame {
    index: u32,
    count: u32,
}

impl SpriteFrame {
    pub fn new(count: u32) -> Self {
        Self {
            index: 0,
            count: count.max(1),
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    fn set(&mut self, index: u32) {
        self.index = index % self.count;
    }

    fn step(&mut self) {
        self.index = (self.index + 1) % self.count;
    }
}

/// Discrete sprite state for both vehicles.
#[derive(Debug, Clone)]
pub struct SpriteFrameController {
    player: SpriteFrame,
    non_player: SpriteFrame,
    facing: Facing,
}

impl Default for SpriteFrameController {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl SpriteFrameController {
    pub fn new(player_frames: u32, non_player_frames: u32) -> Self {
        Self {
            player: SpriteFrame::new(player_frames),
            non_player: SpriteFrame::new(non_player_frames),
            facing: Facing::North,
        }
    }

    /// Returns both frame indices to 0 and the player to facing north.
    pub fn reset(&mut self) {
        self.player.set(0);
        self.non_player.set(0);
        self.facing = Facing::North;
    }

    /// Steps both sheets to their next frame, wrapping around.
    pub fn advance(&mut self) {
        self.player.step();
        self.non_player.step();
    }

    pub fn player_frame(&self) -> u32 {
        self.player.index()
    }

    pub fn non_player_frame(&self) -> u32 {
        self.non_player.index()
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn set_player_frame(&mut self, index: u32) {
        self.player.set(index);
    }

    pub fn set_non_player_frame(&mut self, index: u32) {
        self.non_player.set(index);
    }

    pub fn set_facing(&mut self, facing: Facing) {
        self.facing = facing;
    }
}

/// Presence flag for the non-player vehicle.
#[derive(Debug, Clone)]
pub struct VisibilityController {
    visible: bool,
}

impl Default for VisibilityController {
    fn default() -> Self {
        Self { visible: true }
    }
}

impl VisibilityController {
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn show(&mut self) {
        self.set(true);
    }

    pub fn hide(&mut self) {
        self.set(false);
    }
}

/// All state shared between the choreographer (sole writer) and the
/// rendering layer (reader).
#[derive(Debug, Clone)]
pub struct Stage {
    scroll: MotionChannel,
    lane: MotionChannel,
    non_player_offset: MotionChannel,
    pub sprites: SpriteFrameController,
    pub visibility: VisibilityController,
}

impl Default for Stage {
    fn default() -> Self {
        Self::new(SpriteFrameController::default())
    }
}

impl Stage {
    /// Creates a stage with undefined channel values.
    pub fn new(sprites: SpriteFrameController) -> Self {
        Self {
            scroll: MotionChannel::new(ChannelId::Scroll),
            lane: MotionChannel::new(ChannelId::Lane),
            non_player_offset: MotionChannel::new(ChannelId::NonPlayerOffset),
            sprites,
            visibility: VisibilityController::default(),
        }
    }

    pub fn channel(&self, id: ChannelId) -> &MotionChannel {
        match id {
            ChannelId::Scroll => &self.scroll,
            ChannelId::Lane => &self.lane,
            ChannelId::NonPlayerOffset => &self.non_player_offset,
        }
    }

    pub fn channel_mut(&mut self, id: ChannelId) -> &mut MotionChannel {
        match id {
            ChannelId::Scroll => &mut self.scroll,
            ChannelId::Lane => &mut self.lane,
            ChannelId::NonPlayerOffset => &mut self.non_player_offset,
        }
    }

    pub fn value(&self, id: ChannelId) -> f32 {
        self.channel(id).value()
    }

    /// Advances every channel by `dt` and collects the tickets of tweens
    /// that settled during this step.
    pub fn advance(&mut self, dt: Duration) -> Vec<AnimationTicket> {
        ChannelId::ALL
            .iter()
            .filter_map(|id| self.channel_mut(*id).advance(dt))
            .collect()
    }
}
