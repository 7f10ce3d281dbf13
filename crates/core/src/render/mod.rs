use std::time::Duration;

use serde::Serialize;

use crate::{
    motion::ChannelId,
    stage::{Facing, Stage},
};

/// Everything the renderer reads from the stage for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSnapshot {
    pub time_ms: u64,
    pub scroll: f32,
    pub lane: f32,
    pub non_player_offset: f32,
    pub player_frame: u32,
    pub non_player_frame: u32,
    pub facing: Facing,
    pub non_player_visible: bool,
}

impl StageSnapshot {
    pub fn capture(stage: &Stage, time: Duration) -> Self {
        Self {
            time_ms: time.as_millis() as u64,
            scroll: stage.value(ChannelId::Scroll),
            lane: stage.value(ChannelId::Lane),
            non_player_offset: stage.value(ChannelId::NonPlayerOffset),
            player_frame: stage.sprites.player_frame(),
            non_player_frame: stage.sprites.non_player_frame(),
            facing: stage.sprites.facing(),
            non_player_visible: stage.visibility.is_visible(),
        }
    }
}

/// Records a snapshot every `stride` frames.
#[derive(Debug, Default)]
pub struct SnapshotLog {
    stride: u64,
    seen: u64,
    frames: Vec<StageSnapshot>,
}

impl SnapshotLog {
    pub fn new(stride: u64) -> Self {
        Self {
            stride: stride.max(1),
            seen: 0,
            frames: Vec::new(),
        }
    }

    pub fn record(&mut self, stage: &Stage, time: Duration) {
        if self.seen % self.stride.max(1) == 0 {
            self.frames.push(StageSnapshot::capture(stage, time));
        }
        self.seen += 1;
    }

    pub fn frames(&self) -> &[StageSnapshot] {
        &self.frames
    }

    pub fn last(&self) -> Option<&StageSnapshot> {
        self.frames.last()
    }
}
