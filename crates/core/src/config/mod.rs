use std::{fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    choreography::RunParams,
    stage::{SpriteFrameController, Stage},
    ChoreoError, Result,
};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub stage: StageConfig,
    pub playback: PlaybackConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.stage.validate()?;
        if self.playback.fps == 0 {
            return Err(ChoreoError::invalid_config("playback.fps must be positive"));
        }
        Ok(())
    }
}

/// Geometry of the rendered stage, in screen units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub tile_size: f32,
    pub screen_width: f32,
    pub screen_height: f32,
    pub player_width: f32,
    pub player_height: f32,
    pub non_player_width: f32,
    pub non_player_height: f32,
    pub player_frames: u32,
    pub non_player_frames: u32,
    pub frame_interval_ms: u64,
    pub target_lane: Option<f32>,
    pub center_lane: Option<f32>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            tile_size: 64.0,
            screen_width: 384.0,
            screen_height: 768.0,
            player_width: 40.0,
            player_height: 72.0,
            non_player_width: 44.0,
            non_player_height: 96.0,
            player_frames: 4,
            non_player_frames: 4,
            frame_interval_ms: 100,
            target_lane: None,
            center_lane: None,
        }
    }
}

impl StageConfig {
    pub fn validate(&self) -> Result<()> {
        let dimensions = [
            ("tile_size", self.tile_size),
            ("screen_width", self.screen_width),
            ("screen_height", self.screen_height),
            ("player_width", self.player_width),
            ("player_height", self.player_height),
            ("non_player_width", self.non_player_width),
            ("non_player_height", self.non_player_height),
        ];
        for (name, value) in dimensions {
            if !(value.is_finite() && value > 0.0) {
                return Err(ChoreoError::invalid_config(format!(
                    "stage.{name} must be a positive number, got {value}"
                )));
            }
        }
        if self.player_frames == 0 || self.non_player_frames == 0 {
            return Err(ChoreoError::invalid_config(
                "sprite sheets need at least one frame",
            ));
        }
        Ok(())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Run parameters for this geometry, without channel seeds.
    pub fn run_params(&self) -> RunParams {
        RunParams {
            tile_size: self.tile_size,
            screen_width: self.screen_width,
            screen_height: self.screen_height,
            player_width: self.player_width,
            non_player_height: self.non_player_height,
            target_lane: self.target_lane,
            center_lane: self.center_lane,
            ..RunParams::default()
        }
    }

    /// Empty stage with sprite sheets sized for this configuration.
    pub fn build_stage(&self) -> Stage {
        Stage::new(SpriteFrameController::new(
            self.player_frames,
            self.non_player_frames,
        ))
    }
}

/// Settings for the fixed-step driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub fps: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { fps: 60 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "stage": { "tile_size": 48.0 } }"#).unwrap();
        assert_eq!(config.stage.tile_size, 48.0);
        assert_eq!(config.stage.screen_width, StageConfig::default().screen_width);
        assert_eq!(config.playback.fps, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_geometry() {
        let config = AppConfig {
            stage: StageConfig {
                screen_height: 0.0,
                ..StageConfig::default()
            },
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(format!("{err}").contains("screen_height"));
    }

    #[test]
    fn rejects_zero_fps() {
        let config = AppConfig {
            playback: PlaybackConfig { fps: 0 },
            ..AppConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ChoreoError::InvalidConfig(_))
        ));
    }

    #[test]
    fn run_params_carry_geometry_and_overrides() {
        let stage = StageConfig {
            center_lane: Some(150.0),
            ..StageConfig::default()
        };
        let params = stage.run_params();
        assert_eq!(params.tile_size, stage.tile_size);
        assert_eq!(params.center_lane(), 150.0);
        assert_eq!(params.target_lane(), 64.0 + 32.0 - 20.0);
        assert_eq!(params.seeds.scroll, None);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = AppConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ChoreoError::Io(_)));
    }
}
