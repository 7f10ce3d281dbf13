use std::time::Duration;

/// Fixed-step clock used to drive the choreographer without wall-clock time.
#[derive(Debug, Clone)]
pub struct FrameClock {
    frame: Duration,
    elapsed: Duration,
    frames: u64,
}

impl FrameClock {
    /// Creates a clock ticking at `fps` frames per second. Zero is treated
    /// as one.
    pub fn new(fps: u32) -> Self {
        let fps = fps.max(1);
        Self {
            frame: Duration::from_secs(1) / fps,
            elapsed: Duration::ZERO,
            frames: 0,
        }
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame
    }

    /// Advances one frame and returns its duration.
    pub fn tick(&mut self) -> Duration {
        self.elapsed += self.frame;
        self.frames += 1;
        self.frame
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
        self.frames = 0;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(60)
    }
}
