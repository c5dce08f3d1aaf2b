//! Cosmetic progress animation shown while a clip is being cut.
//!
//! The frames are driven by a fixed timer, not by the download or ffmpeg. Neither
//! tool reports progress the way they are invoked here.

use std::time::Duration;

pub const CLIPPING_LABEL: &str = "Clipping video...";
pub const DONE_LABEL: &str = "Done!";

/// Receives progress frames as whole percentages.
pub trait ProgressSink: Send {
    fn update(&mut self, percent: u8, label: &str);
}

/// Writes frames to the log.
#[derive(Debug, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn update(&mut self, percent: u8, label: &str) {
        tracing::info!(percent, "{label}");
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProgressAnimation {
    pub step: u8,
    pub ceiling: u8,
    pub frame_delay: Duration,
}

impl Default for ProgressAnimation {
    fn default() -> Self {
        Self {
            step: 8,
            ceiling: 80,
            frame_delay: Duration::from_millis(120),
        }
    }
}

impl ProgressAnimation {
    pub fn with_frame_delay(mut self, frame_delay: Duration) -> Self {
        self.frame_delay = frame_delay;
        self
    }

    /// Emits 0, step, 2*step, ... below the ceiling, sleeping after each frame.
    pub async fn run(&self, sink: &mut dyn ProgressSink) {
        let step = self.step.max(1);
        let mut percent = 0u8;
        while percent < self.ceiling {
            sink.update(percent, CLIPPING_LABEL);
            tokio::time::sleep(self.frame_delay).await;
            percent = percent.saturating_add(step);
        }
    }

    pub fn finish(&self, sink: &mut dyn ProgressSink) {
        sink.update(100, DONE_LABEL);
    }
}
