//! Pre-match countdown clock

use serde::Serialize;

use crate::config::ArenaConfig;

/// What the renderer should draw for the countdown this frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CountdownView {
    /// 0-based phase; phase 0 shows the highest number
    pub phase: usize,
    pub phases: usize,
    /// Glyph edge length in pixels
    pub size: f32,
    pub opacity: f32,
}

/// Fixed-length countdown made of equal phases. Within a phase the glyph
/// shrinks and fades linearly; both reset when the next phase begins.
#[derive(Debug, Clone)]
pub struct Countdown {
    frame: u32,
    phases: usize,
    frames_per_phase: u32,
    max_size: f32,
    shrink_rate: f32,
    size: f32,
    opacity: f32,
}

impl Countdown {
    pub fn new(config: &ArenaConfig) -> Self {
        Self {
            frame: 0,
            phases: config.countdown_phases.max(1),
            frames_per_phase: config.countdown_frames_per_phase.max(1),
            max_size: config.countdown_glyph_size,
            shrink_rate: config.countdown_shrink_rate,
            size: config.countdown_glyph_size,
            opacity: 1.0,
        }
    }

    pub fn total_frames(&self) -> u32 {
        self.phases as u32 * self.frames_per_phase
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn is_finished(&self) -> bool {
        self.frame >= self.total_frames()
    }

    pub fn phase(&self) -> usize {
        ((self.frame / self.frames_per_phase) as usize).min(self.phases - 1)
    }

    /// Advance one frame. Returns true once every phase has elapsed.
    pub fn advance(&mut self) -> bool {
        if self.is_finished() {
            return true;
        }
        self.frame += 1;
        self.size -= self.max_size * self.shrink_rate;
        self.opacity -= 1.0 / self.frames_per_phase as f32;

        if self.is_finished() {
            return true;
        }
        if self.frame % self.frames_per_phase == 0 {
            self.size = self.max_size;
            self.opacity = 1.0;
        }
        false
    }

    pub fn view(&self) -> CountdownView {
        CountdownView {
            phase: self.phase(),
            phases: self.phases,
            size: self.size,
            opacity: self.opacity.max(0.0),
        }
    }
}
