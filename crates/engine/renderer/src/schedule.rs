//! Per-frame decision whether the density field must be regenerated

use crate::scene::SceneState;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Which triggers cause a regeneration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegenerationPolicy {
    /// Regenerate every N frames; `None` disables the cadence trigger
    pub cadence_frames: Option<u32>,
    /// Regenerate when the generation window changes
    pub on_window_change: bool,
    /// Feed the frame clock into generation; otherwise time stays at 0
    pub animate: bool,
}

impl Default for RegenerationPolicy {
    fn default() -> Self {
        Self {
            cadence_frames: Some(5),
            on_window_change: true,
            animate: true,
        }
    }
}

impl RegenerationPolicy {
    /// Only regenerate when the window moves
    pub fn on_change_only() -> Self {
        Self {
            cadence_frames: None,
            on_window_change: true,
            animate: false,
        }
    }

    /// Only the fixed cadence
    pub fn cadence_only(frames: u32) -> Self {
        Self {
            cadence_frames: Some(frames),
            on_window_change: false,
            animate: true,
        }
    }

    fn cadence_due(&self, frame: u64) -> bool {
        match self.cadence_frames {
            Some(n) if n > 0 => frame % u64::from(n) == 0,
            _ => false,
        }
    }
}

/// Inputs for one density regeneration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensityRequest {
    pub target_size: Vec3,
    pub target_offset: Vec3,
    pub time: f32,
}

/// Why a regeneration was scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenerationReason {
    Initial,
    Cadence,
    WindowChanged,
    Forced,
}

/// Combines the cadence and change triggers into one decision per frame
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    pub policy: RegenerationPolicy,
    has_generated: bool,
    force_next: bool,
    regenerations: u64,
    last_reason: Option<RegenerationReason>,
}

impl FrameScheduler {
    pub fn new(policy: RegenerationPolicy) -> Self {
        Self {
            policy,
            has_generated: false,
            force_next: false,
            regenerations: 0,
            last_reason: None,
        }
    }

    /// Regenerate on the next frame regardless of triggers
    pub fn request_regeneration(&mut self) {
        self.force_next = true;
    }

    pub fn regenerations(&self) -> u64 {
        self.regenerations
    }

    pub fn last_reason(&self) -> Option<RegenerationReason> {
        self.last_reason
    }

    /// Decide for `frame`. Consumes the scene's window-changed signal.
    pub fn begin_frame(
        &mut self,
        scene: &mut SceneState,
        frame: u64,
        time: f32,
    ) -> Option<DensityRequest> {
        let window_changed = scene.take_window_changed();

        let reason = if !self.has_generated {
            Some(RegenerationReason::Initial)
        } else if self.force_next {
            Some(RegenerationReason::Forced)
        } else if self.policy.on_window_change && window_changed {
            Some(RegenerationReason::WindowChanged)
        } else if self.policy.cadence_due(frame) {
            Some(RegenerationReason::Cadence)
        } else {
            None
        }?;

        self.has_generated = true;
        self.force_next = false;
        self.regenerations += 1;
        self.last_reason = Some(reason);

        let generation = scene.generation();
        let request = DensityRequest {
            target_size: generation.sanitized_size(),
            target_offset: generation.domain_center,
            time: if self.policy.animate { time } else { 0.0 },
        };
        tracing::debug!(
            ?reason,
            frame,
            offset = ?request.target_offset,
            size = ?request.target_size,
            "Regenerating density field"
        );
        Some(request)
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(RegenerationPolicy::default())
    }
}
