//! Background music volume envelope.
//!
//! Two independent schedules: a short duck from full volume to the sustain
//! level, and a long step-wise fade to silence.

use std::time::Duration;

/// One scheduled volume change, as an offset from the start of its schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeStep {
    pub at: Duration,
    pub volume: f32,
}

/// Volume envelope for the background loop.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeEnvelope {
    /// Volume when the loop starts
    pub full_volume: f32,
    /// Volume held after the initial duck
    pub sustain_volume: f32,
    /// Time at full volume before ducking
    pub sustain_delay: Duration,
    /// Length of the duck ramp
    pub sustain_ramp: Duration,
    /// Number of steps in the duck ramp
    pub sustain_ramp_steps: u32,
    /// Time from loop start until the fade-out begins
    pub fade_out_delay: Duration,
    /// Length of the fade to silence
    pub fade_out: Duration,
    /// Number of equal decrements in the fade
    pub fade_out_steps: u32,
}

impl Default for VolumeEnvelope {
    fn default() -> Self {
        Self {
            full_volume: 1.0,
            sustain_volume: 0.3,
            sustain_delay: Duration::from_secs(5),
            sustain_ramp: Duration::from_secs(1),
            sustain_ramp_steps: 10,
            fade_out_delay: Duration::from_secs(6),
            fade_out: Duration::from_secs(55),
            fade_out_steps: 110,
        }
    }
}

impl VolumeEnvelope {
    /// Steps of the duck from full to sustain volume, offsets from loop start.
    pub fn duck_schedule(&self) -> Vec<VolumeStep> {
        let steps = self.sustain_ramp_steps.max(1);
        let interval = self.sustain_ramp / steps;
        let span = self.sustain_volume - self.full_volume;

        (1..=steps)
            .map(|i| {
                let fraction = i as f32 / steps as f32;
                VolumeStep {
                    at: self.sustain_delay + interval * i,
                    volume: (self.full_volume + span * fraction).clamp(0.0, 1.0),
                }
            })
            .collect()
    }

    /// Steps of the fade from `from` to silence, offsets from the fade start.
    ///
    /// Every step removes the same amount; the last step lands exactly on zero.
    pub fn fade_schedule(&self, from: f32) -> Vec<VolumeStep> {
        let steps = self.fade_out_steps.max(1);
        let interval = self.fade_out / steps;
        let from = from.clamp(0.0, 1.0);
        let decrement = from / steps as f32;

        (1..=steps)
            .map(|i| VolumeStep {
                at: interval * i,
                volume: if i == steps {
                    0.0
                } else {
                    (from - decrement * i as f32).max(0.0)
                },
            })
            .collect()
    }

    /// Total time from loop start until the music falls silent.
    pub fn total_duration(&self) -> Duration {
        self.fade_out_delay + self.fade_out
    }
}
