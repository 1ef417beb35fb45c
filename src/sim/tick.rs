use std::time::Instant;

/// Turns wall-clock frame instants into the per-frame dt the simulation
/// ticks with. One tick runs per frame; long stalls are capped so trains
/// never jump more than `max_dt` worth of track.
pub struct FrameClock {
    pub max_dt: f64,
    pub frame: u64,
    last_frame: Option<Instant>,
    fps_samples: Vec<f64>,
    pub fps: f64,
}

impl FrameClock {
    pub fn new(max_dt: f64) -> Self {
        Self {
            max_dt,
            frame: 0,
            last_frame: None,
            fps_samples: Vec::with_capacity(60),
            fps: 0.0,
        }
    }

    /// Call at the start of each frame. Returns the capped dt since the
    /// previous frame, or `None` on the very first frame.
    pub fn begin_frame(&mut self, now: Instant) -> Option<f64> {
        let dt = self.last_frame.map(|last| {
            let raw_dt = now.saturating_duration_since(last).as_secs_f64();
            if raw_dt > 0.0 {
                self.fps_samples.push(raw_dt);
                if self.fps_samples.len() > 60 {
                    self.fps_samples.remove(0);
                }
                let avg: f64 = self.fps_samples.iter().sum::<f64>() / self.fps_samples.len() as f64;
                self.fps = 1.0 / avg;
            }
            self.clamp(raw_dt)
        });
        self.last_frame = Some(now);
        self.frame += 1;
        dt
    }

    pub fn clamp(&self, dt: f64) -> f64 {
        dt.min(self.max_dt).max(0.0)
    }
}
