//! The authoritative scene clock.
//!
//! Every motion formula reads time from the [`Tick`] produced here, never from
//! the wall clock, so a scene behaves identically under a fixed-step test
//! driver and a real frame loop.

/// Time information for one frame of one scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tick {
    /// Frames completed before this one.
    pub frame: u64,
    /// Scene time at the end of this tick, in seconds.
    pub time: f32,
    /// Seconds advanced by this tick.
    pub dt: f32,
}

/// Scene-local clock, advanced exactly once per update.
#[derive(Clone, Debug)]
pub struct SceneClock {
    time: f32,
    frame: u64,
    max_dt: f32,
}

impl Default for SceneClock {
    fn default() -> Self {
        Self::new(f32::INFINITY)
    }
}

impl SceneClock {
    /// Create a clock at time zero that clamps each step to `max_dt`.
    pub fn new(max_dt: f32) -> Self {
        Self {
            time: 0.0,
            frame: 0,
            max_dt,
        }
    }

    /// Current scene time in seconds.
    pub fn now(&self) -> f32 {
        self.time
    }

    /// Frames advanced so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Advance by `dt` seconds.
    ///
    /// Negative or non-finite steps count as zero; steps longer than `max_dt`
    /// are clamped so a stalled host does not fast-forward through phases.
    pub fn advance(&mut self, dt: f32) -> Tick {
        let dt = if dt.is_finite() && dt > 0.0 {
            dt.min(self.max_dt)
        } else {
            0.0
        };
        let tick = Tick {
            frame: self.frame,
            time: self.time + dt,
            dt,
        };
        self.time = tick.time;
        self.frame += 1;
        tick
    }
}
