use std::time::Instant;

/// Elapsed time and derived delta for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTime {
    /// Seconds since the clock started.
    pub elapsed: f64,
    /// Seconds since the previous frame, never negative.
    pub delta: f32,
}

#[derive(Debug, Clone, Copy)]
enum Source {
    Wall(Instant),
    Manual(f64),
}

/// Frame clock: monotonically increasing elapsed time plus the previous
/// frame's reading.
///
/// `Clock::wall` reads `Instant`; `Clock::manual` only moves when told to,
/// which is what headless runs and tests use.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    source: Source,
    previous: f64,
    frames: u64,
}

impl Clock {
    pub fn wall() -> Self {
        Self {
            source: Source::Wall(Instant::now()),
            previous: 0.0,
            frames: 0,
        }
    }

    pub fn manual() -> Self {
        Self {
            source: Source::Manual(0.0),
            previous: 0.0,
            frames: 0,
        }
    }

    /// Current elapsed reading, without consuming a frame.
    pub fn elapsed(&self) -> f64 {
        match self.source {
            Source::Wall(start) => start.elapsed().as_secs_f64(),
            Source::Manual(t) => t,
        }
    }

    /// Elapsed reading taken at the previous [`Clock::tick`].
    pub fn previous(&self) -> f64 {
        self.previous
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Move a manual clock forward. Negative or non-finite amounts are ignored;
    /// wall clocks ignore this entirely.
    pub fn advance(&mut self, seconds: f64) {
        if let Source::Manual(t) = &mut self.source {
            if seconds.is_finite() && seconds > 0.0 {
                *t += seconds;
            }
        }
    }

    /// Read the clock for a new frame: `delta = current - previous`, then
    /// `previous = current`.
    pub fn tick(&mut self) -> FrameTime {
        let elapsed = self.elapsed().max(self.previous);
        let delta = (elapsed - self.previous) as f32;
        self.previous = elapsed;
        self.frames += 1;
        FrameTime {
            elapsed,
            delta: if delta.is_finite() { delta.max(0.0) } else { 0.0 },
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::wall()
    }
}
