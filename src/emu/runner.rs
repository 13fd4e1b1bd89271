use super::{Chip8Error, Processor, TickResult};

pub const DEFAULT_CPU_HZ: f32 = 500.0;
pub const TIMER_HZ: f32 = 60.0;

const TIMER_TIME_STEP: f32 = 1.0 / TIMER_HZ;

/// Drives a [`Processor`] at two independent cadences from wall-clock deltas.
pub struct Runner {
    processor: Processor,
    cpu_time_step: f32,
    cpu_dt_accumulator: f32,
    timer_dt_accumulator: f32,
    paused: bool,
}

impl Runner {
    pub fn new(processor: Processor, cpu_hz: f32) -> Self {
        Self {
            processor,
            cpu_time_step: 1.0 / cpu_hz,
            cpu_dt_accumulator: 0.0,
            timer_dt_accumulator: 0.0,
            paused: false,
        }
    }

    /// Update emulator by delta time, handles both CPU and timer cycles.
    ///
    /// Runs as many timer ticks and instruction ticks as have come due in `dt`
    /// seconds and returns how many instruction ticks ran. Stops at the first
    /// error; the failing tick is not retried.
    pub fn update(&mut self, dt: f32) -> Result<usize, Chip8Error> {
        if self.paused {
            return Ok(0);
        }

        self.cpu_dt_accumulator += dt;
        self.timer_dt_accumulator += dt;

        while self.timer_dt_accumulator >= TIMER_TIME_STEP {
            self.timer_dt_accumulator -= TIMER_TIME_STEP;
            self.processor.timer_tick();
        }

        let mut ticks = 0;
        while self.cpu_dt_accumulator >= self.cpu_time_step {
            self.cpu_dt_accumulator -= self.cpu_time_step;

            if let Err(e) = self.processor.tick() {
                // Don't try to catch up on a machine that just failed
                self.cpu_dt_accumulator = 0.0;
                return Err(e);
            }
            ticks += 1;
        }

        Ok(ticks)
    }

    /// Runs a single instruction tick regardless of elapsed time.
    pub fn step(&mut self) -> Result<TickResult, Chip8Error> {
        self.processor.tick()
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resumes without replaying the time spent paused.
    pub fn resume(&mut self) {
        self.paused = false;
        self.cpu_dt_accumulator = 0.0;
        self.timer_dt_accumulator = 0.0;
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Set the current key value (0x0 = no key).
    pub fn set_key(&mut self, key: u8) {
        self.processor.set_key(key)
    }

    pub fn processor(&self) -> &Processor {
        &self.processor
    }
}
