pub const IDLE_PULSE_SPEED: f64 = 0.05;
pub const THINKING_PULSE_SPEED: f64 = 0.15;
const BREATHING_INTENSITY: f64 = 0.15;
const THINKING_GLOW: f64 = 0.5;

/// Eye pulse state, advanced once per animation tick.
#[derive(Debug, Clone, PartialEq)]
pub struct EyeAnimation {
    frame: u64,
    pulse_speed: f64,
    glow: f64,
    speaking: bool,
}

impl Default for EyeAnimation {
    fn default() -> Self {
        Self {
            frame: 0,
            pulse_speed: IDLE_PULSE_SPEED,
            glow: 0.0,
            speaking: false,
        }
    }
}

impl EyeAnimation {
    pub fn tick(&mut self) {
        self.frame += 1;
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn pulse_speed(&self) -> f64 {
        self.pulse_speed
    }

    /// Scale factor around 1.0 for the eye at the current frame.
    pub fn pulse_factor(&self) -> f64 {
        1.0 + BREATHING_INTENSITY * (self.frame as f64 * self.pulse_speed).sin()
    }

    /// Glow in `0.0..=1.0`; while speaking it oscillates on its own.
    pub fn glow(&self) -> f64 {
        if self.speaking {
            0.3 + 0.2 * (self.frame as f64 * 0.2).sin()
        } else {
            self.glow
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    pub fn set_speaking(&mut self, speaking: bool) {
        self.speaking = speaking;
    }

    /// Speeds the pulse up while a request is in flight and returns the speed
    /// to restore afterwards.
    pub fn begin_thinking(&mut self) -> f64 {
        let previous = self.pulse_speed;
        self.pulse_speed = THINKING_PULSE_SPEED;
        self.glow = THINKING_GLOW;
        previous
    }

    pub fn reset(&mut self, pulse_speed: f64) {
        self.pulse_speed = pulse_speed;
        self.glow = 0.0;
    }

    /// Intensity bucket `0..=3` used by the terminal renderer.
    pub fn intensity_level(&self) -> u8 {
        let brightness = (self.pulse_factor() - (1.0 - BREATHING_INTENSITY)) / (2.0 * BREATHING_INTENSITY);
        let level = (brightness.clamp(0.0, 1.0) * 2.0).round() as u8;
        if self.glow() > 0.0 {
            (level + 1).min(3)
        } else {
            level
        }
    }
}
