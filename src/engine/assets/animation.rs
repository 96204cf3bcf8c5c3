// Sprite animation playback

/// Distance kept from the frame count when a finite animation ends
pub const FRAME_EPSILON: f32 = 0.0001;

/// Frames per second used when a sheet does not specify a speed
const DEFAULT_SPEED: f32 = 5.0;

/// Default playback settings stored with an animated asset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationTemplate {
    /// Number of frames in the sheet
    pub frame_count: usize,
    /// Frames advanced per second
    pub speed: f32,
    /// Loop forever instead of stopping on the last frame
    pub endless: bool,
    /// Play from the last frame towards the first
    pub reverse: bool,
    /// Pause in seconds between two loops
    pub interval_margin: f32,
    /// Pause in seconds before the first frame after `start`
    pub delay: f32,
}

impl AnimationTemplate {
    pub fn new(frame_count: usize) -> Self {
        Self {
            frame_count,
            speed: DEFAULT_SPEED,
            endless: true,
            reverse: false,
            interval_margin: 0.0,
            delay: 0.0,
        }
    }

    /// Apply `key=value` playback hints separated by `;` or `,`
    ///
    /// Recognized: `fps=<f>`, `margin=<f>`, `delay=<f>`, `once`, `reverse`.
    pub fn with_hints(mut self, hints: &str) -> Self {
        for hint in hints.split([';', ',']).map(str::trim) {
            let (key, value) = match hint.split_once('=') {
                Some((k, v)) => (k.trim(), Some(v.trim())),
                None => (hint, None),
            };
            let number = value.and_then(|v| v.parse::<f32>().ok());
            match (key, number) {
                ("fps", Some(v)) => self.speed = v.max(0.0),
                ("margin", Some(v)) => self.interval_margin = v.max(0.0),
                ("delay", Some(v)) => self.delay = v.max(0.0),
                ("once", _) => self.endless = false,
                ("reverse", _) => self.reverse = true,
                _ => {}
            }
        }
        self
    }
}

/// Per-handle playback cursor over an animated sheet
#[derive(Debug, Clone)]
pub struct AnimationClock {
    frame: f32,
    frame_count: usize,
    speed: f32,
    reverse: bool,
    pause: f32,
    delay: f32,
    interval_margin: f32,
    endless: bool,
    finished: bool,
    running: bool,
}

impl AnimationClock {
    /// A running, endless clock over `frame_count` frames
    pub fn new(frame_count: usize) -> Self {
        Self::from_template(&AnimationTemplate::new(frame_count))
    }

    pub fn from_template(template: &AnimationTemplate) -> Self {
        let frame = if template.reverse && template.frame_count > 0 {
            template.frame_count as f32 - FRAME_EPSILON
        } else {
            0.0
        };
        Self {
            frame,
            frame_count: template.frame_count,
            speed: template.speed,
            reverse: template.reverse,
            pause: template.delay,
            delay: template.delay,
            interval_margin: template.interval_margin,
            endless: template.endless,
            finished: false,
            running: true,
        }
    }

    /// Advance by `elapsed` seconds
    pub fn update(&mut self, elapsed: f32) {
        if self.finished || self.frame_count == 0 || !self.running {
            return;
        }

        if self.pause > 0.0 {
            self.pause -= elapsed;
            return;
        }

        let count = self.frame_count as f32;
        let step = elapsed * self.speed;

        if !self.endless {
            if !self.reverse {
                self.frame += step;
                if self.frame > count - FRAME_EPSILON {
                    self.frame = count - FRAME_EPSILON;
                    self.finish();
                }
            } else {
                self.frame -= step;
                if self.frame < 0.0 {
                    self.frame = 0.0;
                    self.finish();
                }
            }
        } else if !self.reverse {
            self.frame += step;
            if self.frame >= count {
                self.frame %= count;
                self.pause = self.interval_margin;
            }
        } else {
            self.frame -= step;
            if self.frame < 0.0 {
                self.frame = self.frame.rem_euclid(count);
                self.pause = self.interval_margin;
            }
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.running = false;
    }

    /// Restart playback after the configured delay
    pub fn start(&mut self) {
        self.finished = false;
        self.running = true;
        self.pause = self.delay;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn go_first_frame(&mut self) {
        self.frame = 0.0;
    }

    pub fn go_last_frame(&mut self) {
        self.frame = self.frame_count as f32 - FRAME_EPSILON;
    }

    /// Displayed frame index, always below the frame count
    pub fn frame(&self) -> usize {
        (self.frame.max(0.0).floor() as usize).min(self.frame_count.saturating_sub(1))
    }

    /// Raw cursor position
    pub fn position(&self) -> f32 {
        self.frame
    }

    pub fn set_frame(&mut self, frame: usize) {
        self.frame = frame.min(self.frame_count.saturating_sub(1)) as f32;
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// Shrink (or grow) the sheet, keeping the cursor inside it
    pub fn set_frame_count(&mut self, frame_count: usize) {
        self.frame_count = frame_count;
        let count = frame_count as f32;
        if self.frame >= count {
            self.frame = (count - FRAME_EPSILON).max(0.0);
        }
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed.max(0.0);
    }

    pub fn is_reverse(&self) -> bool {
        self.reverse
    }

    pub fn set_reverse(&mut self, reverse: bool) {
        self.reverse = reverse;
    }

    pub fn is_endless(&self) -> bool {
        self.endless
    }

    pub fn set_endless(&mut self, endless: bool) {
        self.endless = endless;
    }

    pub fn interval_margin(&self) -> f32 {
        self.interval_margin
    }

    pub fn set_interval_margin(&mut self, margin: f32) {
        self.interval_margin = margin;
    }

    pub fn delay(&self) -> f32 {
        self.delay
    }

    /// Set the start delay; also pauses the clock for that long right away
    pub fn set_delay(&mut self, delay: f32) {
        self.delay = delay;
        self.pause = delay;
    }

    /// Remaining pause before the cursor moves again
    pub fn pause_remaining(&self) -> f32 {
        self.pause
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
