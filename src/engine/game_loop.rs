/// Fixed timestep loop driving deferred loads and sprite animation
///
/// Each tick drains one budgeted slice of the resource queue and advances
/// every sprite clock by the fixed step, so loading never stalls a frame.
use crate::engine::assets::{ResourceManager, SpriteHandle};
use std::time::{Duration, Instant};

/// Tick rate (60 per second)
pub const FIXED_TIMESTEP: f32 = 1.0 / 60.0;
const FIXED_TIMESTEP_DURATION: Duration = Duration::from_micros(16_667);

/// Maximum ticks per frame so a long stall does not snowball
const MAX_TICKS_PER_FRAME: u32 = 5;

pub struct GameLoop {
    accumulator: Duration,
    last_frame_time: Instant,
    paused: bool,
    frame_count: u64,
    tick_count: u64,
}

impl GameLoop {
    pub fn new() -> Self {
        Self {
            accumulator: Duration::ZERO,
            last_frame_time: Instant::now(),
            paused: false,
            frame_count: 0,
            tick_count: 0,
        }
    }

    /// Begin a new frame, returns the number of ticks to run
    pub fn begin_frame(&mut self) -> u32 {
        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame_time);
        self.last_frame_time = now;
        self.advance(frame_time)
    }

    /// Account `frame_time` and return the ticks it pays for
    pub fn advance(&mut self, frame_time: Duration) -> u32 {
        self.frame_count += 1;
        if self.paused {
            return 0;
        }

        self.accumulator += frame_time;
        let mut ticks = 0;
        while self.accumulator >= FIXED_TIMESTEP_DURATION && ticks < MAX_TICKS_PER_FRAME {
            self.accumulator -= FIXED_TIMESTEP_DURATION;
            ticks += 1;
        }
        // Drop the backlog the cap refused
        if ticks == MAX_TICKS_PER_FRAME {
            self.accumulator = self.accumulator.min(FIXED_TIMESTEP_DURATION);
        }

        self.tick_count += ticks as u64;
        ticks
    }

    /// One tick of resource work
    ///
    /// Recovers lost textures, queues unloaded sprites for a lazy reload,
    /// drains the queue and advances every animation. Returns the number of
    /// entries loaded.
    pub fn tick(&self, resources: &ResourceManager, sprites: &mut [SpriteHandle]) -> usize {
        resources.recover_lost_textures();
        for sprite in sprites.iter() {
            resources.touch(sprite);
        }

        let loaded = resources.run();
        for sprite in sprites.iter_mut() {
            sprite.update(FIXED_TIMESTEP);
        }
        loaded
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            log::info!("Loop paused");
        }
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            // No burst of ticks after a pause
            self.accumulator = Duration::ZERO;
            self.last_frame_time = Instant::now();
            log::info!("Loop resumed");
        }
    }
}

impl Default for GameLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::test_util::write_png;
    use crate::engine::assets::{AssetLoader, LoadMode, LoadState};
    use crate::engine::renderer::{HeadlessDevice, RenderDevice};
    use std::sync::Arc;

    #[test]
    fn test_game_loop_creation() {
        let game_loop = GameLoop::new();
        assert_eq!(game_loop.frame_count(), 0);
        assert_eq!(game_loop.tick_count(), 0);
        assert!(!game_loop.is_paused());
    }

    #[test]
    fn test_advance_accumulates() {
        let mut game_loop = GameLoop::new();
        assert_eq!(game_loop.advance(Duration::from_millis(10)), 0);
        assert_eq!(game_loop.advance(Duration::from_millis(10)), 1);
        assert_eq!(game_loop.advance(Duration::from_millis(34)), 2);
        assert_eq!(game_loop.tick_count(), 3);
        assert_eq!(game_loop.frame_count(), 3);
    }

    #[test]
    fn test_max_ticks_limit() {
        let mut game_loop = GameLoop::new();
        assert_eq!(game_loop.advance(Duration::from_millis(300)), MAX_TICKS_PER_FRAME);
        assert!(game_loop.advance(Duration::ZERO) <= 1);
    }

    #[test]
    fn test_paused_no_ticks() {
        let mut game_loop = GameLoop::new();
        game_loop.pause();
        assert_eq!(game_loop.advance(Duration::from_millis(100)), 0);

        game_loop.resume();
        assert!(!game_loop.is_paused());
        assert_eq!(game_loop.advance(Duration::from_millis(17)), 1);
    }

    #[test]
    fn test_tick_loads_and_animates() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..4 {
            write_png(&dir.path().join(format!("fx{}.png", i)), 2, 2, [0, 255, 0, 255]);
        }
        let device = Arc::new(HeadlessDevice::new());
        let resources = ResourceManager::new(device.clone(), AssetLoader::new(dir.path()));
        let game_loop = GameLoop::new();

        let mut sprites = vec![resources
            .get_image_with("fx{0}.pngani?0-3?fps=90", LoadMode::LinkOnly)
            .unwrap()];

        assert_eq!(game_loop.tick(&resources, &mut sprites), 1);
        assert_eq!(sprites[0].load_state(), LoadState::Resident);
        assert_eq!(sprites[0].current_frame(), 1);

        device.lose_all();
        game_loop.tick(&resources, &mut sprites);
        assert!(device.is_valid(&sprites[0].texture().unwrap()));
    }
}
