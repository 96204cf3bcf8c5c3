use anyhow::Result;
use log::{info, warn};
use rusted_sprites::config::Settings;
use rusted_sprites::engine::assets::{AssetLoader, ResourceManager};
use rusted_sprites::engine::game_loop::GameLoop;
use rusted_sprites::engine::renderer::{HeadlessDevice, RenderDevice, WgpuDevice};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_SETTINGS: &str = "settings.ini";

/// Give up on sprites that never become resident after this many frames
const MAX_FRAMES: u64 = 600;

struct Args {
    settings: Option<String>,
    gpu: bool,
    sprites: Vec<String>,
}

fn parse_args() -> Args {
    let mut args = Args {
        settings: None,
        gpu: false,
        sprites: Vec::new(),
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--gpu" => args.gpu = true,
            "--settings" => args.settings = iter.next(),
            _ => args.sprites.push(arg),
        }
    }
    args
}

fn load_settings(path: Option<&str>) -> Result<Settings> {
    match path {
        Some(path) => Settings::load(path),
        None if Path::new(DEFAULT_SETTINGS).is_file() => Settings::load(DEFAULT_SETTINGS),
        None => Ok(Settings::default()),
    }
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting Rusted Sprites...");

    let args = parse_args();
    let settings = load_settings(args.settings.as_deref())?;

    let device: Arc<dyn RenderDevice> = if args.gpu {
        Arc::new(WgpuDevice::headless()?)
    } else {
        Arc::new(HeadlessDevice::new())
    };

    let resources = ResourceManager::with_settings(
        device,
        AssetLoader::new(&settings.asset_root),
        settings.resource_settings()?,
    );
    resources.set_resource_replacement(settings.replacement.as_deref())?;

    let mut sprites = Vec::new();
    for id in &args.sprites {
        match resources.get_image(id) {
            Ok(sprite) => sprites.push(sprite),
            Err(e) => warn!("Skipping {}: {}", id, e),
        }
    }
    info!("Requested {} sprites", sprites.len());

    let mut game_loop = GameLoop::new();
    while sprites.iter().any(|s| !s.is_loaded()) && game_loop.frame_count() < MAX_FRAMES {
        for _ in 0..game_loop.begin_frame() {
            game_loop.tick(&resources, &mut sprites);
        }
        std::thread::sleep(Duration::from_millis(1));
    }

    for sprite in &sprites {
        info!(
            "{}: {} frames, {}x{}, {:?}",
            sprite.id(),
            sprite.frame_count(),
            sprite.width(),
            sprite.height(),
            sprite.load_state()
        );
    }

    let memory = resources.memory();
    info!(
        "Texture memory: {} KiB in use, {} KiB peak",
        memory.usage / 1024,
        memory.peak / 1024
    );

    Ok(())
}
