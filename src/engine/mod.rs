// Engine modules: renderer device, asset cache, game loop

pub mod assets;
pub mod game_loop;
pub mod renderer;
