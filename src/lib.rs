// Sprite, font and text resource cache for a 2D game loop

pub mod config;
pub mod engine;
