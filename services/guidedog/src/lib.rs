pub mod assistant;
pub mod camera;
pub mod config;
pub mod directions_client;
pub mod output;
pub mod prompt_loader;
pub mod vision_client;
pub mod voice;
