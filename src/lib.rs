pub mod app;
pub mod error;
pub mod game;
pub mod render;
pub mod sim;
