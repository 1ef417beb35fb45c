pub mod config;
pub mod grid;
pub mod layout;
pub mod placement;
pub mod track;
