pub mod crossing;
pub mod motion;
pub mod tick;
pub mod train;
