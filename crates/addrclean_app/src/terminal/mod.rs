mod app;
mod effects;
mod persistence;
pub mod ui;

pub use app::run_app;
