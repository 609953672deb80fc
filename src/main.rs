mod app;
mod config;
mod display;
mod engine;
mod error;
mod format;
mod grid;
mod render;
mod rule;
mod ticks;

use anyhow::Result;

fn main() -> Result<()> {
    app::run()
}
