use anyhow::Result;

mod asset_loader;
mod camera;
mod click_tracker;
mod config;
mod frame_loop;
mod hotpoints;
mod math;
mod model;
mod navigation;
mod orbit_controls;
mod rendering;
mod scene_graph;
mod viewer;
mod window;

fn main() -> Result<()> {
    pretty_env_logger::init();

    pollster::block_on(window::run())?;

    Ok(())
}
