//! stlview viewer binary.

mod app;
mod args;

use clap::Parser;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    stlview_core::init();
    stlview_graphics::init();

    let args = args::ViewerArgs::parse();
    app::run(args);
}
