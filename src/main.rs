use swatch_viewer::{config::ViewerConfig, flow};

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::from_env()?,
    };
    flow::run(config)
}
