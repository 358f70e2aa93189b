use anyhow::{Context, Result};
use renderer::Renderer;
use sceneconfig::SceneConfig;
use tracing_subscriber::EnvFilter;

use crate::bindings::renderer_config;
use crate::bootstrap::resolve_scene_config;
use crate::cli::Args;

pub fn run(args: Args) -> Result<()> {
    initialise_tracing();

    let config = resolve_scene_config(&args)?;
    if args.print_config {
        return print_config(&config);
    }

    let renderer_config = renderer_config(&config, args.stdin_control);
    tracing::info!(
        layout = ?renderer_config.layout,
        policy = ?renderer_config.policy,
        params = renderer_config.params.len(),
        "launching noisewarp"
    );
    Renderer::new(renderer_config).run()
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn print_config(config: &SceneConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config).context("failed to serialise config")?;
    println!("{json}");
    Ok(())
}
