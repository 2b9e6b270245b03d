use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use giftbox_input::{Action, InputMap};
use giftbox_kernel::{Clock, TextureSlot};
use giftbox_render::DebugTextRenderer;
use giftbox_runtime::{AppConfig, AppState, tick};
use giftbox_tools::WorldInspector;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "giftbox-cli", about = "Headless runner for the giftbox scene")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version, default scene summary, and key bindings
    Info,
    /// Run the synchronization loop on a manual clock
    Simulate {
        /// Number of frames to run
        #[arg(short, long, default_value = "600")]
        frames: u64,
        /// Seconds of wall time per frame
        #[arg(long, default_value = "0.016666668")]
        dt: f64,
        /// Trigger the spawn action every N frames (0 disables)
        #[arg(short, long, default_value = "0")]
        spawn_every: u64,
        /// Trigger the jump action on this frame
        #[arg(long)]
        jump_at: Option<u64>,
        /// YAML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print one JSON frame report per line
        #[arg(long)]
        json: bool,
        /// Print the debug text rendering of the final frame
        #[arg(long)]
        dump: bool,
    },
    /// Validate a YAML config file and print it with defaults filled in
    CheckConfig {
        path: PathBuf,
    },
    /// Print the default config as YAML
    DefaultConfig,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(AppConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Info => {
            println!("giftbox-cli v{}", env!("CARGO_PKG_VERSION"));
            let state = AppState::new(&AppConfig::default(), Clock::manual())?;
            println!("{}", WorldInspector::summary(&state.scene));
            let input = InputMap::default();
            for (name, action) in [
                ("spawn", Action::Spawn),
                ("jump", Action::Jump),
                ("debug panel", Action::ToggleDebugPanel),
            ] {
                println!("{name}: {}", input.keys_for(action).join(", "));
            }
        }
        Commands::Simulate {
            frames,
            dt,
            spawn_every,
            jump_at,
            config,
            json,
            dump,
        } => {
            anyhow::ensure!(dt.is_finite() && dt >= 0.0, "--dt must be a non-negative number");
            let config = load_config(config.as_ref())?;
            let mut state = AppState::new(&config, Clock::manual())?;
            state.wait_for_assets();
            let mut renderer = DebugTextRenderer::new();
            tracing::info!(frames, dt, spawn_every, "simulating");

            let mut last_output = String::new();
            for frame in 1..=frames {
                if spawn_every > 0 && frame % spawn_every == 0 {
                    state.handle_action(Action::Spawn)?;
                }
                if jump_at == Some(frame) {
                    state.handle_action(Action::Jump)?;
                }
                state.clock.advance(dt);
                let (report, output) = tick(&mut state, &mut renderer);
                if json {
                    println!("{}", serde_json::to_string(&report)?);
                }
                last_output = output;
            }

            if dump {
                print!("{last_output}");
            }
            if !json {
                println!("{}", WorldInspector::summary(&state.scene));
                for id in WorldInspector::list_entities(&state.scene.world) {
                    if let Some(info) = WorldInspector::inspect_entity(&state.scene.world, id) {
                        println!("  {info}");
                    }
                }
                println!("model: {:?}", state.model_status());
                for slot in TextureSlot::ALL {
                    println!("{} texture: {:?}", slot.name(), state.texture_status(slot));
                }
            }
        }
        Commands::CheckConfig { path } => {
            let config = load_config(Some(&path))?;
            println!("{}: ok", path.display());
            print!("{}", config.to_yaml()?);
        }
        Commands::DefaultConfig => {
            print!("{}", AppConfig::default().to_yaml()?);
        }
    }

    Ok(())
}
