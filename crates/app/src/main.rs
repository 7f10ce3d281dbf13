use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use drive_choreo_core::{
    classify, AppConfig, ChannelSeeds, Choreographer, CompletionState, FrameClock, Intent,
    RunParams, Scenario, SnapshotLog,
};
use tracing_subscriber::EnvFilter;

/// Upper bound on simulated frames for a single playback.
const MAX_FRAMES: u64 = 60 * 60;

fn main() -> drive_choreo_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Classify { text } => {
            println!("{}", classify(&text));
            Ok(())
        }
        Commands::Play {
            action,
            config,
            interrupt_after_ms,
            then,
            trace,
        } => {
            let config = load_config(config.as_deref())?;
            let interrupt = interrupt_after_ms.zip(then);
            run_play(&config, &action, interrupt, trace)
        }
        Commands::Scenarios { file, pick, config } => {
            let config = load_config(config.as_deref())?;
            run_scenarios(&config, &file, pick)
        }
    }
}

fn load_config(path: Option<&Path>) -> drive_choreo_core::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            AppConfig::load(path)
        }
        None => Ok(AppConfig::default()),
    }
}

/// Starting scene: player in the center lane, non-player vehicle ahead.
fn opening_params(config: &AppConfig) -> RunParams {
    let params = config.stage.run_params();
    let seeds = ChannelSeeds {
        scroll: Some(0.0),
        lane: Some(params.center_lane()),
        non_player_offset: Some(config.stage.screen_height * 0.25),
    };
    params.with_seeds(seeds).with_non_player_visible(true)
}

fn choreographer_for(config: &AppConfig) -> Choreographer {
    Choreographer::new(config.stage.build_stage())
        .with_frame_interval(config.stage.frame_interval())
}

fn run_play(
    config: &AppConfig,
    action: &str,
    interrupt: Option<(u64, String)>,
    trace: bool,
) -> drive_choreo_core::Result<()> {
    let intent = classify(action);
    tracing::info!(action, %intent, "playing action");

    let mut choreo = choreographer_for(config);
    let mut clock = FrameClock::new(config.playback.fps);
    let mut log = SnapshotLog::new(1);
    let mut handle = choreo.execute(intent, &opening_params(config));
    let mut interrupt = interrupt;

    log.record(choreo.stage(), clock.elapsed());
    while !choreo.is_idle() && clock.frames() < MAX_FRAMES {
        let dt = clock.tick();
        choreo.tick(dt);

        let due = interrupt
            .as_ref()
            .is_some_and(|(after_ms, _)| clock.elapsed().as_millis() as u64 >= *after_ms);
        if due {
            if let Some((_, next)) = interrupt.take() {
                let next_intent = classify(&next);
                tracing::info!(action = %next, intent = %next_intent, "superseding with new action");
                let superseded = std::mem::replace(
                    &mut handle,
                    choreo.execute(next_intent, &config.stage.run_params()),
                );
                let mut completion = superseded.completion;
                if completion.try_outcome() == CompletionState::Discarded {
                    tracing::info!(run = %superseded.generation, "previous run discarded");
                }
            }
        }
        log.record(choreo.stage(), clock.elapsed());
    }

    match handle.completion.try_outcome() {
        CompletionState::Settled(report) => {
            tracing::info!(run = %report.generation, elapsed = ?report.elapsed, "run settled")
        }
        other => tracing::warn!(?other, "run did not settle within the frame budget"),
    }

    if trace {
        for frame in log.frames() {
            println!("{}", serde_json::to_string(frame)?);
        }
    } else if let Some(last) = log.last() {
        println!("{}", serde_json::to_string_pretty(last)?);
    }
    Ok(())
}

fn run_scenarios(
    config: &AppConfig,
    file: &Path,
    pick: usize,
) -> drive_choreo_core::Result<()> {
    let scenarios = Scenario::load_all(file)?;
    tracing::info!(count = scenarios.len(), ?file, "loaded scenarios");

    let mut choreo = choreographer_for(config);
    let mut clock = FrameClock::new(config.playback.fps);
    let mut correct = 0usize;

    for scenario in &scenarios {
        let Some(decision) = scenario.choose(pick) else {
            tracing::warn!(id = %scenario.id, pick, "scenario has no such choice, skipping");
            continue;
        };
        let intent: Intent = decision.intent();
        tracing::info!(id = %scenario.id, action = %decision.action, %intent, "playing decision");

        let mut handle = choreo.execute(intent, &opening_params(config));
        clock.reset();
        while !choreo.is_idle() && clock.frames() < MAX_FRAMES {
            choreo.tick(clock.tick());
        }
        if let CompletionState::Settled(report) = handle.completion.try_outcome() {
            tracing::debug!(id = %scenario.id, elapsed = ?report.elapsed, "decision animated");
        }

        if decision.correct {
            correct += 1;
        }
        tracing::info!(id = %scenario.id, correct = decision.correct, "outcome");
    }

    println!("{correct}/{} correct", scenarios.len());
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Driving scenario choreography engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the maneuver intent a chosen action maps to.
    Classify {
        /// Chosen action text.
        text: String,
    },
    /// Animate a chosen action and print the final stage snapshot.
    Play {
        /// Chosen action text.
        #[arg(short, long)]
        action: String,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Supersede the run after this many simulated milliseconds.
        #[arg(long, requires = "then")]
        interrupt_after_ms: Option<u64>,
        /// Action that supersedes the first one.
        #[arg(long, requires = "interrupt_after_ms")]
        then: Option<String>,
        /// Print every frame as a JSON line instead of only the last one.
        #[arg(long)]
        trace: bool,
    },
    /// Play the chosen decision of every scenario in a JSON file.
    Scenarios {
        /// JSON array of scenarios.
        file: PathBuf,
        /// Index of the choice to pick in each scenario.
        #[arg(short, long, default_value_t = 0)]
        pick: usize,
        /// Optional JSON configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}
