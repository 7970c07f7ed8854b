use std::collections::HashMap;
use std::fs;
use std::io::BufReader;
use std::net::UdpSocket;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use live_pitch::{AppConfig, PitchCall, PitchOutcome, SessionManager};
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Parser, Debug)]
#[command(
    name = "live_pitch_cli",
    about = "Live pitch-tracking session, simulator and offline replay"
)]
struct Cli {
    /// JSON config file (defaults to assets/live_pitch_config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Listen for tracking datagrams and print aggregates as JSON lines
    Listen {
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        pitcher: Option<String>,
        #[arg(long)]
        team: Option<String>,
        /// Centroid model JSON
        #[arg(long)]
        model: Option<PathBuf>,
        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(long)]
        duration_secs: Option<u64>,
    },
    /// Send synthetic pitch datagrams
    Simulate {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 20998)]
        port: u16,
        #[arg(long, default_value_t = 20)]
        count: usize,
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
        /// Copies of each datagram, as the tracking unit retransmits
        #[arg(long, default_value_t = 1)]
        repeat: usize,
    },
    /// Replay newline-delimited JSON messages and print the aggregate
    Replay {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        pitcher: Option<String>,
        #[arg(long)]
        team: Option<String>,
        #[arg(long)]
        model: Option<PathBuf>,
        /// JSON object of PlayId → {call, exit_speed, discard}
        #[arg(long)]
        outcomes: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    live_pitch::init_logging();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::load(),
    };

    match cli.command {
        Commands::Listen {
            port,
            pitcher,
            team,
            model,
            duration_secs,
        } => run_listen(config, port, pitcher, team, model, duration_secs),
        Commands::Simulate {
            host,
            port,
            count,
            interval_ms,
            repeat,
        } => run_simulate(&host, port, count, interval_ms, repeat),
        Commands::Replay {
            input,
            pitcher,
            team,
            model,
            outcomes,
        } => run_replay(config, &input, pitcher, team, model, outcomes),
    }
}

fn build_session(
    mut config: AppConfig,
    pitcher: Option<String>,
    team: Option<String>,
    model: Option<PathBuf>,
) -> SessionManager {
    if model.is_some() {
        config.classifier.model_path = model;
    }
    let session = SessionManager::from_config(config);
    if let Some(pitcher) = pitcher {
        session.context().set_pitcher(pitcher);
    }
    if let Some(team) = team {
        session.context().set_team(team);
    }
    session
}

fn run_listen(
    mut config: AppConfig,
    port: Option<u16>,
    pitcher: Option<String>,
    team: Option<String>,
    model: Option<PathBuf>,
    duration_secs: Option<u64>,
) -> Result<ExitCode> {
    if let Some(port) = port {
        config.listener.port = port;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    let mut session = build_session(config, pitcher, team, model).with_runtime(runtime.handle().clone());
    let mut aggregates = session.subscribe_aggregates();
    let addr = session.start_live_mode().context("starting live mode")?;
    eprintln!("Listening on {addr}");

    runtime.block_on(async {
        let deadline = async {
            match duration_secs {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = &mut deadline => break,
                received = aggregates.recv() => match received {
                    Ok(snapshot) => match serde_json::to_string(snapshot.as_ref()) {
                        Ok(line) => println!("{line}"),
                        Err(err) => tracing::warn!("Failed to encode aggregate: {}", err),
                    },
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Skipped {} aggregates", skipped);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    });

    session.stop().context("stopping live mode")?;
    println!("{}", serde_json::to_string_pretty(&session.stats())?);
    Ok(ExitCode::from(0))
}

/// Base characteristics of a synthetic pitch type
struct PitchProfile {
    speed: f64,
    spin_rate: f64,
    tilt: &'static str,
    induced_vertical: f64,
    horizontal: f64,
}

const PROFILES: [PitchProfile; 4] = [
    PitchProfile { speed: 93.0, spin_rate: 2300.0, tilt: "12:45", induced_vertical: 16.0, horizontal: 8.0 },
    PitchProfile { speed: 84.5, spin_rate: 2500.0, tilt: "9:00", induced_vertical: 2.0, horizontal: -5.0 },
    PitchProfile { speed: 85.0, spin_rate: 1750.0, tilt: "1:45", induced_vertical: 7.0, horizontal: 14.0 },
    PitchProfile { speed: 78.0, spin_rate: 2650.0, tilt: "7:00", induced_vertical: -9.0, horizontal: -7.0 },
];

fn synthetic_pitch(index: usize, rng: &mut impl Rng) -> Value {
    let profile = &PROFILES[rng.gen_range(0..PROFILES.len())];
    let speed = profile.speed + rng.gen_range(-1.5..1.5);
    json!({
        "Kind": "Pitch",
        "PlayId": format!("sim-{}-{}", chrono::Utc::now().timestamp_millis(), index),
        "Time": chrono::Utc::now().to_rfc3339(),
        "Pitch": {
            "Speed": speed,
            "ZoneSpeed": speed - rng.gen_range(6.0..8.5),
            "SpinRate": profile.spin_rate + rng.gen_range(-120.0..120.0),
            "SpinAxis": rng.gen_range(0.0..360.0),
            "Tilt": profile.tilt,
            "Release": {
                "Extension": 6.0 + rng.gen_range(-0.3..0.3),
                "Height": 5.8 + rng.gen_range(-0.2..0.2),
                "Side": 1.7 + rng.gen_range(-0.2..0.2),
                "VerticalAngle": rng.gen_range(-2.5..0.5),
                "HorizontalAngle": rng.gen_range(-3.0..-1.0)
            },
            "Movement": {
                "Horizontal": profile.horizontal + rng.gen_range(-2.0..2.0),
                "Vertical": profile.induced_vertical - 18.0 + rng.gen_range(-2.0..2.0),
                "InducedVertical": profile.induced_vertical + rng.gen_range(-2.0..2.0)
            },
            "Location": {
                "Side": rng.gen_range(-1.4..1.4),
                "Height": rng.gen_range(0.8..4.2)
            }
        }
    })
}

fn run_simulate(host: &str, port: u16, count: usize, interval_ms: u64, repeat: usize) -> Result<ExitCode> {
    let socket = UdpSocket::bind("0.0.0.0:0").context("binding sender socket")?;
    socket.set_broadcast(true).context("enabling broadcast")?;
    let target = format!("{host}:{port}");
    let mut rng = rand::thread_rng();

    for index in 0..count {
        let payload = serde_json::to_vec(&synthetic_pitch(index, &mut rng))?;
        for _ in 0..repeat.max(1) {
            socket
                .send_to(&payload, &target)
                .with_context(|| format!("sending to {target}"))?;
        }
        tracing::info!("Sent pitch {}/{} to {}", index + 1, count, target);
        if index + 1 < count {
            std::thread::sleep(Duration::from_millis(interval_ms));
        }
    }

    Ok(ExitCode::from(0))
}

/// Outcome file entry; `call` accepts export names and table labels
#[derive(Debug, Deserialize)]
struct OutcomeEntry {
    #[serde(default)]
    call: Option<String>,
    #[serde(default)]
    exit_speed: Option<f64>,
    #[serde(default)]
    discard: bool,
}

fn load_outcomes(path: &Path) -> Result<HashMap<String, PitchOutcome>> {
    let contents = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let entries: HashMap<String, OutcomeEntry> =
        serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;

    entries
        .into_iter()
        .map(|(play_id, entry)| {
            let call = match entry.call {
                Some(label) => Some(
                    label
                        .parse::<PitchCall>()
                        .with_context(|| format!("outcome for {play_id}"))?,
                ),
                None => None,
            };
            let outcome = PitchOutcome {
                call,
                exit_speed: entry.exit_speed,
                discard: entry.discard,
            };
            Ok((play_id, outcome))
        })
        .collect()
}

fn run_replay(
    config: AppConfig,
    input: &Path,
    pitcher: Option<String>,
    team: Option<String>,
    model: Option<PathBuf>,
    outcomes: Option<PathBuf>,
) -> Result<ExitCode> {
    let file = fs::File::open(input).with_context(|| format!("opening {}", input.display()))?;

    let mut session = build_session(config, pitcher, team, model);
    if let Some(path) = outcomes {
        for (play_id, outcome) in load_outcomes(&path)? {
            session.outcomes().record(play_id, outcome);
        }
    }

    let summary = session
        .replay_lines(BufReader::new(file))
        .with_context(|| format!("replaying {}", input.display()))?;
    if summary.messages == 0 {
        bail!("no messages in {}", input.display());
    }
    eprintln!("{}", serde_json::to_string(&summary)?);
    println!("{}", serde_json::to_string_pretty(&session.aggregate_now())?);
    Ok(ExitCode::from(0))
}
