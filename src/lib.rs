// Live Pitch Core - real-time pitch-tracking telemetry pipeline
// UDP ingestion → normalization → classification → dedup buffer → live aggregates

// Module declarations
pub mod aggregation;
pub mod buffer;
pub mod classifier;
pub mod config;
pub mod context;
pub mod error;
pub mod network;
pub mod pitch;
pub mod session;
pub mod telemetry;

// Re-exports for convenience
pub use aggregation::{AggregateSnapshot, LiveAggregator};
pub use classifier::{PitchClassifier, PitchModel};
pub use config::AppConfig;
pub use context::{ContextHandle, PitchCategory, SessionContext};
pub use pitch::{NormalizedPitch, PitchCall, PitchOutcome};
pub use session::SessionManager;

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// Honours `RUST_LOG`, defaulting to `info`. `log` records from library code
/// are bridged into the same output. Safe to call more than once; only the
/// first call installs anything.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
