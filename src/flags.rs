//! clap argument parsing
use std::path::PathBuf;

#[derive(Debug, clap::Parser)]
#[command(version, about, long_about = None)]
/// Keyboard lighting keep-alive daemon for GameSense-style engines.
pub struct Cli {
    /// Port for the local HTTP control surface.
    #[clap(short, long, default_value_t = 5050)]
    pub port: u16,
    /// Path to the engine's coreProps.json. Auto-discovered when omitted.
    #[clap(long)]
    pub core_props: Option<PathBuf>,
    /// Game identifier to register with the engine. Must be unique.
    #[clap(short, long, default_value = "KEYGLOW")]
    pub game: String,
    /// Display name shown in the engine UI.
    #[clap(long, default_value = "Keyglow Daemon")]
    pub game_display_name: String,
    /// Refresh cadence in milliseconds. Must stay under the engine's
    /// auto-expiry window (a few seconds).
    #[clap(short, long, default_value_t = 1000)]
    pub refresh_interval: u64,
    /// Seconds between reachability probes while waiting for the engine.
    #[clap(long, default_value_t = 5)]
    pub retry_interval: u64,
    /// Per-request timeout towards the engine, in milliseconds.
    #[clap(long, default_value_t = 1000)]
    pub request_timeout: u64,
    /// Color pre-bound to every letter key at startup, so the first
    /// activation does not flash.
    #[clap(long, default_value = "#00FF00")]
    pub prebind_color: String,
    /// Skip the startup pre-bind of the letter keys.
    #[clap(long)]
    pub no_prebind: bool,
}
