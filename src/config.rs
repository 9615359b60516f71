use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::constants::{
    DEFAULT_MATCH_SECONDS, DEFAULT_RECOVERY_SECONDS, DEFAULT_SUBSCRIBER_QUEUE, MAX_TIMER_SECONDS,
    TICK_MS,
};
use crate::engine::EngineOptions;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Robot arena tournament server")]
pub struct ServerConfig {
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,
    /// Directory holding the display client's `index.html`.
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,
    #[arg(long, env = "ARENA_MATCH_SECONDS", default_value_t = DEFAULT_MATCH_SECONDS)]
    pub match_seconds: u32,
    #[arg(long, env = "ARENA_RECOVERY_SECONDS", default_value_t = DEFAULT_RECOVERY_SECONDS)]
    pub recovery_seconds: u32,
    #[arg(long, env = "ARENA_TICK_MS", default_value_t = TICK_MS)]
    pub tick_ms: u64,
    #[arg(long, env = "ARENA_SUBSCRIBER_QUEUE", default_value_t = DEFAULT_SUBSCRIBER_QUEUE)]
    pub subscriber_queue: usize,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            default_match_seconds: self.match_seconds.min(MAX_TIMER_SECONDS),
            default_recovery_seconds: self.recovery_seconds.min(MAX_TIMER_SECONDS),
            subscriber_queue: self.subscriber_queue.max(1),
        }
    }
}
