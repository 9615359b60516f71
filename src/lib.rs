//! Tournament state machine and real-time sync for a robot combat arena.
//!
//! All state lives in one [`engine::ArenaEngine`]. Commands from the
//! real-time channel, request/response calls and timer ticks all mutate it
//! through `&mut self`, and each step publishes the full snapshot to every
//! subscriber.

pub mod bracket;
pub mod broadcast;
pub mod config;
pub mod constants;
pub mod engine;
pub mod ranking;
pub mod rng;
pub mod server_protocol;
pub mod server_utils;
pub mod timer;
pub mod types;
