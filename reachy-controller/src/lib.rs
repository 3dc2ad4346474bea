#![doc = include_str!("../README.md")]

pub mod angle;
pub mod blocks;
pub mod config;
pub mod daemon_api;
pub mod daemon_types;
pub mod dispatcher;
pub mod motion_waiter;
pub mod presets;
pub mod recorded_moves;
pub mod state_cache;

#[cfg(test)]
mod test_support;
