//! Roundsync - real-time session client for timed number-guessing rounds
//!
//! This crate keeps a live copy of the current round in sync with the game
//! server over a WebSocket, submits the player's pick, and surfaces the
//! round result to subscribers. Player stats, history and the leaderboard
//! are read over HTTP.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
