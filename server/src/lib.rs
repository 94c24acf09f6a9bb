//! Two-player hockey server library.
//!
//! This module exposes the server components for use in tests and binaries.

pub mod ball;
pub mod config;
pub mod events;
pub mod game;
pub mod game_loop;
pub mod goal;
pub mod physics;
pub mod player;
pub mod session;
pub mod state;
pub mod team;
pub mod ws;
