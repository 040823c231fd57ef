//! Interactive terminal fireworks.
//!
//! Rockets climb toward a target, burst at their apex into one of several
//! shapes described by a [`recipe::Recipe`], and the sparks are composited
//! onto a fading canvas that is drawn to the terminal with half-block cells.

pub mod autofire;
pub mod canvas;
pub mod config;
pub mod driver;
pub mod error;
pub mod gesture;
pub mod logging;
pub mod physics;
pub mod recipe;
pub mod render;
pub mod sim;
pub mod sound;
pub mod terminal;
