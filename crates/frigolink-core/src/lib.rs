//! Core state-synchronization and timeseries-buffering engine for the
//! frigolink refrigerated-truck demo.
//!
//! Everything in this crate is pure logic driven by `tick(now_ms)` and
//! inbound remote events. Hardware, persistence, and transport sit behind
//! the trait seams in [`remote`] and [`settings`], so the whole engine runs
//! (and is tested) on the host without an event loop.

#![no_std]

pub mod app;
pub mod model;
pub mod remote;
pub mod settings;
pub mod telemetry;
