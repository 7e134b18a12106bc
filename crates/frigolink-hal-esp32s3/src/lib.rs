//! ESP32-S3 plumbing for the frigolink truck demo: flash-backed config,
//! GPIO actuators and door switch, the postcard wire codec, the shared
//! session handle, and the positioning stub.

#![no_std]

pub mod gpio;
pub mod link;
pub mod position;
pub mod storage;
pub mod wire;
