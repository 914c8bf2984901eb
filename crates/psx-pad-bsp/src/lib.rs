#![no_std]
#![doc = include_str!("../README.md")]

// Modules
mod board;
pub mod priority;
mod resources;

// Flatten
pub use board::*;
pub use resources::*;

#[cfg(feature = "usb")]
pub mod usb;
