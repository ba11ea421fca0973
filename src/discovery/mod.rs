//! Recording discovery

pub mod scanner;

pub use scanner::{scan, DiscoveredClip};
