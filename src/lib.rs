pub mod capture_point;
pub mod common;
pub mod config;
pub mod content;
pub mod entity;
pub mod hooks;
pub mod interaction;
pub mod persistence;
pub mod stats;
pub mod timers;
pub mod world;
