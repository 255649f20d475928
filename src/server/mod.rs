//! Passive socket setup and the sequential accept loop.

pub mod listener;
