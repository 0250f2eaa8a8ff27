//! Foreground runtime for `msim run`: the polling loop and signal handling.

pub mod run_loop;
pub mod signals;
