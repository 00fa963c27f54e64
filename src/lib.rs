//! bbterm: client for BBS-style servers speaking ANSI text plus a
//! binary sprite extension.

pub mod config;
pub mod constants;
pub mod render;
pub mod terminal;
pub mod utils;
