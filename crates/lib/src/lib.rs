//! Parley core library — activity model, turn context, middleware chain,
//! and the console adapter used by the CLI bot.

pub mod activity;
pub mod adapter;
pub mod config;
pub mod console;
pub mod context;
pub mod error;
pub mod middleware;
