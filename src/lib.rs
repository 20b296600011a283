pub mod app;
pub mod batches;
pub mod brewfather;
pub mod cli;
pub mod config;
pub mod data;
pub mod logging;
pub mod refresh;
pub mod services;
pub mod state;
pub mod utils;
pub mod web;
