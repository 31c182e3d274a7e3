pub mod app;
pub mod cli;
pub mod config;
pub mod controller;
pub mod deploy;
pub mod error;
pub mod history;
pub mod network;
pub mod units;
pub mod wallet;

#[cfg(test)]
mod testing;
