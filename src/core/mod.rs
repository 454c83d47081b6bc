//! Core business logic abstractions

pub mod cache;
pub mod calculator;
pub mod config;
pub mod currency;
pub mod extract;
pub mod history;
pub mod log;
pub mod market;
pub mod price;
pub mod ratios;
pub mod session;
pub mod source;

