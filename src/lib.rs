// src/lib.rs
pub mod backend;
pub mod banner;
pub mod challenge;
pub mod config;
pub mod errors;
pub mod models;
pub mod report;
pub mod session;
pub mod stream;
pub mod workspace;
