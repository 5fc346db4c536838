pub mod alerts;
pub mod app;
pub mod cache;
pub mod config;
pub mod controller;
pub mod device;
pub mod engine;
pub mod error;
pub mod history;
pub mod model;
pub mod state;
pub mod timer;
