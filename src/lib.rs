pub mod accounts;
pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod fridge;
pub mod navigation;
pub mod nutrition;
pub mod recipes;
pub mod remote;
pub mod state;
pub mod sync;
