pub mod app;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod debounce;
pub mod error;
pub mod events;
pub mod firestore;
pub mod liked;
pub mod models;
pub mod normalize;
pub mod session;
pub mod state;
pub mod tmdb;
