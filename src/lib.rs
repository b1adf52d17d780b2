pub mod app;
pub mod config;
pub mod episodes;
pub mod models;
pub mod playback;
pub mod search;
pub mod selection;
pub mod session;
pub mod slideshow;
pub mod tmdb;
