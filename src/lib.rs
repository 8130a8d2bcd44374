pub mod assets;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod models;
pub mod routes;
pub mod scanner;
pub mod stream;
pub mod tmdb;
pub mod watcher;
