pub mod controller;
pub mod error;
pub mod game;
pub mod models;
pub mod settings;
