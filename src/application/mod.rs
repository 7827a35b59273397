pub mod error;
pub mod game_service;
