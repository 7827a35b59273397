pub mod board;
pub mod color;
pub mod game;
pub mod piece;
pub mod player;
pub mod rules;
pub mod square;
