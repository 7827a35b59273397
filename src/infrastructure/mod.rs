pub mod dice;
pub mod repository;
