pub mod health;
pub mod tables;
