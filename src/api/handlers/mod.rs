pub mod health;
pub mod works;
