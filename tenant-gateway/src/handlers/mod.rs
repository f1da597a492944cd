pub mod health;
pub mod org;
pub mod pages;
