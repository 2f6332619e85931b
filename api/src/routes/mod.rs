pub mod health;
pub mod index_build;
pub mod search;
