pub mod apperror;
pub mod config;
pub mod demo;
pub mod models;
