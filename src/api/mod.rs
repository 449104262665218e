pub mod endpoints;
pub mod middleware;
pub mod pages;
pub mod rest;
pub mod state;
