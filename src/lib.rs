pub mod assistant;
pub mod auth;
pub mod backend;
pub mod config;
pub mod directory;
pub mod error;
pub mod handlers;
pub mod lexical;
pub mod models;
pub mod notify;
pub mod repository;
pub mod repository_traits;
pub mod retry;
pub mod service;
pub mod transport;
pub mod validation;
