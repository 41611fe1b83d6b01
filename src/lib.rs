pub mod config;
pub mod corpus;
pub mod db;
pub mod errors;
pub mod models;
pub mod report;
pub mod services;
