pub mod api;
pub mod audit;
pub mod behavior;
pub mod config;
pub mod errors;
pub mod honeypot;
pub mod models;
pub mod ownership;
pub mod risk;
pub mod session;
pub mod telecom;
pub mod utils;
