pub mod errors;
pub mod fields;
pub mod tat;

pub mod database;
pub mod server;
pub mod services;
