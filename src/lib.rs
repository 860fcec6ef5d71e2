pub mod configuration;
pub mod console;
pub mod dal;
pub mod domain;
pub mod services;
