pub mod destination;
pub mod health;
pub mod processor;
pub mod webhook;
