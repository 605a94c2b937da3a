//! `SeaORM` entities owned by the relay

pub mod payment_processor;
pub mod webhook_destination;
