//! Order Portal — forwards retailer orders to a fixed WhatsApp recipient.

pub mod config;
pub mod error;
pub mod gateway;
pub mod intake;
pub mod messaging;
pub mod order;
pub mod storage;
