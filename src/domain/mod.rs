pub mod chat;
pub mod gateway;
pub mod order;
pub mod portfolio;
pub mod ports;
pub mod pricing;
pub mod session;
