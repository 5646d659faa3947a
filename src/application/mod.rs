pub mod chat;
pub mod gateway;
pub mod ledger;
pub mod notify;
pub mod reconcile;
