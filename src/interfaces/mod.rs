pub mod cli;
pub mod webhook;
