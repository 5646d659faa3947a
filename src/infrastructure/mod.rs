pub mod in_memory;
pub mod state_file;
