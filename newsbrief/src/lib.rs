// Library interface for newsbrief modules
// This allows tests and the `brief` binary to import modules

pub mod export;
pub mod llm;
pub mod pages;
pub mod processing;
pub mod research;
pub mod search;
pub mod server;
pub mod sessions;
