pub mod orchestration;

pub use orchestration::{execute, run, Command, Outcome};
