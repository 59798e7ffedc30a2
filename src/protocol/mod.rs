// Protocol module - turns raw stdin lines into validated commands
//
// The tokenizer splits a line into borrowed fields; the command layer checks
// the op code and argument count and produces a typed Command. Anything that
// fails either step is dropped without a response.

pub mod command;
pub mod tokenizer;

pub use command::{bytes_to_path, ClearRequest, Command, DrawRequest, ParsedCommand};
