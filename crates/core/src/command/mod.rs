//! Curl command line handling: tokenizer, flag table and parser

pub mod flags;
pub mod parser;
pub mod tokenizer;

pub use parser::{parse_args, parse_command};
pub use tokenizer::tokenize;
