//! A tree-walking interpreter for a small C-family scripting language.
//!
//! Source text flows through three stages:
//!
//! ```text
//! let tokens = tokenize(source);
//! let (statements, errors) = parse(&tokens);
//! Interpreter::new().interpret(&statements)?;
//! ```

pub mod ast;
pub mod builtins;
pub mod callable;
pub mod class;
pub mod environment;
pub mod error;
pub mod instance;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod value;

mod shared_list;
mod stack;

pub use crate::error::RuntimeError;
pub use crate::interpreter::Interpreter;
pub use crate::lexer::tokenize;
pub use crate::parser::{parse, ParseError};
pub use crate::value::Value;
