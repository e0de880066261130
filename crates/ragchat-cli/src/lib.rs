//! Terminal front end for the RAG chat backend
//!
//! The binary wires [`config::Config`], the HTTP client and a
//! [`ragchat_ui::Shell`] into an interactive [`repl::Repl`].

pub mod command;
pub mod config;
pub mod error;
pub mod repl;

pub use config::Config;
pub use error::CommandError;
pub use repl::Repl;
