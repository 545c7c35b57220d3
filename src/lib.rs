//! VULCAN is a full-screen terminal roast chat backed by the Gemini API.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation controller, persona, persistence, the
//!   Gemini backend and stream orchestration.
//! - [`ui`] renders the terminal interface and runs the interactive event loop
//!   that drives user input and display updates.
//! - [`api`] defines the Gemini `generateContent` payloads.
//! - [`cli`] parses arguments and hosts the non-interactive subcommands.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which dispatches into [`core::app`] and
//! [`ui::chat_loop`] for interactive sessions.

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
