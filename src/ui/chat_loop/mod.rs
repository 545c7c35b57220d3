//! Interactive chat screen: terminal lifecycle, key resolution and the
//! event loop that ties input, streaming and rendering together.

mod event_loop;
mod keybindings;
mod lifecycle;

pub use event_loop::run_chat;
