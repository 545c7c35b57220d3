//! Terminal UI layer for the roast chat.
//!
//! - [`chat_loop`]: the interaction loop that turns input into
//!   [`crate::core::app::AppAction`]s and drives streaming via
//!   [`crate::core::chat_stream`].
//! - [`renderer`] and [`layout`]: view composition and width-aware wrapping.
//! - [`theme`]: the two color palettes.
//!
//! Ownership boundary: this layer presents and captures interaction state, while
//! [`crate::core`] owns conversation logic and backend coordination.

pub mod chat_loop;
pub mod layout;
pub mod renderer;
pub mod theme;
