//! Built-in responders.
//!
//! Real conversational backends implement [`wegate_channels::Responder`]
//! out of tree; the echo responder here keeps the gateway runnable end to
//! end without one and doubles as the test double.

pub mod echo;

pub use echo::EchoResponder;
