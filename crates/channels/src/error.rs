use std::error::Error as StdError;

use wegate_common::ReplyKind;

/// Crate-wide result type for channel operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed channel errors shared across adapters.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Vendor message type with no mapping. The event-loop caller logs it
    /// and skips the single event.
    #[error("unsupported vendor message type: {vendor_type}")]
    UnsupportedMessage { vendor_type: String },

    /// Reply kind the channel cannot send. Unlike unsupported inbound
    /// messages this is surfaced to the caller, not silently dropped.
    #[error("unsupported reply kind: {kind}")]
    UnsupportedReply { kind: ReplyKind },

    /// Structured payload that did not parse. Classifiers downgrade this to
    /// an unknown-XML message instead of letting it escape.
    #[error("malformed payload: {message}")]
    MalformedPayload { message: String },

    /// Wrapped failure from a vendor client call.
    #[error("vendor call failed: {context}: {source}")]
    Vendor {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error(transparent)]
    Media(#[from] wegate_media::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn unsupported_message(vendor_type: impl std::fmt::Display) -> Self {
        Self::UnsupportedMessage {
            vendor_type: vendor_type.to_string(),
        }
    }

    #[must_use]
    pub fn unsupported_reply(kind: ReplyKind) -> Self {
        Self::UnsupportedReply { kind }
    }

    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedPayload {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn vendor(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Vendor {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
