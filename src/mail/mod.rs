//! Message building: addresses, header encoding and MIME serialization.

mod address;
mod encoding;
mod header;
mod message;

use thiserror::Error;

pub use address::Address;
pub use encoding::{encode_header_text, encode_quoted_printable, encode_words};
pub use header::Headers;
pub use message::{Message, Part, TEXT_HTML, TEXT_PLAIN};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("message has no content parts")]
    NoParts,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("failed to write message: {0}")]
    Io(#[from] std::io::Error),
}
