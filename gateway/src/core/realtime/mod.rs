//! Upstream realtime session plumbing.
//!
//! - [`base`]: error type shared by every upstream operation
//! - [`openai`]: wire types, credential exchange and the upstream connector
//! - [`handshake`]: the session configuration sent before relaying
//!
//! # Audio Format
//!
//! PCM 16-bit signed little-endian at 24kHz, passed through untouched.

mod base;
pub mod handshake;
pub mod openai;

pub use base::{RealtimeError, RealtimeResult};
pub use handshake::{Greeting, HandshakeProfile, HandshakeProfileKind};
pub use openai::{
    ClientEvent, CredentialProvider, CredentialRequest, OpenAISessionCredentials,
    UpstreamCredential, UpstreamEventKind,
};
