//! Wire protocol for the PostZen auth API.
//!
//! This crate defines what the client and the PostZen backend exchange
//! on the `/auth/*` endpoints:
//!
//! - **Types** ([`User`], [`AuthResponse`], request bodies,
//!   [`ApiErrorResponse`]): the JSON shapes on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those shapes are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while doing so.
//!
//! Domain resources (posts, comments, files) are deliberately absent:
//! the session layer only ever needs the auth envelope.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ApiErrorResponse, AuthResponse, FieldError, ForgotPasswordRequest,
    LoginRequest, MessageResponse, RefreshTokenRequest, RegisterRequest,
    ResetPasswordRequest, Role, User,
};
