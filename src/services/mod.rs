//! Protocol core services.

pub mod github;
pub mod keys;
pub mod minting;
pub mod redirect;
pub mod scopes;
pub mod token_codec;
pub mod webfinger;
