//! Data models: envelopes, GitHub payloads, and response bodies.

pub mod envelopes;
pub mod github;
pub mod responses;

pub use envelopes::{
    AccessInfo, AccessTokenEnvelope, AuthorizationEnvelope, Envelope, StateEnvelope,
};
pub use github::{GitHubOrg, GitHubToken, GitHubUser};
pub use responses::{DiscoveryDocument, TokenResponse, WebFingerLink, WebFingerResponse};
