//! HTTP middleware: transport security, host filtering, request logging.

mod request_logger;
mod secure_transport;
mod trusted_host;

pub use request_logger::RequestLogger;
pub use secure_transport::SecureTransport;
pub use trusted_host::TrustedHost;
