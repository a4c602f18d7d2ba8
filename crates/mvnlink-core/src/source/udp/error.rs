use thiserror::Error;

/// Errors returned while extracting UDP payloads from captured frames.
///
/// # Examples
/// ```
/// use mvnlink_core::source::UdpError;
///
/// let err = UdpError::MissingNetworkLayer;
/// assert!(err.to_string().contains("missing network layer"));
/// ```
#[derive(Debug, Error)]
pub enum UdpError {
    #[error("packet slice error: {0}")]
    Slice(String),
    #[error("missing network layer in packet")]
    MissingNetworkLayer,
}
