//! Error taxonomy shared by every store and the remote fetcher.
//!
//! DESIGN
//! ======
//! Each module owns its own `thiserror` enum. `ErrorCode` gives every error
//! a stable machine code, a coarse [`ErrorKind`], and a retry hint so the
//! view-state layer can choose between a retry action and a terminal
//! message without matching on concrete types.

/// Coarse error families surfaced to views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport, DNS, offline, or a cancelled request.
    Network,
    /// The remote resource does not exist.
    NotFound,
    /// Upstream 5xx or an unparseable payload.
    Server,
    /// Local input rejected before persistence.
    Validation,
    /// Local persistence read/write failure.
    Storage,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::NotFound => "not_found",
            Self::Server => "server",
            Self::Validation => "validation",
            Self::Storage => "storage",
        }
    }
}

/// Machine-readable error metadata.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn kind(&self) -> ErrorKind;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// USER-FACING MESSAGES
// =============================================================================

pub const MSG_NETWORK_ERROR: &str = "Network error. Please check your connection and try again.";
pub const MSG_NO_RESULTS: &str = "No characters found matching your criteria.";
pub const MSG_SERVER_ERROR: &str = "Server error. Please try again later.";
pub const MSG_UNKNOWN_ERROR: &str = "An unexpected error occurred.";
pub const MSG_CHARACTER_NOT_FOUND: &str = "Character not found.";
pub const MSG_INVALID_CHARACTER_ID: &str = "Invalid character ID.";

/// Map an error to the message a view shows next to its retry action.
pub fn user_message(err: &(impl ErrorCode + ?Sized)) -> &'static str {
    match err.kind() {
        ErrorKind::Network => MSG_NETWORK_ERROR,
        ErrorKind::NotFound => MSG_NO_RESULTS,
        ErrorKind::Server => MSG_SERVER_ERROR,
        ErrorKind::Validation | ErrorKind::Storage => MSG_UNKNOWN_ERROR,
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
