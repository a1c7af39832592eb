use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised while parsing permission names or masks
#[derive(Debug, Error, Diagnostic)]
pub enum PermissionError {
    /// A name outside the permission registry
    #[error("Unknown permission `{0}`")]
    #[diagnostic(
        code(erc725::permissions::unknown),
        help("Permission names are upper case, e.g. CHANGEOWNER, SUPER_SETDATA or ALL_PERMISSIONS")
    )]
    UnknownPermission(SmolStr),

    /// A permission mask that is not 32 bytes of hex
    #[error("Invalid permission mask `{input}`: {reason}")]
    #[diagnostic(code(erc725::permissions::invalid_mask))]
    InvalidMask {
        /// The mask as given
        input: String,
        /// Description of the problem
        reason: String,
    },
}

impl PermissionError {
    /// Create an invalid mask error
    pub fn invalid_mask(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidMask {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for permission operations
pub type Result<T> = std::result::Result<T, PermissionError>;
