/// Result alias that carries the custom [`FaceRadioError`] type.
pub type Result<T> = std::result::Result<T, FaceRadioError>;

/// Common error type for the core crate.
///
/// The control logic itself never fails (out-of-range inputs are clamped
/// rather than rejected), so errors only surface from the settings-store
/// boundary and from host IO.
#[derive(Debug, thiserror::Error)]
pub enum FaceRadioError {
    /// Generic message, used by hosts wrapping foreign error types.
    #[error("{0}")]
    Message(String),
    /// Error reported by a [`SettingsStore`](crate::settings::SettingsStore)
    /// implementation while reading, writing or committing bytes.
    #[error("settings store: {0}")]
    Store(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl FaceRadioError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Creates a store error with the provided detail.
    pub fn store<T: Into<String>>(msg: T) -> Self {
        Self::Store(msg.into())
    }
}

impl From<&str> for FaceRadioError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for FaceRadioError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
