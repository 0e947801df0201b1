/// An expected, user-caused condition whose message is safe to show verbatim.
///
/// Everything else that escapes a command is treated as an internal fault and
/// reported generically by the framework error hook.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct UserFacingError(pub String);

impl UserFacingError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
