use thiserror::Error;

/// The operating system could not initialize a native lock.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("failed to initialize lock (os error {code})")]
pub struct InitError {
    code: i32,
}

impl InitError {
    /// Wraps an error code returned by the operating system, such as `ENOMEM`.
    pub const fn from_os_error(code: i32) -> Self {
        Self { code }
    }

    /// The error code returned by the operating system.
    pub const fn os_error(&self) -> i32 {
        self.code
    }
}
