//! Application error type.
//!
//! Every fallible operation in the crate returns `Result<_, AppError>`. The exit code
//! travels with the error so `main` can map failures onto process status:
//!
//! - `2`: invalid input or configuration (I/O, parse errors, bad flags)
//! - `3`: precondition violation in event data (malformed upstream input)
//! - `4`: internal numerical failure
//!
//! Recoverable per-hypothesis failures (an unsolvable W-mass constraint, for example)
//! are not errors; they are modelled as `Option` and simply drop the hypothesis.

/// Exit code for invalid input or configuration.
pub const EXIT_INPUT: u8 = 2;
/// Exit code for malformed event data.
pub const EXIT_PRECONDITION: u8 = 3;
/// Exit code for internal numerical failures.
pub const EXIT_NUMERIC: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    /// Invalid input or configuration.
    pub fn input(message: impl Into<String>) -> Self {
        Self::new(EXIT_INPUT, message)
    }

    /// Malformed event data; fatal for the event, never retried.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::new(EXIT_PRECONDITION, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn is_precondition(&self) -> bool {
        self.exit_code == EXIT_PRECONDITION
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
