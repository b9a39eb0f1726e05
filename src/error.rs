//! Unified error type.

use std::fmt;

/// The error type returned by plumber's fallible operations.
///
/// Composing and running a pipeline never fails: malformed stages are
/// skipped and panics are left to a [`recover`](crate::middleware::recover)
/// stage or the host. This type surfaces infrastructure failures of the
/// bundled [`Server`](crate::Server): binding to a port or accepting a
/// connection.
#[derive(Debug)]
pub struct Error(std::io::Error);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "io: {}", self.0)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self(e)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn wraps_io_errors_as_source() {
        let err = Error::from(std::io::Error::new(std::io::ErrorKind::AddrInUse, "taken"));
        assert_eq!(err.to_string(), "io: taken");
        assert!(err.source().is_some());
    }
}
