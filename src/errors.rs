//! Definition of errors.

use std::error::Error;
use std::fmt;
use std::io;

/// A specialized Result type for this crate.
pub type Result<T, E = DachoundError> = std::result::Result<T, E>;

/// Errors in dachound.
#[derive(Debug)]
pub enum DachoundError {
    /// Contains [`InvalidArgumentError`].
    InvalidArgument(InvalidArgumentError),

    /// Contains [`AutomatonScaleError`].
    AutomatonScale(AutomatonScaleError),

    /// Contains [`CorruptInputError`].
    CorruptInput(CorruptInputError),

    /// Contains [`std::io::Error`].
    Io(io::Error),
}

impl fmt::Display for DachoundError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidArgument(e) => e.fmt(f),
            Self::AutomatonScale(e) => e.fmt(f),
            Self::CorruptInput(e) => e.fmt(f),
            Self::Io(e) => e.fmt(f),
        }
    }
}

impl Error for DachoundError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidArgument(e) => Some(e),
            Self::AutomatonScale(e) => Some(e),
            Self::CorruptInput(e) => Some(e),
            Self::Io(e) => Some(e),
        }
    }
}

impl From<io::Error> for DachoundError {
    fn from(e: io::Error) -> Self {
        // A stream that ends in the middle of a section is a malformed
        // stream, not an I/O failure of the underlying device.
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Self::corrupt_input("unexpected end of stream")
        } else {
            Self::Io(e)
        }
    }
}

impl DachoundError {
    pub(crate) fn invalid_argument<S>(arg: &'static str, msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::InvalidArgument(InvalidArgumentError {
            arg,
            msg: msg.into(),
        })
    }

    pub(crate) fn automaton_scale<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::AutomatonScale(AutomatonScaleError { msg: msg.into() })
    }

    pub(crate) fn corrupt_input<S>(msg: S) -> Self
    where
        S: Into<String>,
    {
        Self::CorruptInput(CorruptInputError { msg: msg.into() })
    }
}

/// Error used when the argument is invalid.
#[derive(Debug)]
pub struct InvalidArgumentError {
    /// Name of the argument.
    pub(crate) arg: &'static str,

    /// Error message.
    pub(crate) msg: String,
}

impl fmt::Display for InvalidArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InvalidArgumentError: {}: {}", self.arg, self.msg)
    }
}

impl Error for InvalidArgumentError {}

/// Error used when the scale of the automaton exceeds the expected one.
#[derive(Debug)]
pub struct AutomatonScaleError {
    pub(crate) msg: String,
}

impl fmt::Display for AutomatonScaleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "AutomatonScaleError: {}", self.msg)
    }
}

impl Error for AutomatonScaleError {}

/// Error used when a serialized automaton cannot be decoded.
#[derive(Debug)]
pub struct CorruptInputError {
    pub(crate) msg: String,
}

impl fmt::Display for CorruptInputError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CorruptInputError: {}", self.msg)
    }
}

impl Error for CorruptInputError {}
