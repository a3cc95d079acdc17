use std::fmt;

/// What part of parsing or validation produced an error.
///
/// Mirrors the `(object, state, cause)` shape the core propagates unchanged:
/// `target` names the object involved, `state` is the parser state (or
/// accessor name) active when the error was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathErrorTarget {
    /// The raw input string as a whole.
    String,
    /// A single unexpected character.
    Char,
    /// A structured field being decoded (port, IPv4 octet, IPv6 group, OID).
    Data,
    /// A caller-supplied output buffer.
    Buffer,
    /// A parameter/argument to a constructor.
    Param,
}

impl fmt::Display for PathErrorTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PathErrorTarget::String => "string",
            PathErrorTarget::Char => "char",
            PathErrorTarget::Data => "data",
            PathErrorTarget::Buffer => "buffer",
            PathErrorTarget::Param => "param",
        };
        f.write_str(s)
    }
}

/// The cause attached to a [`PathErrorTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathErrorCause {
    Empty,
    Null,
    Invalid,
    Unexpected,
    Insufficient,
    Excessive,
}

impl fmt::Display for PathErrorCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PathErrorCause::Empty => "empty",
            PathErrorCause::Null => "null",
            PathErrorCause::Invalid => "invalid",
            PathErrorCause::Unexpected => "unexpected",
            PathErrorCause::Insufficient => "insufficient",
            PathErrorCause::Excessive => "excessive",
        };
        f.write_str(s)
    }
}

/// Error raised by the parser or serializer.
///
/// Carries the parser state name active at the point of failure so callers
/// debugging a malformed input can see exactly where the state machine gave up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{target}, {cause} (at state {state}, offset {offset})")]
pub struct PathError {
    pub target: PathErrorTarget,
    pub cause: PathErrorCause,
    pub state: &'static str,
    pub offset: usize,
}

impl PathError {
    pub fn new(
        target: PathErrorTarget,
        cause: PathErrorCause,
        state: &'static str,
        offset: usize,
    ) -> Self {
        Self {
            target,
            cause,
            state,
            offset,
        }
    }

    pub fn empty_string(state: &'static str) -> Self {
        Self::new(PathErrorTarget::String, PathErrorCause::Empty, state, 0)
    }

    pub fn unexpected_char(state: &'static str, offset: usize) -> Self {
        Self::new(
            PathErrorTarget::Char,
            PathErrorCause::Unexpected,
            state,
            offset,
        )
    }

    pub fn insufficient(state: &'static str, offset: usize) -> Self {
        Self::new(
            PathErrorTarget::Data,
            PathErrorCause::Insufficient,
            state,
            offset,
        )
    }

    pub fn excessive(state: &'static str, offset: usize) -> Self {
        Self::new(
            PathErrorTarget::Data,
            PathErrorCause::Excessive,
            state,
            offset,
        )
    }

    pub fn invalid_param(state: &'static str) -> Self {
        Self::new(PathErrorTarget::Param, PathErrorCause::Invalid, state, 0)
    }

    pub fn buffer_insufficient(state: &'static str) -> Self {
        Self::new(
            PathErrorTarget::Buffer,
            PathErrorCause::Insufficient,
            state,
            0,
        )
    }
}
