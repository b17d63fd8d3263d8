use thiserror::Error;

/// Marshaling failures raised through the host's error channel.
///
/// These abort the call before any native code runs; operation failures
/// are never reported this way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("bad argument #{index} to '{func}' ({expected} expected, got {got})")]
    BadArgument {
        func: &'static str,
        /// 1-based, as scripts count.
        index: usize,
        expected: &'static str,
        got: &'static str,
    },
    #[error("bad field '{field}' in argument #{index} to '{func}' ({expected} expected, got {got})")]
    BadField {
        func: &'static str,
        index: usize,
        field: String,
        expected: &'static str,
        got: &'static str,
    },
    #[error("bad argument #{index} to '{func}' ({value} does not fit a 32-bit integer)")]
    OutOfRange { func: &'static str, index: usize, value: i64 },
    #[error("attempt to call unknown function '{0}'")]
    UnknownFunction(String),
}

pub type Result<T> = std::result::Result<T, ScriptError>;
