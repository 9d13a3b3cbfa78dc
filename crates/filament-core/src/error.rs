use thiserror::Error;

/// Usage and configuration errors. These point at a programming mistake in the
/// caller and are never swallowed by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilamentError {
    #[error("the {0} can only be configured once")]
    AlreadyConfigured(&'static str),
    #[error("no observable definition registered for type `{0}`")]
    UnknownType(&'static str),
}
