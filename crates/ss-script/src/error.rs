use ss_world::{ItemId, WorldError};

/// Alias for `Result<T, ScriptError>`.
pub type ScriptResult<T> = Result<T, ScriptError>;

/// Alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;

/// Category of a script failure. Every category is terminal for the
/// instance that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed structure or literal.
    Parse,
    /// Unknown variable, function, or target.
    Reference,
    /// Missing authority, or a failed range/facing check.
    Auth,
    /// Parameter count mismatch.
    Arity,
    /// Inventory or call-stack resource exhausted.
    Resource,
    /// Token budget drained within one tick.
    BudgetExceeded,
    /// Invalid comparison operator.
    UnknownOperator,
    /// Custom message raised by a system function.
    Custom,
    /// System function path that has no implementation.
    NotImplemented,
}

/// A terminal error raised while interpreting a script line.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScriptError {
    /// `end` or `else` without an open block.
    #[error("Unexpected '{0}'")]
    UnexpectedBlockKeyword(&'static str),

    /// `if` without a matching `end` before the end of the script.
    #[error("Missing 'end' for block")]
    UnclosedBlock,

    /// `var` line without a usable `NAME = EXPR` shape.
    #[error("Invalid variable definition syntax")]
    InvalidVariableSyntax,

    /// Condition text that cannot be split into comparisons.
    #[error("Invalid condition: {0}")]
    InvalidCondition(String),

    /// Nothing to evaluate where a value was expected.
    #[error("Empty expression")]
    EmptyExpression,

    /// Call text without a balanced parameter list.
    #[error("Malformed call '{0}'")]
    MalformedCall(String),

    /// An integer was required.
    #[error("Expected a number, got {0}")]
    NotANumber(String),

    /// Division by zero or overflow.
    #[error("Arithmetic error: {0}")]
    Arithmetic(String),

    /// A resumed line no longer contains the call it was waiting on.
    #[error("Cannot resume call '{0}'")]
    LostResume(String),

    /// `var` on a name that already exists.
    #[error("Variable '{0}' already defined")]
    VariableAlreadyDefined(String),

    /// Assignment to a name that was never declared.
    #[error("Variable '{0}' not defined")]
    VariableNotDefined(String),

    /// Chain root or accessor that resolves to nothing.
    #[error("Null object reference ({0})")]
    NullReference(String),

    /// No entity, item, or system function with this name.
    #[error("Referencing non-existent function {0}")]
    UnknownFunction(String),

    /// Function referenced by a type but never given a script.
    #[error("Referencing non-defined function {0}")]
    UndefinedFunction(String),

    /// The loader has no script under this name.
    #[error("Script not found: {0}")]
    ScriptNotFound(String),

    /// The script exists but has no lines to run.
    #[error("Script {0} is empty")]
    EmptyScript(String),

    /// Authority root `_` used without server authority.
    #[error("Invalid authentication")]
    Unauthenticated,

    /// Target of an entity function is too far away.
    #[error("Target out of range ({distance} > {max})")]
    OutOfRange {
        /// Summed tile delta to the target.
        distance: i32,
        /// Allowed maximum.
        max: i32,
    },

    /// Caller does not face the target of an entity function.
    #[error("Not facing target")]
    NotFacing,

    /// Item function invoked on an item the caller does not hold.
    #[error("Item {0} is not held by the caller")]
    ItemNotHeld(ItemId),

    /// Wrong number of parameters.
    #[error("Invalid number of parameters got for function [{function}] {got}, {expected} expected")]
    Arity {
        /// Function name.
        function: String,
        /// Declared parameter count.
        expected: usize,
        /// Supplied parameter count.
        got: usize,
    },

    /// Inventory full, missing storage, or empty slot.
    #[error("{0}")]
    Resource(String),

    /// Parent chain longer than the configured limit.
    #[error("Call depth exceeded ({0})")]
    CallDepthExceeded(usize),

    /// The per-tick token budget ran out.
    #[error("Logic tokens drained")]
    BudgetExceeded,

    /// Comparison operator outside `== != < <= > >=`.
    #[error("Invalid conditional operator '{0}'")]
    UnknownOperator(String),

    /// Free-form message from a system function.
    #[error("{0}")]
    Custom(String),

    /// System function path without an implementation.
    #[error("Not implemented: [{0}]")]
    NotImplemented(String),
}

impl ScriptError {
    /// Taxonomy category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnexpectedBlockKeyword(_)
            | Self::UnclosedBlock
            | Self::InvalidVariableSyntax
            | Self::InvalidCondition(_)
            | Self::EmptyExpression
            | Self::MalformedCall(_)
            | Self::NotANumber(_)
            | Self::Arithmetic(_)
            | Self::LostResume(_) => ErrorKind::Parse,
            Self::VariableAlreadyDefined(_)
            | Self::VariableNotDefined(_)
            | Self::NullReference(_)
            | Self::UnknownFunction(_)
            | Self::UndefinedFunction(_)
            | Self::ScriptNotFound(_)
            | Self::EmptyScript(_) => ErrorKind::Reference,
            Self::Unauthenticated
            | Self::OutOfRange { .. }
            | Self::NotFacing
            | Self::ItemNotHeld(_) => ErrorKind::Auth,
            Self::Arity { .. } => ErrorKind::Arity,
            Self::Resource(_) | Self::CallDepthExceeded(_) => ErrorKind::Resource,
            Self::BudgetExceeded => ErrorKind::BudgetExceeded,
            Self::UnknownOperator(_) => ErrorKind::UnknownOperator,
            Self::Custom(_) => ErrorKind::Custom,
            Self::NotImplemented(_) => ErrorKind::NotImplemented,
        }
    }
}

/// Errors raised while setting up or driving a simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// No script under this name in the requested category.
    #[error("script not found: {0}")]
    ScriptNotFound(String),

    /// Attaching a blank script.
    #[error("cannot attach empty script")]
    EmptyScript,

    /// A script file could not be turned into a function descriptor.
    #[error("invalid function script {file}: {message}")]
    Repository {
        /// Offending script name.
        file: String,
        /// What was wrong with it.
        message: String,
    },

    /// Reading a script directory failed.
    #[error("cannot read {path}: {source}")]
    Io {
        /// Path that was accessed.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// World-level failure (unknown entity, type, ...).
    #[error(transparent)]
    World(#[from] WorldError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(ScriptError::UnexpectedBlockKeyword("end").kind(), ErrorKind::Parse);
        assert_eq!(ScriptError::UnknownFunction("x".into()).kind(), ErrorKind::Reference);
        assert_eq!(ScriptError::NotFacing.kind(), ErrorKind::Auth);
        assert_eq!(
            ScriptError::Arity {
                function: "f".into(),
                expected: 2,
                got: 1
            }
            .kind(),
            ErrorKind::Arity
        );
        assert_eq!(ScriptError::Resource("Inventory full".into()).kind(), ErrorKind::Resource);
        assert_eq!(ScriptError::BudgetExceeded.kind(), ErrorKind::BudgetExceeded);
        assert_eq!(ScriptError::UnknownOperator("=<".into()).kind(), ErrorKind::UnknownOperator);
    }

    #[test]
    fn messages_render() {
        assert_eq!(ScriptError::UnexpectedBlockKeyword("else").to_string(), "Unexpected 'else'");
        assert_eq!(
            ScriptError::OutOfRange { distance: 3, max: 1 }.to_string(),
            "Target out of range (3 > 1)"
        );
        assert_eq!(ScriptError::Resource("Inventory full".into()).to_string(), "Inventory full");
    }
}
