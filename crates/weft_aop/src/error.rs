//! Error types for aspect configuration and advised invocation.

use thiserror::Error;

/// Errors raised while transforming declarations, building pointcuts, or
/// weaving. All of them are fatal for the weave that produced them.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A declaration is structurally unusable.
    #[error("Invalid aspect declaration: {0}")]
    InvalidDeclaration(String),

    /// An advice location string is not one of `before`, `after`, `around`.
    #[error("Invalid advice type '{location}' in aspect '{aspect}'")]
    UnknownAdviceLocation {
        /// The offending location string.
        location: String,
        /// The aspect that declared it.
        aspect: String,
    },

    /// A pointcut kind string is not one of `beans`, `within`.
    #[error("Invalid pointcut type '{kind}' in aspect '{aspect}'")]
    UnknownPointcutKind {
        /// The offending pointcut kind.
        kind: String,
        /// The aspect that declared it.
        aspect: String,
    },

    /// A configuration record names an advisor type nobody registered.
    #[error("Aspect type '{0}' could not be found")]
    UnknownAspectType(String),

    /// An advice refers to a method its advisor does not have.
    #[error("Advice method '{method}' not found in aspect '{aspect}'")]
    AdviceMethodNotFound {
        /// The missing advice method.
        method: String,
        /// The aspect that declared it.
        aspect: String,
    },

    /// Around advice bound to a plain method, or before/after advice bound to
    /// a proceeding one.
    #[error("Advice method '{method}' in aspect '{aspect}' cannot be used as {location} advice")]
    AdviceSignatureMismatch {
        /// The advice method.
        method: String,
        /// The aspect that declared it.
        aspect: String,
        /// The location it was declared for.
        location: String,
    },

    /// A `beans` selector is not well formed.
    #[error("Invalid join point '{selector}' in aspect '{aspect}'")]
    InvalidSelector {
        /// The offending selector.
        selector: String,
        /// The aspect that declared it.
        aspect: String,
    },

    /// A selector names a method the component does not have.
    #[error("Method '{method}' from pointcut '{selector}' could not be found")]
    MethodNotFound {
        /// The method signature that was looked up.
        method: String,
        /// The selector that referenced it.
        selector: String,
    },

    /// A selector or pointcut names a component that is not registered.
    #[error("Component '{0}' is not registered")]
    ComponentNotFound(String),

    /// A declarative configuration document failed to parse.
    #[error("Configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates an [`InvalidDeclaration`](Self::InvalidDeclaration).
    pub fn invalid_declaration(msg: impl Into<String>) -> Self {
        Self::InvalidDeclaration(msg.into())
    }

    /// Creates an [`InvalidSelector`](Self::InvalidSelector).
    pub fn invalid_selector(selector: impl Into<String>, aspect: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            aspect: aspect.into(),
        }
    }

    /// Creates a [`MethodNotFound`](Self::MethodNotFound).
    pub fn method_not_found(method: impl Into<String>, selector: impl Into<String>) -> Self {
        Self::MethodNotFound {
            method: method.into(),
            selector: selector.into(),
        }
    }

    /// Creates a [`ComponentNotFound`](Self::ComponentNotFound).
    pub fn component_not_found(name: impl Into<String>) -> Self {
        Self::ComponentNotFound(name.into())
    }
}

/// Errors raised while a proxied call runs.
///
/// Failures produced by advice or by the target travel back to the caller of
/// the proxy as they were returned.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// A join point was invoked without an advisor.
    #[error("Join point has no advisor")]
    MissingAdvisor,

    /// A join point was invoked without an advice method.
    #[error("Join point has no advice method")]
    MissingAdvice,

    /// The join point has no bound method to proceed to.
    #[error("No method is bound to the join point")]
    MethodNotBound,

    /// The join point has no target to proceed to.
    #[error("No target is bound to the join point")]
    TargetNotBound,

    /// A component was asked for a method it does not expose.
    #[error("Type '{type_name}' has no method '{signature}'")]
    NoSuchMethod {
        /// The component type.
        type_name: String,
        /// The requested signature.
        signature: String,
    },

    /// A proceeding advice method was bound to a plain join point.
    #[error("Advice '{0}' requires a proceeding join point")]
    AdviceKindMismatch(String),

    /// The advice or the target reported a failure.
    #[error("Invocation failed: {0}")]
    Failed(String),

    /// Argument or result (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl InvocationError {
    /// Creates a [`NoSuchMethod`](Self::NoSuchMethod).
    pub fn no_such_method(type_name: impl Into<String>, signature: impl Into<String>) -> Self {
        Self::NoSuchMethod {
            type_name: type_name.into(),
            signature: signature.into(),
        }
    }

    /// Creates a [`Failed`](Self::Failed).
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}
