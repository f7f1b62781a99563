use crate::api::ApiError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WidgetError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("{kind} '{target}' failed: {source}")]
    Action {
        kind: &'static str,
        target: String,
        #[source]
        source: ApiError,
    },
    #[error("no {kind} defined for this action")]
    MissingTarget { kind: &'static str },
    #[error("{kind} '{target}' returned {found} where {expected} was expected")]
    UnexpectedOutput {
        kind: &'static str,
        target: String,
        found: &'static str,
        expected: &'static str,
    },
    #[error("cannot open page '{0}' without an object")]
    PageWithoutObject(String),
}
