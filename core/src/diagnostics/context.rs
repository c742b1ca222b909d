use crate::api::RelatedInfo;
use crate::diagnostics::Span;

/// Context information for error messages.
///
/// Provides additional information about where an error occurred,
/// such as "in call to function 'f'" or "in predicate of 'filter'".
/// Each context entry can be converted to a RelatedInfo for diagnostic display.
#[derive(Debug, Clone, PartialEq)]
pub enum Context {
    /// In a function call
    InFunctionCall { name: Option<String>, span: Span },
    /// Inside the predicate argument of a pipeline builtin
    InPredicate { builtin: String, span: Span },
    /// Where a `let` binding was introduced
    DefinedHere { what: String, span: Span },
}

impl Context {
    /// Convert to a RelatedInfo for diagnostic display
    pub fn to_related_info(&self) -> RelatedInfo {
        match self {
            Context::InFunctionCall { name, span } => RelatedInfo {
                span: span.clone(),
                message: match name {
                    Some(n) => format!("in call to function '{}'", n),
                    None => "in function call".to_string(),
                },
            },
            Context::InPredicate { builtin, span } => RelatedInfo {
                span: span.clone(),
                message: format!("in predicate of '{}'", builtin),
            },
            Context::DefinedHere { what, span } => RelatedInfo {
                span: span.clone(),
                message: format!("{} defined here", what),
            },
        }
    }
}
