use std::fmt;

/// A bounded context failed to answer a query.
///
/// Distinct from "not found": facades return `None`/empty/zero for absent
/// data. `ContextUnavailable` means the context itself could not be reached
/// and the caller should proceed as if the data were absent, after logging.
#[derive(Debug, thiserror::Error)]
pub struct ContextUnavailable {
    context: &'static str,
    #[source]
    source: sqlx::Error,
}

impl ContextUnavailable {
    pub fn new(context: &'static str, source: sqlx::Error) -> Self {
        Self { context, source }
    }

    /// The bounded context that failed, e.g. `"users"`.
    pub fn context(&self) -> &'static str {
        self.context
    }
}

impl fmt::Display for ContextUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} context unavailable", self.context)
    }
}

pub type ContextResult<T> = Result<T, ContextUnavailable>;
