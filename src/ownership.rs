//! Ownership guard for article and comment mutations.

use crate::{
    error::AppError,
    models::{Article, Comment, IdentityRef},
};

/// Owned
///
/// A resource with an immutable author reference.
pub trait Owned {
    /// Human-readable resource name used in rejection messages.
    const KIND: &'static str;

    fn author(&self) -> IdentityRef;
}

impl Owned for Article {
    const KIND: &'static str = "article";

    fn author(&self) -> IdentityRef {
        IdentityRef::new(self.author_id)
    }
}

impl Owned for Comment {
    const KIND: &'static str = "comment";

    // The comment's own author, never the parent article's.
    fn author(&self) -> IdentityRef {
        IdentityRef::new(self.author_id)
    }
}

/// assert_owner
///
/// Succeeds only when `identity` is the resource's author. Callers must load the resource
/// first so that a missing record reports `NotFound` before any `Forbidden`.
pub fn assert_owner<R: Owned>(resource: &R, identity: IdentityRef) -> Result<(), AppError> {
    if resource.author() == identity {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "only the author may modify this {}",
            R::KIND
        )))
    }
}
