//! Relationship toggle engine.
//!
//! Maintains the two user-owned relationship sets (favorited articles, followed users) and the
//! article favorite counter. Every function here works on in-memory record copies; the repository
//! that loaded them is responsible for persisting the affected records together.

use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Article, User},
};

/// Action
///
/// What to do with the target's membership in the subject's set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Flip membership. Applying it twice restores the original state.
    Toggle,
    /// Ensure membership. No-op when already a member.
    Add,
    /// Ensure non-membership. No-op when not a member.
    Remove,
}

/// apply
///
/// Core set/counter transition shared by favorites and follows. `set` is treated as a set:
/// insertion never duplicates an id. When `counter` is given it moves in lockstep with the set,
/// and a decrement is clamped at zero.
///
/// Returns the final membership of `target` in `set`.
pub fn apply(set: &mut Vec<Uuid>, target: Uuid, counter: Option<&mut i64>, action: Action) -> bool {
    let position = set.iter().position(|id| *id == target);
    let insert = match (action, position) {
        (Action::Toggle, Some(_)) | (Action::Remove, Some(_)) => false,
        (Action::Toggle, None) | (Action::Add, None) => true,
        // Already in the requested state.
        (Action::Add, Some(_)) => return true,
        (Action::Remove, None) => return false,
    };

    if insert {
        set.push(target);
        if let Some(counter) = counter {
            *counter += 1;
        }
        true
    } else {
        if let Some(index) = position {
            set.remove(index);
        }
        if let Some(counter) = counter {
            *counter = (*counter - 1).max(0);
        }
        false
    }
}

/// favorite
///
/// Subject = user, target = article, set = `user.favorited_articles`,
/// counter = `article.favorites_count`. Returns whether the user now favorites the article.
pub fn favorite(user: &mut User, article: &mut Article, action: Action) -> bool {
    apply(
        &mut user.favorited_articles,
        article.id,
        Some(&mut article.favorites_count),
        action,
    )
}

/// follow
///
/// Subject = follower, target = followed user, set = `subject.followed_users`. Follows carry no
/// counter. A user can never follow themselves; that request fails before any state changes.
pub fn follow(subject: &mut User, target: &User, action: Action) -> Result<bool, AppError> {
    if subject.id == target.id {
        return Err(AppError::InvalidOperation(
            "users cannot follow themselves".to_string(),
        ));
    }
    Ok(apply(&mut subject.followed_users, target.id, None, action))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_inserts_then_removes() {
        let target = Uuid::new_v4();
        let mut set = Vec::new();
        let mut count = 0;

        assert!(apply(&mut set, target, Some(&mut count), Action::Toggle));
        assert_eq!(set, vec![target]);
        assert_eq!(count, 1);

        assert!(!apply(&mut set, target, Some(&mut count), Action::Toggle));
        assert!(set.is_empty());
        assert_eq!(count, 0);
    }

    #[test]
    fn decrement_is_clamped_at_zero() {
        let target = Uuid::new_v4();
        let mut set = vec![target];
        let mut count = 0;

        assert!(!apply(&mut set, target, Some(&mut count), Action::Toggle));
        assert_eq!(count, 0);
    }

    #[test]
    fn add_and_remove_are_idempotent() {
        let target = Uuid::new_v4();
        let mut set = Vec::new();
        let mut count = 3;

        assert!(apply(&mut set, target, Some(&mut count), Action::Add));
        assert!(apply(&mut set, target, Some(&mut count), Action::Add));
        assert_eq!(set.len(), 1);
        assert_eq!(count, 4);

        assert!(!apply(&mut set, target, Some(&mut count), Action::Remove));
        assert!(!apply(&mut set, target, Some(&mut count), Action::Remove));
        assert!(set.is_empty());
        assert_eq!(count, 3);
    }

    #[test]
    fn follow_rejects_self_without_mutation() {
        let mut me = User::new("alice".into(), "Alice".into(), "hash".into());
        let same = me.clone();

        let result = follow(&mut me, &same, Action::Toggle);

        assert!(matches!(result, Err(AppError::InvalidOperation(_))));
        assert!(me.followed_users.is_empty());
    }

    #[test]
    fn favorite_keeps_set_and_counter_in_step() {
        let mut user = User::new("bob".into(), "Bob".into(), "hash".into());
        let mut article = Article {
            id: Uuid::new_v4(),
            ..Article::default()
        };

        assert!(favorite(&mut user, &mut article, Action::Toggle));
        assert!(user.has_favorited(article.id));
        assert_eq!(article.favorites_count, 1);

        assert!(!favorite(&mut user, &mut article, Action::Toggle));
        assert!(!user.has_favorited(article.id));
        assert_eq!(article.favorites_count, 0);
    }
}
