use blogify::{
    models::{Article, User},
    relationship::{self, Action},
};
use proptest::prelude::*;
use uuid::Uuid;

fn user(name: &str) -> User {
    User::new(name.to_string(), name.to_string(), "hash".to_string())
}

fn article_by(author: &User) -> Article {
    Article {
        id: Uuid::new_v4(),
        author_id: author.id,
        ..Article::default()
    }
}

fn any_action() -> impl Strategy<Value = Action> {
    prop_oneof![Just(Action::Toggle), Just(Action::Add), Just(Action::Remove)]
}

fn has_duplicates(ids: &[Uuid]) -> bool {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    sorted.windows(2).any(|w| w[0] == w[1])
}

#[test]
fn test_toggle_twice_restores_both_records() {
    let author = user("author");
    let mut reader = user("reader");
    let mut article = article_by(&author);

    let before = (reader.clone(), article.clone());
    assert!(relationship::favorite(&mut reader, &mut article, Action::Toggle));
    assert!(!relationship::favorite(&mut reader, &mut article, Action::Toggle));
    assert_eq!((reader, article), before);
}

proptest! {
    #[test]
    fn prop_favorite_counter_tracks_membership(
        // (reader index, action) pairs applied to a single article
        steps in proptest::collection::vec((0usize..5, any_action()), 0..60)
    ) {
        let author = user("author");
        let mut article = article_by(&author);
        let mut readers: Vec<User> = (0..5).map(|i| user(&format!("r{i}"))).collect();

        for (index, action) in steps {
            let now = relationship::favorite(&mut readers[index], &mut article, action);
            prop_assert_eq!(now, readers[index].has_favorited(article.id));
        }

        let holders = readers.iter().filter(|r| r.has_favorited(article.id)).count() as i64;
        prop_assert_eq!(article.favorites_count, holders);
        for reader in &readers {
            prop_assert!(!has_duplicates(&reader.favorited_articles));
        }
    }

    #[test]
    fn prop_toggle_parity(toggles in 0usize..40) {
        let author = user("author");
        let mut reader = user("reader");
        let mut article = article_by(&author);

        for _ in 0..toggles {
            relationship::favorite(&mut reader, &mut article, Action::Toggle);
        }

        let expected = toggles % 2 == 1;
        prop_assert_eq!(reader.has_favorited(article.id), expected);
        prop_assert_eq!(article.favorites_count, i64::from(expected));
    }

    #[test]
    fn prop_follow_never_contains_self(
        steps in proptest::collection::vec((0usize..4, any_action()), 0..60)
    ) {
        let mut subject = user("subject");
        let mut others: Vec<User> = (0..3).map(|i| user(&format!("u{i}"))).collect();
        others.push(subject.clone());

        for (index, action) in steps {
            let target = others[index].clone();
            let result = relationship::follow(&mut subject, &target, action);
            if target.id == subject.id {
                prop_assert!(result.is_err());
            } else {
                prop_assert_eq!(result.unwrap(), subject.follows(target.id));
            }
        }

        prop_assert!(!subject.follows(subject.id));
        prop_assert!(!has_duplicates(&subject.followed_users));
    }
}
