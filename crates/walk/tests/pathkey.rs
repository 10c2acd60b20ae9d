// crates/walk/tests/pathkey.rs
use proptest::prelude::*;
use transport::Platform;
use walk::PathKey;

fn segment() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,8}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn display_round_trips(parts in prop::collection::vec(segment(), 1..5)) {
        let rel = parts.join("/");
        let key = PathKey::new(&rel, '/', Platform::Posix).unwrap();
        prop_assert_eq!(key.to_string(), rel.clone());
        prop_assert_eq!(PathKey::new(&key.relpath(), '/', Platform::Posix).unwrap(), key);
    }

    #[test]
    fn case_variants_are_weakly_equal_on_windows(parts in prop::collection::vec(segment(), 1..5)) {
        let rel = parts.join("/");
        let a = PathKey::new(&rel, '/', Platform::Windows);
        let b = PathKey::new(&rel.to_uppercase(), '/', Platform::Windows);
        if let (Ok(a), Ok(b)) = (a, b) {
            prop_assert!(a.weak_eq(&b));
            prop_assert_eq!(a == b, rel == rel.to_uppercase());
        }
    }

    #[test]
    fn every_key_is_below_its_ancestors(parts in prop::collection::vec(segment(), 1..5)) {
        let key = PathKey::new(&parts.join("/"), '/', Platform::Posix).unwrap();
        for ancestor in key.ancestors() {
            prop_assert!(key.is_relative_to(&ancestor));
            prop_assert!(ancestor < key);
        }
    }
}

#[test]
fn separator_is_kept_for_display() {
    let key = PathKey::new(r"a\b", '\\', Platform::Windows).unwrap();
    assert_eq!(key.parts(), ["a", "b"]);
    assert_eq!(key.to_string(), r"a\b");
    assert_eq!(key.filter_path(), "a/b");
}
