//! Property tests for key derivation and assembly.

use lesion::fragment::{assemble, derive_key, Fragment, FragmentKey};
use lesion::resolver::{JsonResolver, Resolver, ResolverSet};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

fn segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,8}"
}

proptest! {
    #[test]
    fn key_follows_relative_path(
        root_parts in prop::collection::vec(segment(), 1..4),
        dirs in prop::collection::vec(segment(), 0..5),
        name in segment(),
    ) {
        let root: PathBuf = std::iter::once("/".to_string()).chain(root_parts).collect();
        let mut file = root.clone();
        for dir in &dirs {
            file.push(dir);
        }
        file.push(format!("{}.json", name));

        let resolver = JsonResolver::default();
        prop_assert!(resolver.matches(&file));
        let key = derive_key(&root, &file, &resolver).unwrap();

        let mut expected = dirs.clone();
        expected.push(name);
        prop_assert_eq!(key.segments(), expected.as_slice());
        prop_assert_eq!(FragmentKey::parse(&key.to_string()), key);
    }

    #[test]
    fn files_outside_root_have_no_key(
        root in segment(),
        other in segment(),
        name in segment(),
    ) {
        prop_assume!(root != other);
        let file = Path::new("/").join(&other).join(format!("{}.json", name));
        let set = ResolverSet::builtin();
        let resolver = set.find(&file).unwrap();
        prop_assert!(derive_key(&Path::new("/").join(&root), &file, resolver).is_none());
    }

    #[test]
    fn deepest_fragment_wins_regardless_of_input_order(
        parent in segment(),
        child in segment(),
        reverse in any::<bool>(),
    ) {
        let shallow = fragment(&[&parent], json!(1));
        let deep = fragment(&[&parent, &child], json!(2));
        let fragments = if reverse { vec![deep, shallow] } else { vec![shallow, deep] };

        let value = assemble(&fragments);
        prop_assert_eq!(&value[&parent][&child], &json!(2));
    }
}

fn fragment(segments: &[&str], value: Value) -> Fragment {
    Fragment {
        file: PathBuf::from(format!("/store/{}.json", segments.join("/"))),
        key: FragmentKey::new(segments.iter().copied()),
        resolver: "json".to_string(),
        value,
    }
}
