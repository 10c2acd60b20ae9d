// crates/engine/tests/delete_order.rs
use engine::{Operation, delete_order};
use proptest::prelude::*;
use transport::Platform;
use walk::PathKey;

fn op(path: &str, dir: bool) -> Operation {
    let dst = PathKey::new(path, '/', Platform::Posix).unwrap();
    if dir {
        Operation::DeleteDir { dst }
    } else {
        Operation::Delete { dst, size: 0 }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn descendants_are_deleted_before_ancestors(
        paths in prop::collection::btree_set("[ab]{1,2}(/[ab]{1,2}){0,3}", 1..12)
    ) {
        let mut ops: Vec<Operation> = paths
            .iter()
            .map(|p| op(p, paths.iter().any(|q| q.starts_with(&format!("{p}/")))))
            .collect();
        ops.sort_by(delete_order);
        for (i, earlier) in ops.iter().enumerate() {
            for later in &ops[i + 1..] {
                prop_assert!(
                    !later.dst().is_relative_to(earlier.dst()) || later.dst() == earlier.dst(),
                    "{} deleted after its ancestor {}",
                    later.summary(),
                    earlier.summary()
                );
            }
        }
    }
}
