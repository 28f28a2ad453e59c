#![no_main]

use std::cell::Cell;
use std::rc::Rc;

use arbitrary::Arbitrary;
use dstore_core::{Record, RecordId};
use dstore_runtime::{DataStore, Mutation};
use libfuzzer_sys::fuzz_target;
use serde_json::{Map, json};

#[derive(Arbitrary, Debug)]
enum FuzzOp {
    Load { ids: Vec<i8>, total: u64 },
    Append { ids: Vec<i8> },
    Update { id: i8, qty: i32 },
    Remove { id: i8 },
    RemoveMany { ids: Vec<i8> },
    SetLoading(bool),
    Clear,
}

fn records(ids: &[i8]) -> Vec<Record> {
    ids.iter()
        .map(|&id| Record::from_value(json!({"id": id, "qty": 0})).expect("valid record"))
        .collect()
}

impl FuzzOp {
    fn to_mutation(&self) -> Mutation {
        match self {
            Self::Load { ids, total } => Mutation::load(records(ids), *total),
            Self::Append { ids } => Mutation::append(records(ids)),
            Self::Update { id, qty } => {
                let mut patch = Map::new();
                patch.insert("qty".into(), json!(qty));
                Mutation::update_by_id(RecordId(i64::from(*id)), patch)
            }
            Self::Remove { id } => Mutation::remove_by_id(RecordId(i64::from(*id))),
            Self::RemoveMany { ids } => Mutation::RemoveMany {
                ids: ids.iter().map(|&id| RecordId(i64::from(id))).collect(),
            },
            Self::SetLoading(flag) => Mutation::SetLoading(*flag),
            Self::Clear => Mutation::Clear,
        }
    }
}

fuzz_target!(|input: Vec<FuzzOp>| {
    let store = DataStore::default();
    let notified = Rc::new(Cell::new(0u64));
    let counter = Rc::clone(&notified);
    let _sub = store.subscribe(move || counter.set(counter.get() + 1));

    let mut applied = 0u64;
    for op in input.iter().take(256) {
        let before = store.get_state();
        match store.mutate(op.to_mutation()) {
            Ok(()) => applied += 1,
            Err(_) => assert!(Rc::ptr_eq(&before, &store.get_state())),
        }
        let mut ids = store.get_state().ids();
        let len = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), len, "duplicate ids after {op:?}");
    }
    assert_eq!(store.version(), applied);
    assert_eq!(notified.get(), applied);
});
