#![no_main]

use dstore_core::Record;
use libfuzzer_sys::fuzz_target;
use serde_json::{Map, Value};

fn has_dotted_keys(fields: &Map<String, Value>) -> bool {
    fields.iter().any(|(key, value)| {
        key.contains('.') || value.as_object().is_some_and(has_dotted_keys)
    })
}

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    let Ok(record) = Record::from_value(value.clone()) else {
        return;
    };
    // Without dotted names, refreshing a record from itself is the identity.
    if !has_dotted_keys(record.fields()) {
        assert_eq!(record.refreshed(&record), record);
    }
    if let Value::Object(patch) = value {
        let patched = record.patched(&patch).expect("own fields are a valid patch");
        assert_eq!(patched.id(), record.id());
    }
});
