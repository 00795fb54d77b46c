//! [`FormData`] implementations for common containers.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::FormData;

/// JSON objects. Dotted paths (`address.city`) address nested objects.
impl FormData for Value {
    type Value = Value;

    fn field(&self, name: &str) -> Option<Value> {
        lookup(self, name).cloned()
    }

    fn set_field(&mut self, name: &str, value: Value) {
        assign(self, name, value);
    }
}

fn assign(target: &mut Value, path: &str, value: Value) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let Value::Object(map) = target else {
        return;
    };
    match path.split_once('.') {
        None => {
            map.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            assign(map.entry(head.to_string()).or_insert(Value::Null), rest, value);
        }
    }
}

/// Resolve a dotted path inside a JSON value.
pub(crate) fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}

impl<V> FormData for BTreeMap<String, V>
where
    V: Clone + Send + Sync + 'static,
{
    type Value = V;

    fn field(&self, name: &str) -> Option<V> {
        self.get(name).cloned()
    }

    fn set_field(&mut self, name: &str, value: V) {
        self.insert(name.to_string(), value);
    }
}
