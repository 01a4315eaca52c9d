use serde_json::{Map, Value};

use business::domain::product::snapshot::Snapshot;

/// Local replica of the subscribed node, rebuilt from `put`/`patch` events
/// so every event can be turned into a full snapshot.
///
/// Arrays are stored as objects keyed by index and `null` children are
/// pruned, matching how the database itself stores them.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RemoteTree {
    root: Value,
}

impl RemoteTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(Some(self.root.clone()))
    }

    /// Replaces the node at `path`.
    pub fn put(&mut self, path: &str, data: Value) {
        let segments = segments(path);
        set_at(&mut self.root, &segments, data);
    }

    /// Replaces each child named in `data` under `path`. Returns false when
    /// `data` is not an object.
    pub fn patch(&mut self, path: &str, data: Value) -> bool {
        let Value::Object(children) = data else {
            return false;
        };
        let base = segments(path);
        for (key, value) in children {
            let mut target = base.clone();
            target.extend(segments(&key));
            set_at(&mut self.root, &target, value);
        }
        true
    }
}

fn segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn set_at(node: &mut Value, path: &[String], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        *node = normalize(value);
        return;
    };

    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    let Value::Object(children) = node else {
        return;
    };

    let child = children.entry(head.clone()).or_insert(Value::Null);
    set_at(child, rest, value);
    if child.is_null() {
        children.remove(head);
    }
    if children.is_empty() {
        *node = Value::Null;
    }
}

fn normalize(value: Value) -> Value {
    let children: Map<String, Value> = match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), normalize(item)))
            .filter(|(_, item)| !item.is_null())
            .collect(),
        Value::Object(map) => map
            .into_iter()
            .map(|(key, item)| (key, normalize(item)))
            .filter(|(_, item)| !item.is_null())
            .collect(),
        scalar => return scalar,
    };
    if children.is_empty() {
        Value::Null
    } else {
        Value::Object(children)
    }
}
