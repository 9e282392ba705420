// fun_project_root/fun_core/src/container.rs
//! Keyed access over the two container shapes a chain can meet: plain
//! lists/maps, addressed directly, and objects exposing an [`Indexable`] view.

use crate::error::{FunError, FunResult};
use crate::value::{Indexable, Key, Value, ValueMap};
use std::sync::Arc;

pub enum Container<'a> {
    List(&'a Arc<Vec<Value>>),
    Map(&'a Arc<ValueMap>),
    Indexable(&'a dyn Indexable),
}

impl<'a> Container<'a> {
    pub fn of(value: &'a Value, operation: &str) -> FunResult<Container<'a>> {
        match value {
            Value::List(items) => Ok(Container::List(items)),
            Value::Map(entries) => Ok(Container::Map(entries)),
            Value::Object(obj) => obj.as_indexable().map(Container::Indexable).ok_or_else(|| {
                FunError::UnsupportedOperation(format!(
                    "cannot {} on {}: it is not indexable",
                    operation,
                    obj.type_name()
                ))
            }),
            other => Err(FunError::UnsupportedOperation(format!(
                "cannot {} on {}",
                operation,
                other.type_name()
            ))),
        }
    }
}

fn list_index(items: &[Value], key: &Key) -> Option<usize> {
    match key {
        Key::Int(i) if *i >= 0 && (*i as usize) < items.len() => Some(*i as usize),
        _ => None,
    }
}

/// Re-keys a list by position, for writes and removals a list can't express.
fn list_to_map(items: &[Value]) -> ValueMap {
    items
        .iter()
        .enumerate()
        .map(|(i, v)| (Key::Int(i as i64), v.clone()))
        .collect()
}

pub fn get_key(value: &Value, key: &Key) -> FunResult<Value> {
    match Container::of(value, "read a key")? {
        Container::List(items) => list_index(items, key)
            .map(|i| items[i].clone())
            .ok_or_else(|| FunError::KeyNotFound(format!("index {} of list", key))),
        Container::Map(entries) => entries
            .get(key)
            .cloned()
            .ok_or_else(|| FunError::KeyNotFound(format!("key '{}' of map", key))),
        Container::Indexable(obj) => obj.get(key),
    }
}

/// Returns the container with `key` set. Plain containers come back as an
/// updated copy; indexable objects are written in place and returned as is.
pub fn set_key(value: Value, key: Key, item: Value) -> FunResult<Value> {
    match Container::of(&value, "set a key")? {
        Container::Indexable(obj) => {
            obj.set(key, item)?;
            return Ok(value);
        }
        Container::List(_) | Container::Map(_) => {}
    }
    match value {
        Value::List(mut items) => {
            let len = items.len() as i64;
            match key {
                Key::Int(i) if i >= 0 && i < len => {
                    Arc::make_mut(&mut items)[i as usize] = item;
                    Ok(Value::List(items))
                }
                Key::Int(i) if i == len => {
                    Arc::make_mut(&mut items).push(item);
                    Ok(Value::List(items))
                }
                key => {
                    let mut entries = list_to_map(&items);
                    entries.insert(key, item);
                    Ok(Value::Map(Arc::new(entries)))
                }
            }
        }
        Value::Map(mut entries) => {
            Arc::make_mut(&mut entries).insert(key, item);
            Ok(Value::Map(entries))
        }
        _ => unreachable!("Container::of only admits lists, maps and indexables"),
    }
}

/// Returns the container without `key`. Removing a missing key is a no-op.
pub fn unset_key(value: Value, key: &Key) -> FunResult<Value> {
    match Container::of(&value, "unset a key")? {
        Container::Indexable(obj) => {
            obj.unset(key)?;
            return Ok(value);
        }
        Container::List(_) | Container::Map(_) => {}
    }
    match value {
        Value::List(mut items) => match list_index(&items, key) {
            None => Ok(Value::List(items)),
            Some(i) if i + 1 == items.len() => {
                Arc::make_mut(&mut items).pop();
                Ok(Value::List(items))
            }
            // Remaining elements keep their indices, so the result is keyed.
            Some(_) => {
                let mut entries = list_to_map(&items);
                entries.shift_remove(key);
                Ok(Value::Map(Arc::new(entries)))
            }
        },
        Value::Map(mut entries) => {
            if entries.contains_key(key) {
                Arc::make_mut(&mut entries).shift_remove(key);
            }
            Ok(Value::Map(entries))
        }
        _ => unreachable!("Container::of only admits lists, maps and indexables"),
    }
}

pub fn key_exists(value: &Value, key: &Key) -> FunResult<bool> {
    match Container::of(value, "test a key")? {
        Container::List(items) => Ok(list_index(items, key).is_some()),
        Container::Map(entries) => Ok(entries.contains_key(key)),
        Container::Indexable(obj) => obj.exists(key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Object, Record};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Store {
        entries: Mutex<ValueMap>,
    }

    impl Object for Store {
        fn as_indexable(&self) -> Option<&dyn Indexable> {
            Some(self)
        }
    }

    impl Indexable for Store {
        fn get(&self, key: &Key) -> FunResult<Value> {
            Ok(self.entries.lock().unwrap().get(key).cloned().unwrap_or(Value::None))
        }
        fn set(&self, key: Key, value: Value) -> FunResult<()> {
            self.entries.lock().unwrap().insert(key, value);
            Ok(())
        }
        fn unset(&self, key: &Key) -> FunResult<()> {
            self.entries.lock().unwrap().shift_remove(key);
            Ok(())
        }
        fn exists(&self, key: &Key) -> FunResult<bool> {
            Ok(self.entries.lock().unwrap().contains_key(key))
        }
    }

    #[test]
    fn list_writes_append_replace_or_rekey() {
        let list = Value::list(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(
            set_key(list.clone(), Key::Int(2), Value::Int(3)).unwrap(),
            Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(
            set_key(list.clone(), Key::Int(0), Value::Int(9)).unwrap(),
            Value::list(vec![Value::Int(9), Value::Int(2)])
        );
        assert_eq!(
            set_key(list, Key::from("x"), Value::Int(3)).unwrap(),
            Value::map([(Key::Int(0), Value::Int(1)), (Key::Int(1), Value::Int(2)), (Key::from("x"), Value::Int(3))])
        );
    }

    #[test]
    fn list_removals_keep_remaining_indices() {
        let list = Value::list(vec![Value::str("a"), Value::str("b"), Value::str("c")]);
        assert_eq!(
            unset_key(list.clone(), &Key::Int(2)).unwrap(),
            Value::list(vec![Value::str("a"), Value::str("b")])
        );
        assert_eq!(
            unset_key(list.clone(), &Key::Int(0)).unwrap(),
            Value::map([(1, "b"), (2, "c")])
        );
        assert_eq!(unset_key(list.clone(), &Key::Int(7)).unwrap(), list);
    }

    #[test]
    fn list_membership_is_by_index() {
        let list = Value::list(vec![Value::str("a"), Value::str("b")]);
        assert!(key_exists(&list, &Key::Int(0)).unwrap());
        assert!(key_exists(&list, &Key::Int(1)).unwrap());
        assert!(!key_exists(&list, &Key::Int(2)).unwrap());
        assert!(!key_exists(&list, &Key::Int(-1)).unwrap());
        assert!(!key_exists(&list, &Key::from("a")).unwrap());
        assert!(key_exists(&list, &Key::from("1")).unwrap());
    }

    #[test]
    fn writes_do_not_leak_into_shared_copies() {
        let original = Value::map([("a", 1)]);
        let updated = set_key(original.clone(), Key::from("b"), Value::Int(2)).unwrap();
        assert_eq!(original, Value::map([("a", 1)]));
        assert_eq!(updated, Value::map([("a", 1), ("b", 2)]));
    }

    #[test]
    fn missing_plain_keys_are_errors() {
        let map = Value::map([("a", 1)]);
        assert!(matches!(
            get_key(&map, &Key::from("b")),
            Err(FunError::KeyNotFound(_))
        ));
        let list = Value::list(vec![]);
        assert!(matches!(
            get_key(&list, &Key::Int(0)),
            Err(FunError::KeyNotFound(_))
        ));
    }

    #[test]
    fn indexable_objects_are_written_in_place() {
        let store = Arc::new(Store::default());
        let value = Value::Object(store.clone());
        let result = set_key(value.clone(), Key::from("k"), Value::Int(5)).unwrap();
        assert_eq!(result, value);
        assert_eq!(get_key(&value, &Key::from("k")).unwrap(), Value::Int(5));
        assert!(key_exists(&value, &Key::from("k")).unwrap());

        let result = unset_key(value.clone(), &Key::from("k")).unwrap();
        assert_eq!(result, value);
        assert!(!key_exists(&value, &Key::from("k")).unwrap());
    }

    #[test]
    fn non_containers_are_unsupported() {
        for value in [Value::Int(1), Value::str("s"), Record::new("r").into_value()] {
            assert!(matches!(
                get_key(&value, &Key::Int(0)),
                Err(FunError::UnsupportedOperation(_))
            ));
        }
    }
}
