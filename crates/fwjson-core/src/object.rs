use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::error::{JsonError, Result};
use crate::value::{JsonValue, Shared};

pub(crate) type Members = Vec<(Rc<str>, JsonValue)>;

/// Object view of a JSON value. Members keep insertion order; keys are unique.
#[derive(Clone, Default)]
pub struct JsonObject(Shared<Members>);

impl JsonObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_members(members: Members) -> Self {
        JsonObject(Rc::new(RefCell::new(members)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Keys in member order. The strings are shared with the object and
    /// cannot be changed through the returned handles.
    pub fn keys(&self) -> Vec<Rc<str>> {
        self.0.borrow().iter().map(|(k, _)| Rc::clone(k)).collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.borrow().iter().any(|(k, _)| &**k == key)
    }

    /// Member value for `key`. The handle shares the member with the object,
    /// so mutating a container obtained here mutates the object's child.
    pub fn get(&self, key: &str) -> Option<JsonValue> {
        self.0
            .borrow()
            .iter()
            .find(|(k, _)| &**k == key)
            .map(|(_, v)| v.clone())
    }

    /// Stores `value` under `key`. An existing member keeps its position and
    /// its previous value is released.
    pub fn set(&self, key: &str, value: JsonValue) -> Result<()> {
        if value.reaches(self.node_ptr()) {
            tracing::debug!(key, "refusing to insert object into itself");
            return Err(JsonError::Cycle);
        }
        let mut members = self.0.borrow_mut();
        match members.iter_mut().find(|(k, _)| &**k == key) {
            Some(slot) => slot.1 = value,
            None => members.push((Rc::from(key), value)),
        }
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<JsonValue> {
        let mut members = self.0.borrow_mut();
        let pos = members
            .iter()
            .position(|(k, _)| &**k == key)
            .ok_or_else(|| JsonError::KeyNotFound(key.to_string()))?;
        Ok(members.remove(pos).1)
    }

    /// Key/value handles in member order.
    pub fn entries(&self) -> Members {
        self.0.borrow().clone()
    }

    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub fn ptr_eq(&self, other: &JsonObject) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn into_value(self) -> JsonValue {
        self.into()
    }

    pub(crate) fn members(&self) -> Ref<'_, Members> {
        self.0.borrow()
    }

    pub(crate) fn members_mut(&self) -> RefMut<'_, Members> {
        self.0.borrow_mut()
    }

    pub(crate) fn take_members(&self) -> Members {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub(crate) fn node_ptr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }
}

impl Drop for JsonObject {
    fn drop(&mut self) {
        if Rc::strong_count(&self.0) != 1 {
            return;
        }
        let members = match self.0.try_borrow_mut() {
            Ok(mut members) => std::mem::take(&mut *members),
            Err(_) => return,
        };
        crate::value::release_iteratively(members.into_iter().map(|(_, v)| v).collect());
    }
}

impl fmt::Debug for JsonObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get() {
        let o = JsonObject::new();
        o.set("x", JsonValue::number(42)).unwrap();
        assert_eq!(o.get("x").unwrap().as_number().unwrap(), 42);
        assert_eq!(o.len(), 1);
        assert!(o.get("y").is_none());
    }

    #[test]
    fn replace_keeps_size_and_releases_old_value() {
        let o = JsonObject::new();
        let old = JsonValue::string("old");
        o.set("k", old.clone()).unwrap();
        assert_eq!(old.ref_count(), Some(2));
        o.set("k", JsonValue::string("new")).unwrap();
        assert_eq!(o.len(), 1);
        assert_eq!(old.ref_count(), Some(1));
        assert_eq!(o.get("k").unwrap().as_str().unwrap(), "new");
    }

    #[test]
    fn keys_follow_insertion_order() {
        let o = JsonObject::new();
        for k in ["b", "a", "c"] {
            o.set(k, JsonValue::null()).unwrap();
        }
        o.set("a", JsonValue::boolean(true)).unwrap();
        let keys: Vec<String> = o.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn keys_are_shared_with_the_object() {
        let o = JsonObject::new();
        o.set("name", JsonValue::null()).unwrap();
        let keys = o.keys();
        assert_eq!(Rc::strong_count(&keys[0]), 2);
        drop(keys);
        assert!(o.contains_key("name"));
    }

    #[test]
    fn remove_missing_key() {
        let o = JsonObject::new();
        o.set("a", JsonValue::number(1)).unwrap();
        assert_eq!(o.remove("a").unwrap().as_number().unwrap(), 1);
        assert!(matches!(o.remove("a"), Err(JsonError::KeyNotFound(k)) if k == "a"));
        assert!(o.is_empty());
    }

    #[test]
    fn self_insertion_is_refused() {
        let o = JsonObject::new();
        assert!(matches!(o.set("me", o.clone().into_value()), Err(JsonError::Cycle)));
    }

    #[test]
    fn transitive_self_insertion_is_refused() {
        let o = JsonObject::new();
        let mid = JsonObject::new();
        o.set("mid", mid.clone().into_value()).unwrap();
        assert!(matches!(mid.set("back", o.clone().into_value()), Err(JsonError::Cycle)));
        assert!(mid.is_empty());
    }

    #[test]
    fn dropping_deeply_nested_members_does_not_recurse() {
        let root = JsonObject::new();
        let mut tail = root.clone();
        for _ in 0..200_000 {
            let next = JsonObject::new();
            tail.set("next", next.clone().into_value()).unwrap();
            tail = next;
        }
        drop(tail);
        let copy = root.clone().into_value().deep_copy();
        assert_eq!(copy, root.clone().into_value());
        assert_eq!(copy.depth(), 200_001);
        drop(copy);
        drop(root);
    }
}
