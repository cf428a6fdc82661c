use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::error::{JsonError, Result};
use crate::value::{JsonValue, Shared};

/// Array view of a JSON value. Shares the node with the value it came from.
#[derive(Clone, Default)]
pub struct JsonArray(Shared<Vec<JsonValue>>);

impl JsonArray {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_items(items: Vec<JsonValue>) -> Self {
        JsonArray(Rc::new(RefCell::new(items)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Element at `index`, or `None` past the end. The returned handle shares
    /// the element with the array.
    pub fn get(&self, index: usize) -> Option<JsonValue> {
        self.0.borrow().get(index).cloned()
    }

    /// Appends `value`, retaining it.
    pub fn append(&self, value: JsonValue) -> Result<()> {
        self.check_insertable(&value)?;
        self.0.borrow_mut().push(value);
        Ok(())
    }

    pub fn insert(&self, index: usize, value: JsonValue) -> Result<()> {
        self.check_insertable(&value)?;
        let mut items = self.0.borrow_mut();
        if index > items.len() {
            return Err(JsonError::IndexOutOfBounds { index, len: items.len() });
        }
        items.insert(index, value);
        Ok(())
    }

    /// Replaces the element at `index` and returns the previous one.
    pub fn replace(&self, index: usize, value: JsonValue) -> Result<JsonValue> {
        self.check_insertable(&value)?;
        let mut items = self.0.borrow_mut();
        let len = items.len();
        let slot = items
            .get_mut(index)
            .ok_or(JsonError::IndexOutOfBounds { index, len })?;
        Ok(std::mem::replace(slot, value))
    }

    /// Removes the element at `index`, shifting later elements down by one.
    /// Linear in the number of trailing elements.
    pub fn remove(&self, index: usize) -> Result<JsonValue> {
        let mut items = self.0.borrow_mut();
        if index >= items.len() {
            return Err(JsonError::IndexOutOfBounds { index, len: items.len() });
        }
        Ok(items.remove(index))
    }

    /// Handles to every element, in order.
    pub fn to_vec(&self) -> Vec<JsonValue> {
        self.snapshot()
    }

    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    pub fn ptr_eq(&self, other: &JsonArray) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn into_value(self) -> JsonValue {
        self.into()
    }

    // Elements are copied out so no borrow is held while callers recurse.
    pub(crate) fn snapshot(&self) -> Vec<JsonValue> {
        self.0.borrow().clone()
    }

    pub(crate) fn items(&self) -> Ref<'_, Vec<JsonValue>> {
        self.0.borrow()
    }

    pub(crate) fn items_mut(&self) -> RefMut<'_, Vec<JsonValue>> {
        self.0.borrow_mut()
    }

    pub(crate) fn take_items(&self) -> Vec<JsonValue> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub(crate) fn node_ptr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }

    fn check_insertable(&self, value: &JsonValue) -> Result<()> {
        if value.reaches(self.node_ptr()) {
            tracing::debug!("refusing to insert array into itself");
            return Err(JsonError::Cycle);
        }
        Ok(())
    }
}

impl Drop for JsonArray {
    fn drop(&mut self) {
        if Rc::strong_count(&self.0) != 1 {
            return;
        }
        let items = match self.0.try_borrow_mut() {
            Ok(mut items) => std::mem::take(&mut *items),
            Err(_) => return,
        };
        crate::value::release_iteratively(items);
    }
}

impl fmt::Debug for JsonArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.snapshot()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(ns: &[i64]) -> JsonArray {
        let arr = JsonArray::new();
        for n in ns {
            arr.append(JsonValue::number(*n)).unwrap();
        }
        arr
    }

    #[test]
    fn append_grows_by_one() {
        let arr = numbers(&[1, 2]);
        arr.append(JsonValue::null()).unwrap();
        assert_eq!(arr.len(), 3);
        assert!(arr.get(2).unwrap().is_null());
        assert!(arr.get(3).is_none());
    }

    #[test]
    fn remove_shifts_following_elements() {
        let arr = numbers(&[10, 20, 30]);
        let removed = arr.remove(1).unwrap();
        assert_eq!(removed.as_number().unwrap(), 20);
        assert_eq!(arr.len(), 2);
        assert_eq!(arr.get(1).unwrap().as_number().unwrap(), 30);
        assert!(matches!(arr.remove(5), Err(JsonError::IndexOutOfBounds { index: 5, len: 2 })));
    }

    #[test]
    fn append_retains_remove_releases() {
        let arr = JsonArray::new();
        let v = JsonValue::string("kept");
        arr.append(v.clone()).unwrap();
        assert_eq!(v.ref_count(), Some(2));
        arr.remove(0).unwrap();
        assert_eq!(v.ref_count(), Some(1));
    }

    #[test]
    fn insert_and_replace() {
        let arr = numbers(&[1, 3]);
        arr.insert(1, JsonValue::number(2)).unwrap();
        let old = arr.replace(0, JsonValue::number(0)).unwrap();
        assert_eq!(old.as_number().unwrap(), 1);
        let got: Vec<i64> = arr.to_vec().iter().map(|v| v.as_number().unwrap()).collect();
        assert_eq!(got, vec![0, 2, 3]);
        assert!(arr.insert(9, JsonValue::null()).is_err());
    }

    #[test]
    fn self_insertion_is_refused() {
        let arr = JsonArray::new();
        assert!(matches!(arr.append(arr.clone().into_value()), Err(JsonError::Cycle)));
        let outer = JsonArray::new();
        outer.append(arr.clone().into_value()).unwrap();
        assert!(matches!(arr.append(outer.into_value()), Err(JsonError::Cycle)));
    }

    // Every level holds the one below twice: 2^30 paths, 31 nodes.
    fn shared_ladder(levels: usize) -> JsonValue {
        let mut level = JsonValue::array();
        for _ in 0..levels {
            let next = JsonArray::new();
            next.append(level.clone()).unwrap();
            next.append(level).unwrap();
            level = next.into_value();
        }
        level
    }

    #[test]
    fn cycle_check_visits_shared_children_once() {
        let ladder = shared_ladder(30);
        let outer = JsonArray::new();
        outer.append(ladder.clone()).unwrap();
        outer.append(ladder.clone()).unwrap();
        assert_eq!(outer.len(), 2);
        assert_eq!(ladder.depth(), 31);
        let inner = ladder.as_array().unwrap().get(0).unwrap().as_array().unwrap();
        assert!(matches!(inner.append(ladder.clone()), Err(JsonError::Cycle)));
    }

    #[test]
    fn dropping_a_long_chain_does_not_recurse() {
        let root = JsonArray::new();
        let mut tail = root.clone();
        for _ in 0..200_000 {
            let next = JsonArray::new();
            tail.append(next.clone().into_value()).unwrap();
            tail = next;
        }
        let kept = JsonValue::string("leaf");
        tail.append(kept.clone()).unwrap();
        drop(tail);
        assert_eq!(root.clone().into_value().depth(), 200_001);
        assert_eq!(kept.ref_count(), Some(2));
        drop(root);
        assert_eq!(kept.ref_count(), Some(1));
    }
}
