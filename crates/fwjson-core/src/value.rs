//! The reference-counted JSON value handle.
//!
//! `JsonValue` is a cheap handle. Cloning it retains the underlying node and
//! dropping it releases the node; containers own their children through the
//! same handles, so the last release of a container releases its children.
//! Booleans and null carry no node at all and are never freed.
//!
//! Graph walks (release, depth, equality, copy, cycle checks) use explicit
//! worklists, so arbitrarily deep graphs built in code never exhaust the stack.
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::array::JsonArray;
use crate::error::{JsonError, Result};
use crate::object::{JsonObject, Members};
use crate::ucs2::{self, Ucs2String};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonKind {
    Null,
    Boolean,
    Number,
    String,
    Object,
    Array,
}

impl JsonKind {
    pub fn is_container(self) -> bool {
        matches!(self, JsonKind::Object | JsonKind::Array)
    }
}

pub(crate) type Shared<T> = Rc<RefCell<T>>;

#[derive(Clone, Default)]
pub struct JsonValue(Node);

#[derive(Clone, Default)]
enum Node {
    #[default]
    Null,
    Bool(bool),
    Number(Rc<i64>),
    String(Rc<str>),
    Array(JsonArray),
    Object(JsonObject),
}

// -------- constructors --------

impl JsonValue {
    pub fn array() -> Self {
        JsonArray::new().into()
    }

    pub fn object() -> Self {
        JsonObject::new().into()
    }

    /// String value from ASCII text. Any byte with the high bit set is an error.
    pub fn ascii_string(s: &str) -> Result<Self> {
        check_ascii(s)?;
        Ok(Self::string(s))
    }

    /// String value from UCS2 units. A trailing NUL, if present, ends the text.
    pub fn unicode_string(units: &[u16]) -> Result<Self> {
        let s = ucs2::ucs2_to_utf8(units)?;
        Ok(Self::string(s))
    }

    /// String value from arbitrary UTF-8 text, no encoding restriction.
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        JsonValue(Node::String(s.into()))
    }

    pub fn number(n: i64) -> Self {
        JsonValue(Node::Number(Rc::new(n)))
    }

    pub fn boolean(b: bool) -> Self {
        JsonValue(Node::Bool(b))
    }

    pub fn null() -> Self {
        JsonValue(Node::Null)
    }

    /// Explicit release. Equivalent to dropping the handle.
    pub fn release(self) {}

    /// Copies the whole value graph. Every node of the copy starts with a
    /// reference count of 1 and shares nothing with `self`.
    ///
    /// This walks and reallocates every node, so keep it out of hot paths.
    pub fn deep_copy(&self) -> JsonValue {
        let root = self.shallow_copy();
        // (source container, empty copy waiting for its children)
        let mut work = vec![(self.clone(), root.clone())];
        while let Some((src, dst)) = work.pop() {
            match (&src.0, &dst.0) {
                (Node::Array(s), Node::Array(d)) => {
                    let items: Vec<JsonValue> = s
                        .items()
                        .iter()
                        .map(|child| {
                            let copy = child.shallow_copy();
                            if child.kind().is_container() {
                                work.push((child.clone(), copy.clone()));
                            }
                            copy
                        })
                        .collect();
                    *d.items_mut() = items;
                }
                (Node::Object(s), Node::Object(d)) => {
                    let members: Members = s
                        .members()
                        .iter()
                        .map(|(k, child)| {
                            let copy = child.shallow_copy();
                            if child.kind().is_container() {
                                work.push((child.clone(), copy.clone()));
                            }
                            (Rc::<str>::from(&**k), copy)
                        })
                        .collect();
                    *d.members_mut() = members;
                }
                _ => {}
            }
        }
        root
    }

    // Fresh node of the same kind; containers come back empty.
    fn shallow_copy(&self) -> JsonValue {
        match &self.0 {
            Node::Null | Node::Bool(_) => self.clone(),
            Node::Number(n) => JsonValue::number(**n),
            Node::String(s) => JsonValue::string(&**s),
            Node::Array(_) => JsonValue::array(),
            Node::Object(_) => JsonValue::object(),
        }
    }

    /// Number of live handles to this node, `None` for booleans and null.
    pub fn ref_count(&self) -> Option<usize> {
        match &self.0 {
            Node::Null | Node::Bool(_) => None,
            Node::Number(n) => Some(Rc::strong_count(n)),
            Node::String(s) => Some(Rc::strong_count(s)),
            Node::Array(a) => Some(a.ref_count()),
            Node::Object(o) => Some(o.ref_count()),
        }
    }

    /// True when both handles refer to the same node.
    pub fn ptr_eq(&self, other: &JsonValue) -> bool {
        match (&self.0, &other.0) {
            (Node::Null, Node::Null) => true,
            (Node::Bool(a), Node::Bool(b)) => a == b,
            (Node::Number(a), Node::Number(b)) => Rc::ptr_eq(a, b),
            (Node::String(a), Node::String(b)) => Rc::ptr_eq(a, b),
            (Node::Array(a), Node::Array(b)) => a.ptr_eq(b),
            (Node::Object(a), Node::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

// -------- predicates --------

impl JsonValue {
    pub fn kind(&self) -> JsonKind {
        match &self.0 {
            Node::Null => JsonKind::Null,
            Node::Bool(_) => JsonKind::Boolean,
            Node::Number(_) => JsonKind::Number,
            Node::String(_) => JsonKind::String,
            Node::Array(_) => JsonKind::Array,
            Node::Object(_) => JsonKind::Object,
        }
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        matches!(self.0, Node::Array(_))
    }

    #[inline]
    pub fn is_object(&self) -> bool {
        matches!(self.0, Node::Object(_))
    }

    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self.0, Node::String(_))
    }

    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self.0, Node::Number(_))
    }

    #[inline]
    pub fn is_boolean(&self) -> bool {
        matches!(self.0, Node::Bool(_))
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self.0, Node::Null)
    }
}

// -------- accessors --------

impl JsonValue {
    /// The same node viewed as an array. Changes through the view are visible
    /// through every other handle.
    pub fn as_array(&self) -> Result<JsonArray> {
        match &self.0 {
            Node::Array(a) => Ok(a.clone()),
            _ => Err(self.mismatch(JsonKind::Array)),
        }
    }

    pub fn as_object(&self) -> Result<JsonObject> {
        match &self.0 {
            Node::Object(o) => Ok(o.clone()),
            _ => Err(self.mismatch(JsonKind::Object)),
        }
    }

    pub fn as_ascii_str(&self) -> Result<&str> {
        let s = self.as_str()?;
        check_ascii(s)?;
        Ok(s)
    }

    /// The stored UTF-8 text, without any encoding restriction.
    pub fn as_str(&self) -> Result<&str> {
        match &self.0 {
            Node::String(s) => Ok(&**s),
            _ => Err(self.mismatch(JsonKind::String)),
        }
    }

    /// Transcodes the string to a freshly allocated UCS2 buffer.
    pub fn to_unicode_string(&self) -> Result<Ucs2String> {
        Ok(ucs2::utf8_to_ucs2(self.as_str()?)?)
    }

    pub fn as_number(&self) -> Result<i64> {
        match &self.0 {
            Node::Number(n) => Ok(**n),
            _ => Err(self.mismatch(JsonKind::Number)),
        }
    }

    pub fn as_bool(&self) -> Result<bool> {
        match &self.0 {
            Node::Bool(b) => Ok(*b),
            _ => Err(self.mismatch(JsonKind::Boolean)),
        }
    }

    fn mismatch(&self, expected: JsonKind) -> JsonError {
        JsonError::TypeMismatch {
            expected,
            found: self.kind(),
        }
    }

    /// Nesting depth: 0 for scalars, 1 for a flat container.
    ///
    /// Shared sub-values are measured once.
    pub fn depth(&self) -> usize {
        let Some(root) = self.node_ptr() else {
            return 0;
        };
        let mut memo: HashMap<*const (), usize> = HashMap::new();
        // (container, children already pushed)
        let mut stack = vec![(self.clone(), false)];
        while let Some((v, expanded)) = stack.pop() {
            let Some(p) = v.node_ptr() else { continue };
            if memo.contains_key(&p) {
                continue;
            }
            let children = v.child_containers();
            if expanded {
                let deepest = children
                    .iter()
                    .filter_map(|c| c.node_ptr().and_then(|cp| memo.get(&cp).copied()))
                    .max()
                    .unwrap_or(0);
                memo.insert(p, deepest + 1);
            } else {
                stack.push((v, true));
                stack.extend(children.into_iter().map(|c| (c, false)));
            }
        }
        memo.get(&root).copied().unwrap_or(1)
    }

    // Whether the container node at `target` is reachable from `self`.
    // Each container is visited at most once.
    pub(crate) fn reaches(&self, target: *const ()) -> bool {
        let mut seen: HashSet<*const ()> = HashSet::new();
        let mut stack = vec![self.clone()];
        while let Some(v) = stack.pop() {
            let Some(p) = v.node_ptr() else { continue };
            if p == target {
                return true;
            }
            if seen.insert(p) {
                stack.extend(v.child_containers());
            }
        }
        false
    }

    fn node_ptr(&self) -> Option<*const ()> {
        match &self.0 {
            Node::Array(a) => Some(a.node_ptr()),
            Node::Object(o) => Some(o.node_ptr()),
            _ => None,
        }
    }

    fn child_containers(&self) -> Vec<JsonValue> {
        match &self.0 {
            Node::Array(a) => a.items().iter().filter(|c| c.kind().is_container()).cloned().collect(),
            Node::Object(o) => o
                .members()
                .iter()
                .filter(|(_, c)| c.kind().is_container())
                .map(|(_, c)| c.clone())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Releases `pending` without recursing: containers whose last handle is in
/// the worklist hand their children over before they are dropped.
pub(crate) fn release_iteratively(mut pending: Vec<JsonValue>) {
    while let Some(v) = pending.pop() {
        match &v.0 {
            Node::Array(a) if a.ref_count() == 1 => pending.extend(a.take_items()),
            Node::Object(o) if o.ref_count() == 1 => {
                pending.extend(o.take_members().into_iter().map(|(_, c)| c))
            }
            _ => {}
        }
    }
}

fn check_ascii(s: &str) -> Result<()> {
    match s.bytes().position(|b| b & 0x80 != 0) {
        Some(offset) => {
            tracing::trace!(offset, "rejecting non-ascii string");
            Err(JsonError::NonAscii { offset })
        }
        None => Ok(()),
    }
}

// -------- conversions --------

impl From<JsonArray> for JsonValue {
    fn from(a: JsonArray) -> Self {
        JsonValue(Node::Array(a))
    }
}

impl From<JsonObject> for JsonValue {
    fn from(o: JsonObject) -> Self {
        JsonValue(Node::Object(o))
    }
}

impl From<i64> for JsonValue {
    fn from(n: i64) -> Self {
        JsonValue::number(n)
    }
}

impl From<bool> for JsonValue {
    fn from(b: bool) -> Self {
        JsonValue::boolean(b)
    }
}

impl From<&str> for JsonValue {
    fn from(s: &str) -> Self {
        JsonValue::string(s)
    }
}

impl From<String> for JsonValue {
    fn from(s: String) -> Self {
        JsonValue::string(s)
    }
}

/// Structural equality. Object member order is not significant.
impl PartialEq for JsonValue {
    fn eq(&self, other: &Self) -> bool {
        let mut seen: HashSet<(*const (), *const ())> = HashSet::new();
        let mut work = vec![(self.clone(), other.clone())];
        while let Some((a, b)) = work.pop() {
            match (&a.0, &b.0) {
                (Node::Null, Node::Null) => {}
                (Node::Bool(x), Node::Bool(y)) if x == y => {}
                (Node::Number(x), Node::Number(y)) if x == y => {}
                (Node::String(x), Node::String(y)) if x == y => {}
                (Node::Array(x), Node::Array(y)) => {
                    if x.ptr_eq(y) || !seen.insert((x.node_ptr(), y.node_ptr())) {
                        continue;
                    }
                    let (xs, ys) = (x.items(), y.items());
                    if xs.len() != ys.len() {
                        return false;
                    }
                    work.extend(xs.iter().cloned().zip(ys.iter().cloned()));
                }
                (Node::Object(x), Node::Object(y)) => {
                    if x.ptr_eq(y) || !seen.insert((x.node_ptr(), y.node_ptr())) {
                        continue;
                    }
                    if x.len() != y.len() {
                        return false;
                    }
                    for (k, v) in x.members().iter() {
                        match y.get(k) {
                            Some(w) => work.push((v.clone(), w)),
                            None => return false,
                        }
                    }
                }
                _ => return false,
            }
        }
        true
    }
}

impl fmt::Debug for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Node::Null => write!(f, "null"),
            Node::Bool(b) => write!(f, "{}", b),
            Node::Number(n) => write!(f, "{}", n),
            Node::String(s) => write!(f, "{:?}", s),
            Node::Array(a) => f.debug_list().entries(a.snapshot()).finish(),
            Node::Object(o) => f
                .debug_map()
                .entries(o.entries())
                .finish(),
        }
    }
}

/// Compact JSON text for any kind of value, scalars included.
impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&s)
    }
}

// -------- serde --------

impl Serialize for JsonValue {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match &self.0 {
            Node::Null => serializer.serialize_unit(),
            Node::Bool(b) => serializer.serialize_bool(*b),
            Node::Number(n) => serializer.serialize_i64(**n),
            Node::String(s) => serializer.serialize_str(s),
            Node::Array(arr) => {
                let items = arr.snapshot();
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for v in &items {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            Node::Object(obj) => {
                let members = obj.entries();
                let mut m = serializer.serialize_map(Some(members.len()))?;
                for (k, v) in &members {
                    m.serialize_entry(&**k, v)?;
                }
                m.end()
            }
        }
    }
}

impl<'de> serde::Deserialize<'de> for JsonValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(JsonValueVisitor)
    }
}

struct JsonValueVisitor;

impl<'de> Visitor<'de> for JsonValueVisitor {
    type Value = JsonValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a JSON value with integer-only numbers")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::boolean(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::number(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<JsonValue, E> {
        i64::try_from(v)
            .map(JsonValue::number)
            .map_err(|_| E::custom(format!("integer {} does not fit in 64-bit signed", v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<JsonValue, E> {
        Err(E::custom(format!("floating point number {} is not supported", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::string(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::string(v))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::null())
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::null())
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<JsonValue, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(v) = seq.next_element::<JsonValue>()? {
            items.push(v);
        }
        Ok(JsonArray::with_items(items).into())
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<JsonValue, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut members: Vec<(Rc<str>, JsonValue)> = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((k, v)) = map.next_entry::<String, JsonValue>()? {
            // Duplicate keys: the later value wins, first position is kept.
            match members.iter_mut().find(|(name, _)| &**name == k.as_str()) {
                Some(slot) => slot.1 = v,
                None => members.push((Rc::from(k), v)),
            }
        }
        Ok(JsonObject::with_members(members).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn fresh_values_have_one_reference() {
        assert_eq!(JsonValue::number(7).ref_count(), Some(1));
        assert_eq!(JsonValue::string("s").ref_count(), Some(1));
        assert_eq!(JsonValue::array().ref_count(), Some(1));
        assert_eq!(JsonValue::object().ref_count(), Some(1));
        assert_eq!(JsonValue::boolean(true).ref_count(), None);
        assert_eq!(JsonValue::null().ref_count(), None);
    }

    #[test]
    fn clone_retains_and_drop_releases() {
        let v = JsonValue::number(1);
        let w = v.clone();
        assert_eq!(v.ref_count(), Some(2));
        assert!(v.ptr_eq(&w));
        w.release();
        assert_eq!(v.ref_count(), Some(1));
    }

    #[test_case("hello", true ; "plain ascii")]
    #[test_case("caf\u{e9}", false ; "latin1 accent")]
    #[test_case("", true ; "empty")]
    fn ascii_constructor(input: &str, ok: bool) {
        assert_eq!(JsonValue::ascii_string(input).is_ok(), ok);
    }

    #[test]
    fn ascii_accessor_reports_offset() {
        let v = JsonValue::string("ab\u{c3}");
        match v.as_ascii_str() {
            Err(JsonError::NonAscii { offset }) => assert_eq!(offset, 2),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn unicode_round_trip() {
        let units: Vec<u16> = "Größe".encode_utf16().chain([0]).collect();
        let v = JsonValue::unicode_string(&units).unwrap();
        assert_eq!(v.as_str().unwrap(), "Größe");
        assert_eq!(v.to_unicode_string().unwrap().as_slice(), &units[..units.len() - 1]);
        assert!(v.as_ascii_str().is_err());
    }

    #[test]
    fn unicode_constructor_rejects_surrogates() {
        assert!(matches!(
            JsonValue::unicode_string(&[0x41, 0xD800]),
            Err(JsonError::Ucs2(ucs2::Ucs2Error::Surrogate { index: 1, unit: 0xD800 }))
        ));
    }

    #[test]
    fn unicode_accessor_rejects_embedded_nul() {
        let v = JsonValue::string("a\0b");
        assert!(matches!(
            v.to_unicode_string(),
            Err(JsonError::Ucs2(ucs2::Ucs2Error::EmbeddedNul { offset: 1 }))
        ));
    }

    #[test]
    fn wrong_kind_accessors_fail() {
        let s = JsonValue::string("1");
        assert!(matches!(
            s.as_number(),
            Err(JsonError::TypeMismatch { expected: JsonKind::Number, found: JsonKind::String })
        ));
        assert!(JsonValue::number(0).as_bool().is_err());
        assert!(JsonValue::null().as_array().is_err());
        assert!(JsonValue::array().as_object().is_err());
        assert!(JsonValue::boolean(true).as_bool().unwrap());
    }

    #[test]
    fn predicates_match_kind() {
        let v = JsonValue::object();
        assert!(v.is_object() && !v.is_array() && !v.is_null());
        assert!(JsonValue::null().is_null());
        assert!(JsonValue::number(3).is_number());
        assert!(JsonValue::boolean(false).is_boolean());
        assert!(JsonValue::string("x").is_string());
        assert!(JsonValue::array().is_array());
    }

    #[test]
    fn depth_counts_container_levels() {
        let inner = JsonValue::array();
        inner.as_array().unwrap().append(JsonValue::number(1)).unwrap();
        let outer = JsonValue::object();
        outer.as_object().unwrap().set("a", inner).unwrap();
        assert_eq!(outer.depth(), 2);
        assert_eq!(JsonValue::number(1).depth(), 0);
    }
}
