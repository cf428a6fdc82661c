// JSON Pointer (RFC 6901) addressing over JsonValue documents.
// - Inspect: `get_by_pointer`, `list_children`.
// - Modify: `set_by_pointer` (add or replace), `remove_at_pointer`.
// Edits go through the shared handles, so the document is changed in place.
use crate::error::{JsonError, Result};
use crate::value::{JsonKind, JsonValue};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildInfo {
    pub key_or_index: String,
    pub kind: JsonKind,
    pub len: Option<usize>,
}

fn unescape_token(tok: &str) -> String {
    let s = tok.replace("~1", "/");
    s.replace("~0", "~")
}

fn split_pointer(pointer: &str) -> Result<Vec<String>> {
    if pointer.is_empty() {
        return Ok(Vec::new());
    }
    let rest = pointer
        .strip_prefix('/')
        .ok_or_else(|| JsonError::InvalidPointer(pointer.to_string()))?;
    Ok(rest.split('/').map(unescape_token).collect())
}

fn parent_pointer(tokens: &[String]) -> Option<(&[String], &str)> {
    let (last, parent) = tokens.split_last()?;
    Some((parent, last.as_str()))
}

fn array_index(token: &str) -> Option<usize> {
    // No sign, no leading zeros.
    if token.is_empty() || (token.len() > 1 && token.starts_with('0')) {
        return None;
    }
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

fn step(node: &JsonValue, token: &str) -> Option<JsonValue> {
    if let Ok(obj) = node.as_object() {
        return obj.get(token);
    }
    if let Ok(arr) = node.as_array() {
        return arr.get(array_index(token)?);
    }
    None
}

fn resolve(root: &JsonValue, tokens: &[String], pointer: &str) -> Result<JsonValue> {
    let mut cur = root.clone();
    for tok in tokens {
        cur = step(&cur, tok).ok_or_else(|| JsonError::PointerNotFound(pointer.to_string()))?;
    }
    Ok(cur)
}

/// Value at `pointer`. The handle shares the node with the document.
pub fn get_by_pointer(root: &JsonValue, pointer: &str) -> Result<JsonValue> {
    let tokens = split_pointer(pointer)?;
    resolve(root, &tokens, pointer)
}

/// Adds or replaces the value at `pointer`. For arrays, an index equal to the
/// length or `-` appends.
pub fn set_by_pointer(root: &JsonValue, pointer: &str, value: JsonValue) -> Result<()> {
    let tokens = split_pointer(pointer)?;
    let (parent_tokens, last) = parent_pointer(&tokens)
        .ok_or_else(|| JsonError::InvalidPointer("cannot replace document root".into()))?;
    let parent = resolve(root, parent_tokens, pointer)?;
    if let Ok(obj) = parent.as_object() {
        return obj.set(last, value);
    }
    let arr = parent.as_array().map_err(|_| JsonError::PointerNotFound(pointer.to_string()))?;
    if last == "-" {
        return arr.append(value);
    }
    let idx = array_index(last).ok_or_else(|| JsonError::InvalidPointer(pointer.to_string()))?;
    if idx == arr.len() {
        arr.append(value)
    } else {
        arr.replace(idx, value).map(|_| ())
    }
}

/// Removes the member or element at `pointer` and returns it.
pub fn remove_at_pointer(root: &JsonValue, pointer: &str) -> Result<JsonValue> {
    let tokens = split_pointer(pointer)?;
    let (parent_tokens, last) = parent_pointer(&tokens)
        .ok_or_else(|| JsonError::InvalidPointer("cannot remove at root".into()))?;
    let parent = resolve(root, parent_tokens, pointer)?;
    if let Ok(obj) = parent.as_object() {
        return obj.remove(last);
    }
    let arr = parent.as_array().map_err(|_| JsonError::PointerNotFound(pointer.to_string()))?;
    let idx = array_index(last).ok_or_else(|| JsonError::InvalidPointer(pointer.to_string()))?;
    arr.remove(idx)
}

fn len_of(v: &JsonValue) -> Option<usize> {
    match (v.as_array(), v.as_object()) {
        (Ok(a), _) => Some(a.len()),
        (_, Ok(o)) => Some(o.len()),
        _ => None,
    }
}

pub fn list_children(root: &JsonValue, pointer: &str) -> Result<Vec<ChildInfo>> {
    let node = get_by_pointer(root, pointer)?;
    let mut out = Vec::new();
    if let Ok(obj) = node.as_object() {
        for (k, v) in obj.entries() {
            out.push(ChildInfo { key_or_index: k.to_string(), kind: v.kind(), len: len_of(&v) });
        }
    } else if let Ok(arr) = node.as_array() {
        for (i, v) in arr.to_vec().iter().enumerate() {
            out.push(ChildInfo { key_or_index: i.to_string(), kind: v.kind(), len: len_of(v) });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::parse;

    #[test]
    fn escaped_tokens() {
        let doc = parse(r#"{"a/b":{"m~n":1}}"#).unwrap();
        assert_eq!(get_by_pointer(&doc, "/a~1b/m~0n").unwrap().as_number().unwrap(), 1);
    }

    #[test]
    fn empty_pointer_is_root() {
        let doc = parse("[1]").unwrap();
        assert!(get_by_pointer(&doc, "").unwrap().ptr_eq(&doc));
        assert!(matches!(get_by_pointer(&doc, "0"), Err(JsonError::InvalidPointer(_))));
    }

    #[test]
    fn leading_zero_index_is_not_found() {
        let doc = parse("[1,2]").unwrap();
        assert!(get_by_pointer(&doc, "/01").is_err());
        assert_eq!(get_by_pointer(&doc, "/1").unwrap().as_number().unwrap(), 2);
    }

    #[test]
    fn set_appends_with_dash() {
        let doc = parse(r#"{"xs":[1]}"#).unwrap();
        set_by_pointer(&doc, "/xs/-", JsonValue::number(2)).unwrap();
        set_by_pointer(&doc, "/xs/2", JsonValue::number(3)).unwrap();
        assert_eq!(doc.to_string(), r#"{"xs":[1,2,3]}"#);
        assert!(set_by_pointer(&doc, "/xs/9", JsonValue::null()).is_err());
        assert!(set_by_pointer(&doc, "", JsonValue::null()).is_err());
    }
}
