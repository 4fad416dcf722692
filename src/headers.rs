//! Header store operations.
//!
//! Thin layer over [`http::HeaderMap`] (which already gives case-insensitive
//! names) adding the overwrite/append semantics the views rely on: scalar and
//! sequence values coerced to their string form, mapping-style bulk set, and
//! comma-list append with duplicate suppression.
use http::header::{HeaderMap, HeaderName, HeaderValue};

// ===== Field values =====

/// A scalar that can be coerced into a header value.
pub trait FieldValue {
    fn field_value(&self) -> Result<HeaderValue, http::Error>;
}

impl FieldValue for &str {
    fn field_value(&self) -> Result<HeaderValue, http::Error> {
        HeaderValue::from_str(self).map_err(Into::into)
    }
}

impl FieldValue for String {
    fn field_value(&self) -> Result<HeaderValue, http::Error> {
        HeaderValue::from_str(self).map_err(Into::into)
    }
}

impl FieldValue for HeaderValue {
    fn field_value(&self) -> Result<HeaderValue, http::Error> {
        Ok(self.clone())
    }
}

macro_rules! int_value {
    ($($int:ty),*) => {
        $(
            impl FieldValue for $int {
                fn field_value(&self) -> Result<HeaderValue, http::Error> {
                    let mut buf = itoa::Buffer::new();
                    HeaderValue::from_str(buf.format(*self)).map_err(Into::into)
                }
            }
        )*
    };
}

int_value!(u16, u32, u64, usize, i32, i64);

// ===== Field entries =====

/// The right-hand side of a `set`: a single scalar or an ordered sequence.
pub trait FieldEntry {
    fn apply(self, map: &mut HeaderMap, name: HeaderName) -> Result<(), http::Error>;
}

macro_rules! scalar_entry {
    ($($scalar:ty),*) => {
        $(
            impl FieldEntry for $scalar {
                fn apply(self, map: &mut HeaderMap, name: HeaderName) -> Result<(), http::Error> {
                    let value = self.field_value()?;
                    map.insert(name, value);
                    Ok(())
                }
            }
        )*
    };
}

scalar_entry!(&str, String, HeaderValue, u16, u32, u64, usize, i32, i64);

fn apply_seq<V: FieldValue>(
    values: impl IntoIterator<Item = V>,
    map: &mut HeaderMap,
    name: HeaderName,
) -> Result<(), http::Error> {
    let mut values = values.into_iter();
    match values.next() {
        // overwrite, then one entry per remaining element
        Some(first) => {
            map.insert(name.clone(), first.field_value()?);
            for value in values {
                map.append(name.clone(), value.field_value()?);
            }
        }
        None => {
            map.remove(name);
        }
    }
    Ok(())
}

impl<V: FieldValue> FieldEntry for Vec<V> {
    fn apply(self, map: &mut HeaderMap, name: HeaderName) -> Result<(), http::Error> {
        apply_seq(self, map, name)
    }
}

impl<V: FieldValue, const N: usize> FieldEntry for [V; N] {
    fn apply(self, map: &mut HeaderMap, name: HeaderName) -> Result<(), http::Error> {
        apply_seq(self, map, name)
    }
}

impl<V: FieldValue + Copy> FieldEntry for &[V] {
    fn apply(self, map: &mut HeaderMap, name: HeaderName) -> Result<(), http::Error> {
        apply_seq(self.iter().copied(), map, name)
    }
}

// ===== Operations =====

/// Case-insensitive lookup, first entry.
pub fn get<'a>(map: &'a HeaderMap, name: &str) -> Option<&'a str> {
    map.get(name).and_then(|v| v.to_str().ok())
}

/// All entries of a field joined with `", "`.
pub fn get_joined(map: &HeaderMap, name: &str) -> Option<String> {
    let mut iter = map.get_all(name).iter().filter_map(|v| v.to_str().ok());
    let first = iter.next()?;
    let mut out = first.to_owned();
    for v in iter {
        out.push_str(", ");
        out.push_str(v);
    }
    Some(out)
}

/// Overwrite `name` with `value` (scalar or sequence).
pub fn set(map: &mut HeaderMap, name: &str, value: impl FieldEntry) -> Result<(), http::Error> {
    let name = HeaderName::from_bytes(name.as_bytes())?;
    value.apply(map, name)
}

/// Apply [`set`] for every pair, in iteration order.
pub fn set_all<N, V>(
    map: &mut HeaderMap,
    pairs: impl IntoIterator<Item = (N, V)>,
) -> Result<(), http::Error>
where
    N: AsRef<str>,
    V: FieldEntry,
{
    for (name, value) in pairs {
        set(map, name.as_ref(), value)?;
    }
    Ok(())
}

/// Append `value` to the comma-separated list in `name`.
///
/// Unset fields behave as [`set`]. A value token already present in the list
/// is never duplicated (case-sensitive compare); distinct tokens keep call
/// order, rejoined with `", "`.
pub fn append(map: &mut HeaderMap, name: &str, value: &str) -> Result<(), http::Error> {
    let name = HeaderName::from_bytes(name.as_bytes())?;
    let Some(existing) = get_joined(map, name.as_str()) else {
        map.insert(name, HeaderValue::from_str(value)?);
        return Ok(());
    };

    let mut list: Vec<&str> = existing.split(',').map(str::trim).collect();
    if !list.contains(&value) {
        list.push(value);
    }
    map.insert(name, HeaderValue::from_str(&list.join(", "))?);
    Ok(())
}

/// Remove every entry of `name`.
pub fn remove(map: &mut HeaderMap, name: &str) {
    map.remove(name);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn get_is_case_insensitive() {
        let mut map = HeaderMap::new();
        set(&mut map, "X-Custom", "tobi").unwrap();
        assert_eq!(get(&map, "x-custom"), Some("tobi"));
        assert_eq!(get(&map, "X-CUSTOM"), Some("tobi"));
        assert_eq!(get(&map, "x-other"), None);
    }

    #[test]
    fn set_overwrites() {
        let mut map = HeaderMap::new();
        set(&mut map, "foo", "bar").unwrap();
        set(&mut map, "foo", "baz").unwrap();
        assert_eq!(get(&map, "foo"), Some("baz"));
        assert_eq!(map.get_all("foo").iter().count(), 1);
    }

    #[test]
    fn set_scalar_coercion() {
        let mut map = HeaderMap::new();
        set(&mut map, "content-length", 1024_u64).unwrap();
        assert_eq!(get(&map, "content-length"), Some("1024"));
    }

    #[test]
    fn set_sequence_keeps_order() {
        let mut map = HeaderMap::new();
        set(&mut map, "foo", "stale").unwrap();
        set(&mut map, "foo", vec!["bar", "baz"]).unwrap();
        let values: Vec<_> = map
            .get_all("foo")
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(values, ["bar", "baz"]);
    }

    #[test]
    fn set_all_applies_in_order() {
        let mut map = HeaderMap::new();
        set_all(&mut map, [("accept", "text/plain"), ("accept", "application/json")]).unwrap();
        assert_eq!(get(&map, "accept"), Some("application/json"));
    }

    #[test]
    fn append_on_unset_behaves_as_set() {
        let mut map = HeaderMap::new();
        append(&mut map, "vary", "Accept").unwrap();
        assert_eq!(get(&map, "vary"), Some("Accept"));
    }

    #[test]
    fn append_suppresses_duplicates() {
        let mut map = HeaderMap::new();
        append(&mut map, "vary", "Accept").unwrap();
        append(&mut map, "vary", "Accept").unwrap();
        assert_eq!(get(&map, "vary"), Some("Accept"));
    }

    #[test]
    fn append_keeps_call_order() {
        let mut map = HeaderMap::new();
        append(&mut map, "vary", "Accept").unwrap();
        append(&mut map, "vary", "Accept-Encoding").unwrap();
        append(&mut map, "vary", "Accept").unwrap();
        assert_eq!(get(&map, "vary"), Some("Accept, Accept-Encoding"));
    }

    #[test]
    fn append_is_case_sensitive_on_tokens() {
        let mut map = HeaderMap::new();
        append(&mut map, "vary", "accept").unwrap();
        append(&mut map, "vary", "Accept").unwrap();
        assert_eq!(get(&map, "vary"), Some("accept, Accept"));
    }

    #[test]
    fn append_splits_surrounding_whitespace() {
        let mut map = HeaderMap::new();
        set(&mut map, "vary", "Accept ,  Origin").unwrap();
        append(&mut map, "vary", "Origin").unwrap();
        assert_eq!(get(&map, "vary"), Some("Accept, Origin"));
    }
}
