use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::ops::{Deref, DerefMut};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BunchError {
    #[error("key '{0}' not found")]
    Missing(String),

    #[error("invalid path '{0}'")]
    InvalidPath(String),

    #[error("cannot descend into '{segment}' of '{path}': not an object")]
    NotAnObject { path: String, segment: String },

    #[error("value at '{key}' has an unexpected type: {source}")]
    Type {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A string-keyed map with attribute-like ("dot notation") access.
///
/// Dereferences to [`serde_json::Map`], so all map operations are available
/// directly. Nested objects can be reached with dotted paths.
///
/// ```rust
/// use utilp::bunch;
///
/// let mut config = bunch! { "a" => 5 };
/// config.set_path("db.host", "localhost").unwrap();
///
/// assert_eq!(config["a"], 5);
/// assert_eq!(config.get_path("db.host").unwrap(), "localhost");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bunch(Map<String, Value>);

impl Bunch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, returning the previous value if any
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Deserialize the value under `key` into `T`
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, BunchError> {
        let value = self
            .0
            .get(key)
            .ok_or_else(|| BunchError::Missing(key.to_string()))?;
        T::deserialize(value).map_err(|source| BunchError::Type {
            key: key.to_string(),
            source,
        })
    }

    /// Look up a dotted path such as `"db.host"` through nested objects
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = self.0.get(segments.next()?)?;
        segments.try_fold(first, |value, segment| value.as_object()?.get(segment))
    }

    /// Set a dotted path, creating intermediate objects as needed.
    ///
    /// Fails if an existing intermediate value is not an object.
    pub fn set_path(
        &mut self,
        path: &str,
        value: impl Into<Value>,
    ) -> Result<Option<Value>, BunchError> {
        let mut segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(BunchError::InvalidPath(path.to_string()));
        }
        let last = segments
            .pop()
            .ok_or_else(|| BunchError::InvalidPath(path.to_string()))?;

        let mut current = &mut self.0;
        for segment in segments {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            current = match entry {
                Value::Object(map) => map,
                _ => {
                    return Err(BunchError::NotAnObject {
                        path: path.to_string(),
                        segment: segment.to_string(),
                    });
                }
            };
        }
        Ok(current.insert(last.to_string(), value.into()))
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl Deref for Bunch {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Bunch {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Map<String, Value>> for Bunch {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Bunch> for Value {
    fn from(bunch: Bunch) -> Self {
        Value::Object(bunch.0)
    }
}

impl<K, V> FromIterator<(K, V)> for Bunch
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl fmt::Display for Bunch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.0.clone()))
    }
}

/// Build a [`Bunch`](crate::collections::Bunch) from `key => value` pairs
#[macro_export]
macro_rules! bunch {
    () => {
        $crate::collections::Bunch::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut bunch = $crate::collections::Bunch::new();
        $( bunch.set($key, $value); )+
        bunch
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_and_read_back() {
        let mut bunch = Bunch::new();
        assert_eq!(bunch.set("a", 5), None);
        assert_eq!(bunch["a"], 5);
        assert_eq!(bunch.set("a", 6), Some(json!(5)));
        assert_eq!(bunch.get_as::<i32>("a").unwrap(), 6);
        assert_eq!(bunch.len(), 1);
    }

    #[test]
    fn test_macro_and_from_iter() {
        let from_macro = crate::bunch! { "name" => "utilp", "size" => 3 };
        let collected: Bunch = vec![("name", json!("utilp")), ("size", json!(3))]
            .into_iter()
            .collect();
        assert_eq!(from_macro, collected);
        assert!(crate::bunch!().is_empty());
    }

    #[test]
    fn test_get_as_reports_missing_and_type_errors() {
        let bunch = crate::bunch! { "name" => "utilp" };
        assert!(matches!(bunch.get_as::<i32>("nope"), Err(BunchError::Missing(_))));
        assert!(matches!(bunch.get_as::<i32>("name"), Err(BunchError::Type { .. })));
    }

    #[test]
    fn test_dotted_paths() {
        let mut bunch = Bunch::new();
        bunch.set_path("db.primary.host", "localhost").unwrap();
        bunch.set_path("db.primary.port", 5432).unwrap();

        assert_eq!(bunch.get_path("db.primary.port"), Some(&json!(5432)));
        assert_eq!(bunch.get_path("db.replica.port"), None);
        assert_eq!(
            Value::from(bunch.clone()),
            json!({"db": {"primary": {"host": "localhost", "port": 5432}}})
        );
    }

    #[test]
    fn test_set_path_through_scalar_fails() {
        let mut bunch = crate::bunch! { "a" => 1 };
        let err = bunch.set_path("a.b", 2).unwrap_err();
        assert!(matches!(err, BunchError::NotAnObject { .. }));
        assert!(matches!(bunch.set_path("a..b", 2), Err(BunchError::InvalidPath(_))));
        assert!(matches!(bunch.set_path("", 2), Err(BunchError::InvalidPath(_))));
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let bunch = crate::bunch! { "a" => 1 };
        assert_eq!(serde_json::to_string(&bunch).unwrap(), r#"{"a":1}"#);
        let parsed: Bunch = serde_json::from_str(r#"{"b":true}"#).unwrap();
        assert_eq!(parsed["b"], true);
        assert_eq!(parsed.to_string(), r#"{"b":true}"#);
    }
}
