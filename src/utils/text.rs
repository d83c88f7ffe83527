//! String helpers

use anyhow::{Context, Result, bail};
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::collections::HashMap;

/// Replaces several substrings in one left-to-right pass.
///
/// At any position the first key, in the order given, that matches wins.
/// Replaced text is never scanned again, so `a -> b, b -> c` turns `"ab"`
/// into `"bc"`.
#[derive(Debug, Clone)]
pub struct MultiReplacer {
    pattern: Option<Regex>,
    replacements: HashMap<String, String>,
}

impl MultiReplacer {
    pub fn new<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut keys: Vec<String> = Vec::new();
        let mut replacements = HashMap::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            if key.is_empty() {
                bail!("replacement keys must not be empty");
            }
            // A repeated key keeps its first position and takes the last value.
            if replacements
                .insert(key.to_string(), value.as_ref().to_string())
                .is_none()
            {
                keys.push(key.to_string());
            }
        }

        let pattern = if keys.is_empty() {
            None
        } else {
            let alternation = keys
                .iter()
                .map(|key| regex::escape(key))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&alternation).context("failed to compile replacement pattern")?)
        };

        Ok(Self {
            pattern,
            replacements,
        })
    }

    pub fn replace<'t>(&self, text: &'t str) -> Cow<'t, str> {
        let Some(pattern) = &self.pattern else {
            return Cow::Borrowed(text);
        };
        pattern.replace_all(text, |caps: &Captures| {
            let matched = &caps[0];
            self.replacements
                .get(matched)
                .cloned()
                .unwrap_or_else(|| matched.to_string())
        })
    }
}

/// Replace every source substring of `pairs` in `text` by its destination.
///
/// ```rust
/// use utilp::utils::text::replace_by_map;
///
/// let replaced = replace_by_map("my cat is a friend", [("cat", "dog"), ("a", "b")]).unwrap();
/// assert_eq!(replaced, "my dog is b friend");
/// ```
pub fn replace_by_map<I, K, V>(text: &str, pairs: I) -> Result<String>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    Ok(MultiReplacer::new(pairs)?.replace(text).into_owned())
}
