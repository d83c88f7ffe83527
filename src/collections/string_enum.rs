use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StringEnumError {
    #[error("member at position {0} is empty")]
    EmptyMember(usize),

    #[error("duplicate member '{0}'")]
    Duplicate(String),
}

/// Ordered, enum-like set of names built from a list of strings.
///
/// ```rust
/// use utilp::collections::StringEnum;
///
/// let colors = StringEnum::new(["Red", "Blue", "Green"]).unwrap();
/// assert_eq!(colors.member("Red"), Some("Red"));
/// assert_eq!(&colors[1], "Blue");
/// assert_eq!(colors.to_string(), "['Red', 'Blue', 'Green']");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct StringEnum {
    members: Vec<String>,
}

impl StringEnum {
    pub fn new<I, S>(members: I) -> Result<Self, StringEnumError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut collected: Vec<String> = Vec::new();
        for (position, member) in members.into_iter().map(Into::into).enumerate() {
            if member.is_empty() {
                return Err(StringEnumError::EmptyMember(position));
            }
            if collected.contains(&member) {
                return Err(StringEnumError::Duplicate(member));
            }
            collected.push(member);
        }
        Ok(Self { members: collected })
    }

    /// The member named `name`, if there is one
    pub fn member(&self, name: &str) -> Option<&str> {
        self.members
            .iter()
            .find(|member| member.as_str() == name)
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.member(name).is_some()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|member| member == name)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.members.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.members
    }
}

impl Index<usize> for StringEnum {
    type Output = str;

    fn index(&self, index: usize) -> &Self::Output {
        &self.members[index]
    }
}

impl<'a> IntoIterator for &'a StringEnum {
    type Item = &'a str;
    type IntoIter = std::iter::Map<std::slice::Iter<'a, String>, fn(&'a String) -> &'a str>;

    fn into_iter(self) -> Self::IntoIter {
        self.members
            .iter()
            .map(String::as_str as fn(&'a String) -> &'a str)
    }
}

impl TryFrom<Vec<String>> for StringEnum {
    type Error = StringEnumError;

    fn try_from(members: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(members)
    }
}

impl From<StringEnum> for Vec<String> {
    fn from(value: StringEnum) -> Self {
        value.members
    }
}

impl fmt::Display for StringEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, member) in self.members.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "'{member}'")?;
        }
        f.write_str("]")
    }
}

impl fmt::Debug for StringEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
