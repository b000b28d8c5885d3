use std::fmt;

use serde::{Deserialize, Deserializer};

/// The parts of a GitHub push event the relay cares about.
/// Everything else in the payload is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Event {
    #[serde(rename = "ref", deserialize_with = "null_as_default")]
    pub git_ref: String,
    #[serde(deserialize_with = "null_as_default")]
    pub repository: Repository,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Repository {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
}

impl Event {
    #[inline]
    pub fn repository_name(&self) -> &str { &self.repository.name }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` `{}`", self.repository.name, self.git_ref)
    }
}

/// `null` is treated like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Delivery metadata from the GitHub request headers, used for logging only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    pub event: Option<String>,
    pub id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_repository_and_ref() {
        let event = Event {
            git_ref: "refs/heads/main".to_string(),
            repository: Repository { name: "demo".to_string() },
        };
        assert_eq!(event.to_string(), "`demo` `refs/heads/main`");
    }
}
