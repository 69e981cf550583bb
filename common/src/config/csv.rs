use std::ops::{Deref, DerefMut};

/// A way to use comma separated values in a config structure or a query string.
///
/// Every value is trimmed, and empty values are dropped. So `" a, ,b"` becomes `["a", "b"]`.
#[derive(Clone, Debug, PartialEq, Eq, Default, serde::Deserialize)]
#[serde(from = "String")]
pub struct CommaSeparatedVec(pub Vec<String>);

impl CommaSeparatedVec {
    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl Deref for CommaSeparatedVec {
    type Target = Vec<String>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for CommaSeparatedVec {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Vec<String>> for CommaSeparatedVec {
    fn from(values: Vec<String>) -> Self {
        Self(values)
    }
}

impl From<&str> for CommaSeparatedVec {
    fn from(value: &str) -> Self {
        Self(
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        )
    }
}

impl From<String> for CommaSeparatedVec {
    fn from(value: String) -> Self {
        value.as_str().into()
    }
}

impl From<CommaSeparatedVec> for Vec<String> {
    fn from(value: CommaSeparatedVec) -> Self {
        value.0
    }
}

#[cfg(test)]
mod test {
    use super::CommaSeparatedVec;

    #[test]
    fn split_and_clean() {
        let values = CommaSeparatedVec::from(" prod, ,staging ,,");
        assert_eq!(*values, vec!["prod".to_string(), "staging".to_string()]);
    }

    #[test]
    fn empty() {
        assert!(CommaSeparatedVec::from("").is_empty());
        assert!(CommaSeparatedVec::from(" , ").is_empty());
    }

    #[test]
    fn deserialize() -> Result<(), serde_json::Error> {
        let values: CommaSeparatedVec = serde_json::from_str(r#""critical,high""#)?;
        assert_eq!(values.into_inner(), vec!["critical".to_string(), "high".to_string()]);
        Ok(())
    }
}
