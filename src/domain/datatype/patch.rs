use serde::{Deserialize, Deserializer};

/// Change requested for a single field of a partial update.
///
/// `Unset` means the field was absent from the request and must be left
/// untouched, `Null` that it must be cleared and `Value` that it must be set.
///
/// Deserializing only yields `Null` or `Value`; struct fields must be marked
/// `#[serde(default)]` so that an absent key becomes `Unset`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Unset,
    Null,
    Value(T),
}

impl<T> Patch<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Patch::Unset)
    }

    /// Applies the change over the current value of a nullable field.
    #[cfg(test)]
    pub fn apply_to(self, current: &mut Option<T>) {
        match self {
            Patch::Unset => {}
            Patch::Null => *current = None,
            Patch::Value(value) => *current = Some(value),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Patch::Null, Patch::Value)
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    use super::Patch;

    #[derive(Debug, Deserialize)]
    struct Body {
        #[serde(default)]
        location: Patch<String>,
    }

    #[test]
    fn distinguishes_absent_null_and_value() {
        let absent: Body = serde_json::from_str("{}").unwrap();
        let null: Body = serde_json::from_str(r#"{"location": null}"#).unwrap();
        let value: Body = serde_json::from_str(r#"{"location": "Paris"}"#).unwrap();

        assert_eq!(absent.location, Patch::Unset);
        assert_eq!(null.location, Patch::Null);
        assert_eq!(value.location, Patch::Value("Paris".to_string()));
    }

    #[test]
    fn applies_over_current_value() {
        let mut location = Some("Paris".to_string());

        Patch::Unset.apply_to(&mut location);
        assert_eq!(location.as_deref(), Some("Paris"));

        Patch::Value("Lyon".to_string()).apply_to(&mut location);
        assert_eq!(location.as_deref(), Some("Lyon"));

        Patch::Null.apply_to(&mut location);
        assert_eq!(location, None);
    }
}
