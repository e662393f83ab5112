pub mod date;
pub mod flag;
pub mod patch;

// ### JsonPointer

/// Location of a value inside a request document, formatted as described in
/// [RFC 6901](https://www.rfc-editor.org/rfc/rfc6901).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct JsonPointer {
    segments: Vec<Box<str>>,
}

impl JsonPointer {
    pub fn field(name: &str) -> Self {
        Self::default().push(name)
    }

    pub fn push(mut self, segment: impl ToString) -> Self {
        self.segments.push(segment.to_string().into_boxed_str());
        self
    }
}

impl std::fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for segment in self.segments.iter() {
            write!(f, "/{}", segment.replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}

impl From<JsonPointer> for String {
    fn from(pointer: JsonPointer) -> Self {
        pointer.to_string()
    }
}
