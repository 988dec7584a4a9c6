/// A named, ordered set of elements. Each element evaluates to its ordinal.
#[derive(Debug)]
pub struct EnumDescriptor {
    pub name: String,
    pub elements: Vec<String>,
}

impl EnumDescriptor {
    pub fn new(name: impl AsRef<str>, elements: Vec<String>) -> Self {
        Self { name: name.as_ref().to_owned(), elements }
    }

    pub fn ordinal(&self, element: &str) -> Option<usize> {
        self.elements.iter().position(|e| e == element)
    }
}
