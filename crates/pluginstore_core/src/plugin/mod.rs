//! Plugin bundles and their manifest format.

pub mod manifest;

use crate::extension::model::ExtensionDeclaration;

/// Named, ordered bundle of extension declarations.
#[derive(Debug, Clone)]
pub struct Plugin {
    name: String,
    extensions: Vec<ExtensionDeclaration>,
}

impl Plugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extensions: Vec::new(),
        }
    }

    pub fn with_extensions(
        name: impl Into<String>,
        extensions: impl IntoIterator<Item = ExtensionDeclaration>,
    ) -> Self {
        Self {
            name: name.into(),
            extensions: extensions.into_iter().collect(),
        }
    }

    /// Appends one declaration, keeping declaration order.
    pub fn extension(mut self, declaration: ExtensionDeclaration) -> Self {
        self.extensions.push(declaration);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extensions(&self) -> &[ExtensionDeclaration] {
        &self.extensions
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub(crate) fn into_parts(self) -> (String, Vec<ExtensionDeclaration>) {
        (self.name, self.extensions)
    }
}
