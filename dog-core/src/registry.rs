use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

type AnyExtension = Arc<dyn Any + Send + Sync>;

/// A simple registry that maps extension names to extension instances.
///
/// Extensions (queues, databases, auth, ...) register themselves under a
/// well-known name so that code holding only the app can find them again.
#[derive(Default)]
pub struct DogExtensionRegistry {
    extensions: HashMap<String, AnyExtension>,
}

impl DogExtensionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            extensions: HashMap::new(),
        }
    }

    /// Register an extension under a given name, replacing any previous one.
    pub fn register<S>(&mut self, name: S, extension: AnyExtension)
    where
        S: Into<String>,
    {
        self.extensions.insert(name.into(), extension);
    }

    /// Look up an extension by name and concrete type.
    pub fn get<T>(&self, name: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let ext = self.extensions.get(name)?.clone();
        ext.downcast::<T>().ok()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.extensions.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.extensions.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker(u8);

    #[test]
    fn lookup_requires_matching_type() {
        let mut reg = DogExtensionRegistry::new();
        reg.register("marker", Arc::new(Marker(7)));

        assert!(reg.contains("marker"));
        assert_eq!(reg.get::<Marker>("marker").map(|m| m.0), Some(7));
        assert!(reg.get::<String>("marker").is_none());
        assert!(reg.get::<Marker>("other").is_none());
    }
}
