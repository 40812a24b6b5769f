//! Component factory table.
//!
//! Components are resolved by name at startup instead of being loaded from
//! dynamic libraries. Hosts register a constructor per name and build the
//! pipeline from configuration.

use std::collections::HashMap;
use std::fmt;

use crate::component::Component;
use crate::error::{KernelError, KernelResult};
use crate::processor::{DefaultMessageProcessor, DEFAULT_MESSAGE_PROCESSOR};

/// Constructor stored in a [`ComponentFactoryTable`].
pub type ComponentConstructor = Box<dyn Fn() -> Box<dyn Component> + Send + Sync>;

/// Named component constructors.
pub struct ComponentFactoryTable {
    constructors: HashMap<String, ComponentConstructor>,
}

impl ComponentFactoryTable {
    /// Creates a table holding the built-in components.
    #[must_use]
    pub fn new() -> Self {
        let mut table = Self::empty();
        table.register(DEFAULT_MESSAGE_PROCESSOR, || {
            Box::new(DefaultMessageProcessor::new())
        });
        table
    }

    /// Creates a table with nothing registered.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registers (or replaces) the constructor for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Box<dyn Component> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.constructors.insert(name.clone(), Box::new(constructor)).is_some() {
            tracing::debug!(component = %name, "Component constructor replaced");
        }
    }

    /// Builds a fresh component.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing is registered under `name`.
    pub fn create(&self, name: &str) -> KernelResult<Box<dyn Component>> {
        self.constructors
            .get(name)
            .map(|make| make())
            .ok_or_else(|| KernelError::NotFound {
                kind: "component factory",
                key: name.to_owned(),
            })
    }

    /// True if `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ComponentFactoryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ComponentFactoryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentFactoryTable")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentPriority;
    use crate::kernel::Kernel;

    #[test]
    fn test_builtin_processor_registered() {
        let table = ComponentFactoryTable::new();
        assert!(table.contains(DEFAULT_MESSAGE_PROCESSOR));
        let component = table.create(DEFAULT_MESSAGE_PROCESSOR).unwrap();
        assert_eq!(component.name(), DEFAULT_MESSAGE_PROCESSOR);

        let mut kernel = Kernel::new();
        kernel.add_boxed_component(component, ComponentPriority::Normal).unwrap();
        assert!(kernel.component::<DefaultMessageProcessor>().is_ok());
    }

    #[test]
    fn test_unknown_name() {
        let table = ComponentFactoryTable::empty();
        assert!(matches!(
            table.create("dis_translator"),
            Err(KernelError::NotFound { kind: "component factory", .. })
        ));
    }

    #[test]
    fn test_names_sorted() {
        let mut table = ComponentFactoryTable::new();
        table.register("alpha", || Box::new(DefaultMessageProcessor::new()));
        assert_eq!(table.names(), vec!["alpha", DEFAULT_MESSAGE_PROCESSOR]);
    }
}
