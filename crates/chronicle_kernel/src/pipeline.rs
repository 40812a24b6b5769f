//! # Component Pipeline
//!
//! Components sorted by priority, ties broken by insertion order. The order
//! is fixed at insertion so every run dispatches identically.

use std::any::TypeId;

use crate::component::{AsAny, Component, ComponentPriority};

/// One slot in the pipeline.
pub(crate) struct ComponentEntry {
    pub(crate) name: String,
    pub(crate) priority: ComponentPriority,
    pub(crate) type_id: TypeId,
    pub(crate) component: Box<dyn Component>,
}

/// Ordered list of components.
#[derive(Default)]
pub(crate) struct ComponentPipeline {
    entries: Vec<ComponentEntry>,
}

impl ComponentPipeline {
    /// Concrete type of a boxed component.
    pub(crate) fn type_of(component: &dyn Component) -> TypeId {
        AsAny::as_any(component).type_id()
    }

    /// True if a component with this type or name is present.
    pub(crate) fn contains(&self, type_id: TypeId, name: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.type_id == type_id || e.name == name)
    }

    /// Inserts after every entry of equal or higher priority. Returns the
    /// slot index.
    pub(crate) fn insert(&mut self, component: Box<dyn Component>, priority: ComponentPriority) -> usize {
        let type_id = Self::type_of(component.as_ref());
        let name = component.name().to_owned();
        let pos = self
            .entries
            .iter()
            .position(|e| e.priority.order() > priority.order())
            .unwrap_or(self.entries.len());
        self.entries.insert(
            pos,
            ComponentEntry {
                name,
                priority,
                type_id,
                component,
            },
        );
        pos
    }

    /// Removes a component by name.
    pub(crate) fn remove_by_name(&mut self, name: &str) -> Option<ComponentEntry> {
        let pos = self.entries.iter().position(|e| e.name == name)?;
        Some(self.entries.remove(pos))
    }

    /// Removes a component by type.
    pub(crate) fn remove_by_type(&mut self, type_id: TypeId) -> Option<ComponentEntry> {
        let pos = self.entries.iter().position(|e| e.type_id == type_id)?;
        Some(self.entries.remove(pos))
    }

    /// Finds a component by type.
    pub(crate) fn find(&self, type_id: TypeId) -> Option<&ComponentEntry> {
        self.entries.iter().find(|e| e.type_id == type_id)
    }

    /// Finds a component by type, mutably.
    pub(crate) fn find_mut(&mut self, type_id: TypeId) -> Option<&mut ComponentEntry> {
        self.entries.iter_mut().find(|e| e.type_id == type_id)
    }

    /// Iterates in dispatch order.
    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, ComponentEntry> {
        self.entries.iter_mut()
    }

    /// Names and priorities in dispatch order.
    pub(crate) fn describe(&self) -> Vec<(String, ComponentPriority)> {
        self.entries
            .iter()
            .map(|e| (e.name.clone(), e.priority))
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::KernelContext;
    use crate::error::ComponentError;
    use chronicle_core::Message;

    struct Named(&'static str);

    impl Component for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn process_message(
            &mut self,
            _ctx: &mut KernelContext,
            _message: &Message,
        ) -> Result<(), ComponentError> {
            Ok(())
        }
    }

    struct Other;

    impl Component for Other {
        fn name(&self) -> &str {
            "other"
        }

        fn process_message(
            &mut self,
            _ctx: &mut KernelContext,
            _message: &Message,
        ) -> Result<(), ComponentError> {
            Ok(())
        }
    }

    #[test]
    fn test_priority_then_insertion_order() {
        let mut pipeline = ComponentPipeline::default();
        pipeline.insert(Box::new(Named("n1")), ComponentPriority::Normal);
        pipeline.insert(Box::new(Named("low")), ComponentPriority::Lowest);
        pipeline.insert(Box::new(Named("n2")), ComponentPriority::Normal);
        pipeline.insert(Box::new(Named("high")), ComponentPriority::Highest);

        let names: Vec<String> = pipeline.describe().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["high", "n1", "n2", "low"]);
    }

    #[test]
    fn test_type_identity() {
        let mut pipeline = ComponentPipeline::default();
        pipeline.insert(Box::new(Named("a")), ComponentPriority::Normal);

        assert!(pipeline.contains(TypeId::of::<Named>(), "zzz"));
        assert!(!pipeline.contains(TypeId::of::<Other>(), "other"));
        assert!(pipeline.find(TypeId::of::<Named>()).is_some());
        assert!(pipeline.remove_by_type(TypeId::of::<Named>()).is_some());
        assert_eq!(pipeline.len(), 0);
    }
}
