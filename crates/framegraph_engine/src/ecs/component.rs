//! Component trait and type identity

use std::any::{type_name, Any, TypeId};
use std::fmt;

/// Object-safe access to `Any` for trait objects
pub trait AsAny: Any {
    /// Borrow as `&dyn Any`
    fn as_any(&self) -> &dyn Any;

    /// Borrow as `&mut dyn Any`
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Marker trait for components
pub trait Component: AsAny + Send + Sync {}

impl dyn Component {
    /// Downcast to a concrete component type
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Downcast to a concrete component type, mutably
    pub fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Runtime identity of a component kind
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentType {
    id: TypeId,
    name: &'static str,
}

impl ComponentType {
    /// Identity of component type `T`
    pub fn of<T: Component>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Whether this identifies `T`
    pub fn is<T: Component>(self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Underlying type id
    pub const fn type_id(self) -> TypeId {
        self.id
    }

    /// Full type name, for diagnostics
    pub const fn name(self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
