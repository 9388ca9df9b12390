//! Entity manager resource

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::events::{ComponentCreated, ComponentDestroyed, EntityCreated, EntityDestroyed};
use super::{Component, ComponentType, EcsError, Entity, EntityStore};
use crate::events::EventQueue;
use crate::resources::{FromResources, Lazy, Resource, ResourceGroup, ResourceSet};

/// Owns the entity store and announces every structural change.
///
/// Creation and attachment events are pushed after the change is applied.
/// Removal events are pushed while the data still exists, and carry the final
/// component state, so handlers never observe a half-destroyed entity.
pub struct EntityManager {
    store: RwLock<EntityStore>,
    events: Lazy<EventQueue>,
}

impl Resource for EntityManager {
    const GROUP: ResourceGroup = ResourceGroup::ECSManager;
}

impl FromResources for EntityManager {
    fn from_resources(resources: &ResourceSet) -> Self {
        Self {
            store: RwLock::new(EntityStore::new()),
            events: resources.get_lazy(),
        }
    }
}

impl EntityManager {
    /// Allocate a new entity
    pub fn create_entity(&self) -> Result<Entity, EcsError> {
        let entity = self.store.write().allocate()?;
        log::trace!("Created {entity}");
        self.events.push(EntityCreated { entity });
        Ok(entity)
    }

    /// Destroy an entity and every component attached to it.
    ///
    /// One [`ComponentDestroyed`] is queued per component, in attachment
    /// order, before the final [`EntityDestroyed`]. Returns `false` if the
    /// entity was not alive.
    pub fn destroy_entity(&self, entity: Entity) -> bool {
        let mut store = self.store.write();
        if !store.is_alive(entity) {
            log::warn!("Ignoring destroy of unallocated {entity}");
            return false;
        }

        for (component_type, component) in store.take_components(entity) {
            self.events.push(ComponentDestroyed {
                entity,
                component_type,
                component: Arc::from(component),
            });
        }
        self.events.push(EntityDestroyed { entity });
        store.free(entity);
        log::trace!("Destroyed {entity}");
        true
    }

    /// Attach a component.
    ///
    /// Fails if the entity is not alive or already has a `T`; both cases are
    /// caller errors and are logged.
    pub fn add_component<T: Component>(&self, entity: Entity, component: T) -> Result<(), EcsError> {
        let component_type = ComponentType::of::<T>();
        if let Err(error) =
            self.store
                .write()
                .insert_component(entity, component_type, Box::new(component))
        {
            log::error!("{error}");
            return Err(error);
        }
        self.events.push(ComponentCreated {
            entity,
            component_type,
        });
        Ok(())
    }

    /// Detach the entity's `T`, returning whether there was one
    pub fn remove_component<T: Component>(&self, entity: Entity) -> bool {
        let component_type = ComponentType::of::<T>();
        let mut store = self.store.write();
        let Some(component) = store.take_component(entity, component_type) else {
            log::error!("{entity} has no `{component_type}` component to remove");
            return false;
        };
        self.events.push(ComponentDestroyed {
            entity,
            component_type,
            component: Arc::from(component),
        });
        true
    }

    /// Whether the entity is alive
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.store.read().is_alive(entity)
    }

    /// Whether the entity has a `T`
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.store.read().has_component::<T>(entity)
    }

    /// Number of live entities
    pub fn entity_count(&self) -> usize {
        self.store.read().len()
    }

    /// Run `f` on the entity's `T`, if present
    pub fn with_component<T: Component, R>(&self, entity: Entity, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.store.read().get::<T>(entity).map(f)
    }

    /// Run `f` on the entity's `T` mutably, if present
    pub fn with_component_mut<T: Component, R>(
        &self,
        entity: Entity,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        self.store.write().get_mut::<T>(entity).map(f)
    }

    /// Shared access to the store, for queries.
    ///
    /// Do not call back into the manager while holding the guard.
    pub fn read(&self) -> RwLockReadGuard<'_, EntityStore> {
        self.store.read()
    }

    /// Exclusive access to the store, for bulk component updates
    pub fn write(&self) -> RwLockWriteGuard<'_, EntityStore> {
        self.store.write()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug, PartialEq)]
    struct Position(i32);
    impl Component for Position {}

    #[derive(Debug, PartialEq)]
    struct Velocity(i32);
    impl Component for Velocity {}

    fn setup() -> (ResourceSet, Arc<EntityManager>, Arc<EventQueue>) {
        let resources = ResourceSet::new();
        let events = resources.add::<EventQueue>().unwrap();
        let entities = resources.add::<EntityManager>().unwrap();
        (resources, entities, events)
    }

    #[test]
    fn test_destroy_emits_component_events_first() {
        let (_resources, entities, events) = setup();
        let log = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&log);
        events.add_listener(move |event: &ComponentDestroyed| {
            let value = event.component::<Position>().map(|p| p.0);
            sink.lock()
                .push(format!("component {} {:?}", event.component_type.name(), value));
        });
        let sink = Arc::clone(&log);
        events.add_listener(move |event: &EntityDestroyed| {
            sink.lock().push(format!("entity {}", event.entity.id()));
        });

        let entity = entities.create_entity().unwrap();
        entities.add_component(entity, Position(7)).unwrap();
        entities.add_component(entity, Velocity(1)).unwrap();
        assert!(entities.destroy_entity(entity));
        assert!(!entities.is_alive(entity));
        events.process().unwrap();

        let log = log.lock();
        assert_eq!(log.len(), 3);
        assert!(log[0].contains("Position") && log[0].ends_with("Some(7)"));
        assert!(log[1].contains("Velocity") && log[1].ends_with("None"));
        assert_eq!(log[2], format!("entity {}", entity.id()));
    }

    #[test]
    fn test_destroy_dead_entity_is_noop() {
        let (_resources, entities, events) = setup();
        let entity = entities.create_entity().unwrap();
        assert!(entities.destroy_entity(entity));
        events.clear();

        assert!(!entities.destroy_entity(entity));
        assert_eq!(events.pending_count(), 0);
    }

    #[test]
    fn test_add_component_errors_are_reported() {
        let (_resources, entities, events) = setup();
        let entity = entities.create_entity().unwrap();
        entities.add_component(entity, Position(1)).unwrap();
        events.clear();

        assert!(matches!(
            entities.add_component(entity, Position(2)),
            Err(EcsError::DuplicateComponent { .. })
        ));
        assert!(matches!(
            entities.add_component(Entity::from_raw(40), Position(2)),
            Err(EcsError::EntityNotAllocated(_))
        ));
        assert_eq!(events.pending_count(), 0);
        assert_eq!(entities.with_component(entity, |p: &Position| p.0), Some(1));
    }

    #[test]
    fn test_remove_component() {
        let (_resources, entities, events) = setup();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        events.add_listener(move |event: &ComponentDestroyed| {
            sink.lock().push(event.component::<Velocity>().map(|v| v.0));
        });

        let entity = entities.create_entity().unwrap();
        entities.add_component(entity, Velocity(9)).unwrap();
        assert!(entities.remove_component::<Velocity>(entity));
        assert!(!entities.remove_component::<Velocity>(entity));
        assert!(!entities.has_component::<Velocity>(entity));
        assert!(entities.is_alive(entity));

        events.process().unwrap();
        assert_eq!(*seen.lock(), vec![Some(9)]);
    }

    #[test]
    fn test_destroy_then_create_in_one_tick_keeps_identities_apart() {
        let (_resources, entities, events) = setup();
        let old = entities.create_entity().unwrap();
        entities.add_component(old, Position(1)).unwrap();
        events.process().unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let observer = Arc::clone(&entities);
        events.add_listener(move |event: &EntityDestroyed| {
            sink.lock().push((event.entity, observer.is_alive(event.entity)));
        });

        assert!(entities.destroy_entity(old));
        let fresh = entities.create_entity().unwrap();
        entities.add_component(fresh, Position(2)).unwrap();
        assert_eq!(fresh.id(), old.id());
        assert_ne!(fresh, old);

        events.process().unwrap();
        assert_eq!(*seen.lock(), vec![(old, false)]);
        assert!(entities.is_alive(fresh));
        assert_eq!(entities.with_component(fresh, |p: &Position| p.0), Some(2));
        assert!(!entities.destroy_entity(old));
        assert!(entities.is_alive(fresh));
    }

    #[test]
    fn test_with_component_mut_updates_in_place() {
        let (_resources, entities, _events) = setup();
        let entity = entities.create_entity().unwrap();
        entities.add_component(entity, Position(1)).unwrap();
        entities.with_component_mut(entity, |p: &mut Position| p.0 += 10);
        assert_eq!(entities.read().get::<Position>(entity), Some(&Position(11)));
    }
}
