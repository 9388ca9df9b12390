//! Entity allocation table and component storage

use super::{Component, ComponentType, EcsError, Entity};

/// Initial size of the allocation table
const MIN_CAPACITY: usize = 64;

type ComponentList = Vec<(ComponentType, Box<dyn Component>)>;

#[derive(Default)]
struct Slot {
    generation: u32,
    components: Option<ComponentList>,
}

/// Dense allocation table of entities with their components.
///
/// A slot is either free or holds the components of a live entity in
/// attachment order. Allocation takes the lowest free slot; when none is
/// left the table doubles in size. Freeing a slot bumps its generation.
pub struct EntityStore {
    slots: Vec<Slot>,
    alive: usize,
    first_free: usize,
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityStore {
    /// Create an empty store
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(MIN_CAPACITY);
        slots.resize_with(MIN_CAPACITY, Slot::default);
        Self {
            slots,
            alive: 0,
            first_free: 0,
        }
    }

    /// Number of live entities
    pub const fn len(&self) -> usize {
        self.alive
    }

    /// Whether no entity is alive
    pub const fn is_empty(&self) -> bool {
        self.alive == 0
    }

    /// Size of the allocation table
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Whether the entity is allocated; false for stale handles of a reused slot
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.components(entity).is_some()
    }

    fn components(&self, entity: Entity) -> Option<&ComponentList> {
        self.slots
            .get(entity.index())
            .filter(|slot| slot.generation == entity.generation())
            .and_then(|slot| slot.components.as_ref())
    }

    fn components_mut(&mut self, entity: Entity) -> Option<&mut ComponentList> {
        self.slots
            .get_mut(entity.index())
            .filter(|slot| slot.generation == entity.generation())
            .and_then(|slot| slot.components.as_mut())
    }

    /// Whether the entity has a `T`; false for dead entities
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.has_component_type(entity, ComponentType::of::<T>())
    }

    /// Whether the entity has a component of the given kind
    pub fn has_component_type(&self, entity: Entity, component_type: ComponentType) -> bool {
        self.components(entity)
            .is_some_and(|list| list.iter().any(|(kind, _)| *kind == component_type))
    }

    /// Borrow the entity's `T`.
    ///
    /// Asking a dead entity is a caller error and is logged.
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        let Some(list) = self.components(entity) else {
            log::error!("Component lookup on unallocated {entity}");
            return None;
        };
        list.iter()
            .find(|(kind, _)| kind.is::<T>())
            .and_then(|(_, component)| component.as_ref().downcast_ref::<T>())
    }

    /// Mutably borrow the entity's `T`
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let Some(list) = self.components_mut(entity) else {
            log::error!("Component lookup on unallocated {entity}");
            return None;
        };
        list.iter_mut()
            .find(|(kind, _)| kind.is::<T>())
            .and_then(|(_, component)| component.as_mut().downcast_mut::<T>())
    }

    /// Kinds of component attached to the entity, in attachment order
    pub fn component_types(&self, entity: Entity) -> impl Iterator<Item = ComponentType> + '_ {
        self.components(entity)
            .into_iter()
            .flat_map(|list| list.iter().map(|(kind, _)| *kind))
    }

    /// Live entities in id order
    #[allow(clippy::cast_possible_truncation)]
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.components.is_some())
            .map(|(index, slot)| Entity::new(index as u32, slot.generation))
    }

    /// Start a lazy query over every live entity
    pub fn query(&self) -> Query<'_, impl Iterator<Item = Entity> + '_> {
        Query {
            store: self,
            entities: self.entities(),
        }
    }

    pub(crate) fn allocate(&mut self) -> Result<Entity, EcsError> {
        let index = match self.slots[self.first_free..]
            .iter()
            .position(|slot| slot.components.is_none())
        {
            Some(offset) => self.first_free + offset,
            None => self.grow()?,
        };
        let id = u32::try_from(index).map_err(|_| EcsError::AllocationFailed(index))?;

        let slot = &mut self.slots[index];
        slot.components = Some(Vec::new());
        self.alive += 1;
        self.first_free = index + 1;
        Ok(Entity::new(id, slot.generation))
    }

    /// Double the table and return the first new slot
    fn grow(&mut self) -> Result<usize, EcsError> {
        let old_len = self.slots.len();
        let new_len = (old_len * 2).max(MIN_CAPACITY);
        self.slots
            .try_reserve_exact(new_len - old_len)
            .map_err(|_| EcsError::AllocationFailed(new_len))?;
        self.slots.resize_with(new_len, Slot::default);
        log::debug!("Entity table grown from {old_len} to {new_len} slots");
        Ok(old_len)
    }

    /// Detach every component, in attachment order, leaving the slot allocated
    pub(crate) fn take_components(&mut self, entity: Entity) -> ComponentList {
        self.components_mut(entity).map(std::mem::take).unwrap_or_default()
    }

    pub(crate) fn free(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let slot = &mut self.slots[entity.index()];
        slot.components = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.alive -= 1;
        self.first_free = self.first_free.min(entity.index());
        true
    }

    pub(crate) fn insert_component(
        &mut self,
        entity: Entity,
        component_type: ComponentType,
        component: Box<dyn Component>,
    ) -> Result<(), EcsError> {
        let list = self
            .components_mut(entity)
            .ok_or(EcsError::EntityNotAllocated(entity))?;
        if list.iter().any(|(kind, _)| *kind == component_type) {
            return Err(EcsError::DuplicateComponent {
                entity,
                component: component_type.name(),
            });
        }
        list.push((component_type, component));
        Ok(())
    }

    pub(crate) fn take_component(
        &mut self,
        entity: Entity,
        component_type: ComponentType,
    ) -> Option<Box<dyn Component>> {
        let list = self.components_mut(entity)?;
        let position = list.iter().position(|(kind, _)| *kind == component_type)?;
        Some(list.remove(position).1)
    }
}

/// Lazy, composable filter over live entities.
///
/// Nothing is evaluated until the query is iterated; each filter wraps the
/// previous iterator.
pub struct Query<'w, I> {
    store: &'w EntityStore,
    entities: I,
}

impl<'w, I: Iterator<Item = Entity> + 'w> Query<'w, I> {
    /// Keep only `entity`
    pub fn entity(self, entity: Entity) -> Query<'w, impl Iterator<Item = Entity> + 'w> {
        Query {
            store: self.store,
            entities: self.entities.filter(move |candidate| *candidate == entity),
        }
    }

    /// Keep only entities that have a `T`
    pub fn component<T: Component>(self) -> Query<'w, impl Iterator<Item = Entity> + 'w> {
        let store = self.store;
        Query {
            store,
            entities: self.entities.filter(move |&entity| store.has_component::<T>(entity)),
        }
    }

    /// Keep only entities accepted by `predicate`
    pub fn filter<P>(self, mut predicate: P) -> Query<'w, impl Iterator<Item = Entity> + 'w>
    where
        P: FnMut(&'w EntityStore, Entity) -> bool + 'w,
    {
        let store = self.store;
        Query {
            store,
            entities: self.entities.filter(move |&entity| predicate(store, entity)),
        }
    }

    /// Yield each remaining entity with its `T`, skipping entities without one
    pub fn fetch<T: Component>(self) -> impl Iterator<Item = (Entity, &'w T)> + 'w {
        let store = self.store;
        self.entities
            .filter_map(move |entity| store.get::<T>(entity).map(|component| (entity, component)))
    }
}

impl<I: Iterator<Item = Entity>> Iterator for Query<'_, I> {
    type Item = Entity;

    fn next(&mut self) -> Option<Entity> {
        self.entities.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Health(u32);
    impl Component for Health {}

    struct Tag;
    impl Component for Tag {}

    #[test]
    fn test_allocation_reuses_lowest_free_slot() {
        let mut store = EntityStore::new();
        let a = store.allocate().unwrap();
        let b = store.allocate().unwrap();
        let c = store.allocate().unwrap();
        assert_eq!((a.id(), b.id(), c.id()), (0, 1, 2));

        assert!(store.free(b));
        assert!(!store.free(b));
        let reused = store.allocate().unwrap();
        assert_eq!(reused.id(), b.id());
        assert_eq!(reused.generation(), b.generation() + 1);
        assert_eq!(store.allocate().unwrap().id(), 3);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_stale_handle_does_not_alias_reused_slot() {
        let mut store = EntityStore::new();
        let old = store.allocate().unwrap();
        store
            .insert_component(old, ComponentType::of::<Health>(), Box::new(Health(1)))
            .unwrap();
        store.take_components(old);
        store.free(old);

        let fresh = store.allocate().unwrap();
        store
            .insert_component(fresh, ComponentType::of::<Health>(), Box::new(Health(9)))
            .unwrap();

        assert_ne!(old, fresh);
        assert!(!store.is_alive(old));
        assert!(store.is_alive(fresh));
        assert!(!store.has_component::<Health>(old));
        assert!(store.get::<Health>(old).is_none());
        assert!(!store.free(old));
        assert_eq!(store.get::<Health>(fresh), Some(&Health(9)));
        assert_eq!(store.entities().collect::<Vec<_>>(), vec![fresh]);
    }

    #[test]
    fn test_table_doubles_when_full() {
        let mut store = EntityStore::new();
        for _ in 0..MIN_CAPACITY {
            store.allocate().unwrap();
        }
        assert_eq!(store.capacity(), MIN_CAPACITY);

        let next = store.allocate().unwrap();
        assert_eq!(next.index(), MIN_CAPACITY);
        assert_eq!(store.capacity(), MIN_CAPACITY * 2);
    }

    #[test]
    fn test_duplicate_component_rejected() {
        let mut store = EntityStore::new();
        let entity = store.allocate().unwrap();
        store
            .insert_component(entity, ComponentType::of::<Health>(), Box::new(Health(3)))
            .unwrap();
        let error = store
            .insert_component(entity, ComponentType::of::<Health>(), Box::new(Health(5)))
            .unwrap_err();
        assert!(matches!(error, EcsError::DuplicateComponent { .. }));
        assert_eq!(store.get::<Health>(entity), Some(&Health(3)));
    }

    #[test]
    fn test_dead_entity_has_nothing() {
        let mut store = EntityStore::new();
        let entity = store.allocate().unwrap();
        store
            .insert_component(entity, ComponentType::of::<Tag>(), Box::new(Tag))
            .unwrap();
        let taken = store.take_components(entity);
        assert_eq!(taken.len(), 1);
        store.free(entity);

        assert!(!store.is_alive(entity));
        assert!(!store.has_component::<Tag>(entity));
        assert!(store.get::<Tag>(entity).is_none());
        assert!(store
            .insert_component(entity, ComponentType::of::<Tag>(), Box::new(Tag))
            .is_err());
    }

    #[test]
    fn test_query_composes_filters() {
        let mut store = EntityStore::new();
        let mut make = |health: Option<u32>, tagged: bool| {
            let entity = store.allocate().unwrap();
            if let Some(health) = health {
                store
                    .insert_component(entity, ComponentType::of::<Health>(), Box::new(Health(health)))
                    .unwrap();
            }
            if tagged {
                store
                    .insert_component(entity, ComponentType::of::<Tag>(), Box::new(Tag))
                    .unwrap();
            }
            entity
        };
        let a = make(Some(1), true);
        let b = make(Some(2), false);
        let _c = make(None, true);
        let d = make(Some(4), true);

        let tagged_health: Vec<_> = store
            .query()
            .component::<Tag>()
            .fetch::<Health>()
            .map(|(entity, health)| (entity, health.0))
            .collect();
        assert_eq!(tagged_health, vec![(a, 1), (d, 4)]);

        assert_eq!(store.query().entity(b).component::<Tag>().count(), 0);
        assert_eq!(store.query().entity(b).component::<Health>().next(), Some(b));

        let strong: Vec<_> = store
            .query()
            .filter(|store, entity| store.get::<Health>(entity).is_some_and(|h| h.0 > 1))
            .collect();
        assert_eq!(strong, vec![b, d]);
    }
}
