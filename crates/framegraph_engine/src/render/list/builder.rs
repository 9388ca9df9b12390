//! Render list builder resource

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{DrawableProvider, RenderList, ViewProvider};
use crate::ecs::components::RenderSource;
use crate::ecs::events::{ComponentCreated, ComponentDestroyed, EntityDestroyed};
use crate::ecs::{ComponentType, Entity, EntityManager};
use crate::events::{EventQueue, HandlerId};
use crate::resources::{
    Capabilities, FromResources, InitError, Initializable, Lazy, LazyCollection, Resource,
    ResourceGroup, ResourceSet,
};
use crate::scene::{NodeId, SceneManager};

/// What a cached member set was computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MembershipStamp {
    root: NodeId,
    scene_revision: u64,
    epoch: u64,
}

#[derive(Default)]
struct BuilderState {
    sources: HashMap<String, Entity>,
    lists: HashMap<String, RenderList>,
    membership: HashMap<String, MembershipStamp>,
    /// Bumped by every component or entity event
    epoch: u64,
}

impl BuilderState {
    fn forget(&mut self, name: &str) {
        self.lists.remove(name);
        self.membership.remove(name);
    }
}

/// Builds and caches one [`RenderList`] per named [`RenderSource`].
///
/// The name to entity mapping is maintained from component events rather
/// than rescanned. A build asks the view providers for the source's view,
/// walks the scene tree containing the source, and asks the drawable
/// providers about every marked entity found there. The walk is skipped
/// while no component or entity event arrived and the scene is unchanged;
/// drawables are always refreshed, since transforms change without events.
pub struct RenderListBuilder {
    entities: Lazy<EntityManager>,
    scenes: Lazy<SceneManager>,
    events: Lazy<EventQueue>,
    views: LazyCollection<dyn ViewProvider>,
    drawables: LazyCollection<dyn DrawableProvider>,
    state: Arc<Mutex<BuilderState>>,
    handlers: Mutex<Vec<HandlerId>>,
}

impl Resource for RenderListBuilder {
    const GROUP: ResourceGroup = ResourceGroup::Rendering;

    fn register_capabilities(capabilities: &mut Capabilities<'_, Self>) {
        capabilities.provide::<dyn Initializable>(|this| this);
    }
}

impl FromResources for RenderListBuilder {
    fn from_resources(resources: &ResourceSet) -> Self {
        Self {
            entities: resources.get_lazy(),
            scenes: resources.get_lazy(),
            events: resources.get_lazy(),
            views: resources.get_lazy_all(),
            drawables: resources.get_lazy_all(),
            state: Arc::default(),
            handlers: Mutex::new(Vec::new()),
        }
    }
}

impl Initializable for RenderListBuilder {
    fn init(&self) -> Result<(), InitError> {
        let events = self.events.try_resolve()?;
        let entities = Arc::clone(self.entities.try_resolve()?);

        let state = Arc::clone(&self.state);
        let created = events.add_listener(move |event: &ComponentCreated| {
            state.lock().epoch += 1;
            if !event.component_type.is::<RenderSource>() || !entities.is_alive(event.entity) {
                return;
            }
            let Some(name) = entities.with_component(event.entity, |source: &RenderSource| source.name.clone())
            else {
                return;
            };
            let mut state = state.lock();
            if let Some(previous) = state.sources.insert(name.clone(), event.entity) {
                if previous != event.entity {
                    log::warn!("Render source `{name}` moved from {previous} to {}", event.entity);
                    state.forget(&name);
                }
            }
        });

        let state = Arc::clone(&self.state);
        let destroyed = events.add_listener(move |event: &ComponentDestroyed| {
            let mut state = state.lock();
            state.epoch += 1;
            let Some(source) = event.component::<RenderSource>() else {
                return;
            };
            if state.sources.get(&source.name) == Some(&event.entity) {
                state.sources.remove(&source.name);
                state.forget(&source.name);
            }
        });

        let state = Arc::clone(&self.state);
        let entity_destroyed = events.add_listener(move |event: &EntityDestroyed| {
            let mut state = state.lock();
            state.epoch += 1;
            for list in state.lists.values_mut() {
                list.remove(event.entity);
            }
        });

        self.handlers.lock().extend([created, destroyed, entity_destroyed]);
        Ok(())
    }

    fn destroy(&self) {
        let handlers = std::mem::take(&mut *self.handlers.lock());
        if let Ok(events) = self.events.try_resolve() {
            for id in handlers {
                events.remove_handler(id);
            }
        }
        let mut state = self.state.lock();
        state.sources.clear();
        state.lists.clear();
        state.membership.clear();
    }
}

impl RenderListBuilder {
    /// Entity currently bound to the render source `name`
    pub fn source_entity(&self, name: &str) -> Option<Entity> {
        self.state.lock().sources.get(name).copied()
    }

    /// Rebuild the list for `name` and return a copy.
    ///
    /// `None` means there is nothing to render from: no such source, no
    /// view for it, or the source is not in any scene tree. An empty list
    /// means the view exists but sees nothing.
    pub fn try_build_render_list(&self, name: &str) -> Option<RenderList> {
        if !self.rebuild(name) {
            return None;
        }
        self.state.lock().lists.get(name).cloned()
    }

    /// Rebuild the list for `name` and run `f` on it without copying.
    ///
    /// The builder is locked while `f` runs.
    pub fn with_render_list<R>(&self, name: &str, f: impl FnOnce(&RenderList) -> R) -> Option<R> {
        if !self.rebuild(name) {
            return None;
        }
        self.state.lock().lists.get(name).map(f)
    }

    fn rebuild(&self, name: &str) -> bool {
        let Some(source) = self.source_entity(name) else {
            log::debug!("No render source named `{name}`");
            return false;
        };

        let Some(view) = self.views.iter().find_map(|provider| provider.view(source)) else {
            log::warn!("Render source `{name}` ({source}) has no view");
            self.state.lock().forget(name);
            return false;
        };

        let epoch = self.state.lock().epoch;
        let (stamp, candidates) = {
            let scene = self.scenes.read();
            let Some(root) = scene.find_entity_root(source) else {
                log::debug!("Render source `{name}` ({source}) is not in a scene tree");
                drop(scene);
                self.state.lock().forget(name);
                return false;
            };
            let stamp = MembershipStamp {
                root,
                scene_revision: scene.revision(),
                epoch,
            };
            let cached = {
                let state = self.state.lock();
                match (state.membership.get(name), state.lists.get(name)) {
                    (Some(&previous), Some(list)) if previous == stamp => Some(list.members.clone()),
                    _ => None,
                }
            };
            match cached {
                Some(members) => (stamp, Candidates::Cached(members)),
                None => (stamp, Candidates::Walked(scene.descendant_entities(root).collect())),
            }
        };

        let members = match candidates {
            Candidates::Cached(members) => members,
            Candidates::Walked(candidates) => {
                let markers: Vec<ComponentType> =
                    self.drawables.iter().map(|provider| provider.marker()).collect();
                let store = self.entities.read();
                candidates
                    .into_iter()
                    .filter(|&entity| markers.iter().any(|&marker| store.has_component_type(entity, marker)))
                    .collect()
            }
        };

        let mut fresh = BTreeMap::new();
        for &entity in &members {
            for provider in self.drawables.iter() {
                if let Some(drawable) = provider.drawable(entity) {
                    fresh.insert(entity, drawable);
                }
            }
        }

        let mut state = self.state.lock();
        state.membership.insert(name.to_string(), stamp);
        let list = state
            .lists
            .entry(name.to_string())
            .or_insert_with(|| RenderList::new(view));
        list.view = view;
        list.drawables.retain(|entity, _| fresh.contains_key(entity));
        list.drawables.extend(fresh);
        list.members = members;
        log::trace!("Render list `{name}` rebuilt with {} drawables", list.drawables.len());
        true
    }
}

enum Candidates {
    Cached(BTreeSet<Entity>),
    Walked(Vec<Entity>),
}
