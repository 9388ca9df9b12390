//! Arena-backed scene forest

use std::collections::{BTreeMap, HashMap, VecDeque};

use slotmap::SlotMap;

use super::SceneError;
use crate::ecs::Entity;

slotmap::new_key_type! {
    /// Generational handle to a node in a [`SceneGraph`]
    pub struct NodeId;
}

/// A node of the scene forest
#[derive(Debug, Clone, Default)]
pub struct SceneNode {
    entity: Option<Entity>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SceneNode {
    /// Entity bound to this node; roots carry none
    pub const fn entity(&self) -> Option<Entity> {
        self.entity
    }

    /// Parent node; `None` for roots
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Forest of named roots.
///
/// Nodes live in a slotmap and refer to each other by [`NodeId`], so stale
/// handles are detected rather than dangling. Every node has at most one
/// parent, and each entity is bound to at most one node.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, SceneNode>,
    roots: BTreeMap<String, NodeId>,
    entity_nodes: HashMap<Entity, NodeId>,
    revision: u64,
}

impl SceneGraph {
    /// Create an empty forest
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes, roots included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the forest has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Counter bumped by every structural change
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Look up a node
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    fn require(&self, id: NodeId) -> Result<&SceneNode, SceneError> {
        self.nodes.get(id).ok_or(SceneError::UnknownNode(id))
    }

    /// Whether `id` is one of the named roots
    pub fn is_root(&self, id: NodeId) -> bool {
        self.nodes
            .get(id)
            .is_some_and(|node| node.parent.is_none())
    }

    /// Create a named root
    pub fn add_root(&mut self, name: impl Into<String>) -> Result<NodeId, SceneError> {
        let name = name.into();
        if self.roots.contains_key(&name) {
            return Err(SceneError::DuplicateRoot(name));
        }
        let id = self.nodes.insert(SceneNode::default());
        self.revision += 1;
        log::debug!("Added scene root `{name}`");
        self.roots.insert(name, id);
        Ok(id)
    }

    /// Root named `name`, created if missing
    pub fn get_or_add_root(&mut self, name: &str) -> NodeId {
        if let Some(&id) = self.roots.get(name) {
            return id;
        }
        let id = self.nodes.insert(SceneNode::default());
        self.revision += 1;
        self.roots.insert(name.to_string(), id);
        id
    }

    /// Root named `name`
    pub fn root(&self, name: &str) -> Option<NodeId> {
        self.roots.get(name).copied()
    }

    /// Named roots in name order
    pub fn roots(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.roots.iter().map(|(name, &id)| (name.as_str(), id))
    }

    /// Remove a root together with its whole subtree
    pub fn remove_root(&mut self, name: &str) -> bool {
        let Some(id) = self.roots.remove(name) else {
            return false;
        };
        self.remove_subtree(id);
        log::debug!("Removed scene root `{name}`");
        true
    }

    /// Create a leaf under `parent` bound to `entity`
    pub fn insert_entity_node(&mut self, parent: NodeId, entity: Entity) -> Result<NodeId, SceneError> {
        self.require(parent)?;
        if self.entity_nodes.contains_key(&entity) {
            return Err(SceneError::EntityAlreadyBound(entity));
        }
        let id = self.nodes.insert(SceneNode {
            entity: Some(entity),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent].children.push(id);
        self.entity_nodes.insert(entity, id);
        self.revision += 1;
        Ok(id)
    }

    /// Re-attach `node`, with its subtree, under `new_parent`
    pub fn move_node(&mut self, new_parent: NodeId, node: NodeId) -> Result<(), SceneError> {
        let old_parent = self
            .require(node)?
            .parent
            .ok_or(SceneError::CannotMoveRoot(node))?;
        self.require(new_parent)?;
        if self.ancestors(new_parent).any(|ancestor| ancestor == node) {
            return Err(SceneError::WouldCreateCycle { node, new_parent });
        }

        self.nodes[old_parent].children.retain(|&child| child != node);
        self.nodes[new_parent].children.push(node);
        self.nodes[node].parent = Some(new_parent);
        self.revision += 1;
        Ok(())
    }

    /// Remove a non-root node.
    ///
    /// With `reparent_descendants` the node's children take its place under
    /// its former parent; otherwise the whole subtree is removed.
    pub fn remove_node(&mut self, node: NodeId, reparent_descendants: bool) -> Result<(), SceneError> {
        let parent = self
            .require(node)?
            .parent
            .ok_or(SceneError::CannotRemoveRoot(node))?;

        if !reparent_descendants {
            self.remove_subtree(node);
            return Ok(());
        }

        let removed = self.nodes.remove(node).ok_or(SceneError::UnknownNode(node))?;
        if let Some(entity) = removed.entity {
            self.entity_nodes.remove(&entity);
        }
        for &child in &removed.children {
            self.nodes[child].parent = Some(parent);
        }
        let siblings = &mut self.nodes[parent].children;
        let position = siblings
            .iter()
            .position(|&sibling| sibling == node)
            .unwrap_or(siblings.len());
        let tail = siblings.split_off(position);
        siblings.extend(removed.children);
        siblings.extend(tail.into_iter().filter(|&sibling| sibling != node));
        self.revision += 1;
        Ok(())
    }

    /// Node bound to `entity` under `root`, or an error naming both
    pub fn find_entity_node(&self, root: NodeId, entity: Entity) -> Result<NodeId, SceneError> {
        self.try_find_entity_node(root, entity)
            .ok_or(SceneError::EntityNotFound { entity, root })
    }

    /// Breadth-first search under `root` for the node bound to `entity`
    pub fn try_find_entity_node(&self, root: NodeId, entity: Entity) -> Option<NodeId> {
        if self.nodes.get(root)?.entity == Some(entity) {
            return Some(root);
        }
        self.descendants(root)
            .find(|&id| self.nodes[id].entity == Some(entity))
    }

    /// Node bound to `entity`, anywhere in the forest
    pub fn entity_node(&self, entity: Entity) -> Option<NodeId> {
        self.entity_nodes.get(&entity).copied()
    }

    /// Root of the tree containing the node bound to `entity`
    pub fn find_entity_root(&self, entity: Entity) -> Option<NodeId> {
        self.root_of(self.entity_node(entity)?)
    }

    /// Root of the tree containing `node`
    pub fn root_of(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node)?;
        self.ancestors(node).last()
    }

    /// `node` followed by each of its ancestors up to the root
    fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(node), |&id| self.nodes.get(id).and_then(|n| n.parent))
    }

    /// Breadth-first walk of everything below `node`, excluding `node`
    pub fn descendants(&self, node: NodeId) -> Descendants<'_> {
        let queue = self
            .nodes
            .get(node)
            .map(|n| n.children.iter().copied().collect())
            .unwrap_or_default();
        Descendants { graph: self, queue }
    }

    /// Entities bound below `node`, breadth-first
    pub fn descendant_entities(&self, node: NodeId) -> impl Iterator<Item = Entity> + '_ {
        self.descendants(node)
            .filter_map(|id| self.nodes[id].entity)
    }

    fn remove_subtree(&mut self, node: NodeId) {
        let doomed: Vec<NodeId> = std::iter::once(node).chain(self.descendants(node)).collect();
        if let Some(parent) = self.nodes.get(node).and_then(|n| n.parent) {
            self.nodes[parent].children.retain(|&child| child != node);
        }
        for id in doomed {
            if let Some(entity) = self.nodes.remove(id).and_then(|n| n.entity) {
                self.entity_nodes.remove(&entity);
            }
        }
        self.revision += 1;
    }
}

/// Breadth-first iterator returned by [`SceneGraph::descendants`]
pub struct Descendants<'g> {
    graph: &'g SceneGraph,
    queue: VecDeque<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.queue.pop_front()?;
        if let Some(node) = self.graph.nodes.get(id) {
            self.queue.extend(node.children.iter().copied());
        }
        Some(id)
    }
}
