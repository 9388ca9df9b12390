use std::sync::Arc;

use parking_lot::Mutex;

use super::Harness;
use crate::assets::{AssetState, RawBytes};
use crate::config::EngineConfig;
use crate::ecs::components::{MeshRenderer, RenderSource, TransformComponent};
use crate::ecs::events::{ComponentDestroyed, EntityDestroyed};
use crate::foundation::math::Vec3;

#[test]
fn test_render_list_only_sees_its_own_tree() {
    let harness = Harness::new();
    let (world, other) = {
        let mut scene = harness.scenes().write();
        (scene.add_root("world").unwrap(), scene.add_root("other").unwrap())
    };

    let camera = harness.camera("main", world);
    let (d1, d1_node) = harness.mesh("cube", 1.0, world);
    let (d2, _) = harness.mesh("cube", 2.0, d1_node);
    let (d3, _) = harness.mesh("cube", 3.0, other);
    harness.flush();

    let list = harness.render_lists().try_build_render_list("main").unwrap();
    assert_eq!(list.members().iter().copied().collect::<Vec<_>>(), vec![d1, d2]);
    assert!(!list.contains(camera));
    assert!(!list.contains(d3));
    assert_eq!(list.len(), 2);
    assert_eq!(list.drawable(d2).unwrap().model[(0, 3)], 2.0);
}

#[test]
fn test_destroyed_entities_leave_lists_and_tree() {
    let harness = Harness::new();
    let world = harness.scenes().write().add_root("world").unwrap();
    harness.camera("main", world);
    let (d1, d1_node) = harness.mesh("cube", 1.0, world);
    let (d2, _) = harness.mesh("cube", 2.0, d1_node);
    harness.flush();
    assert_eq!(harness.render_lists().try_build_render_list("main").unwrap().len(), 2);

    assert!(harness.entities().destroy_entity(d1));
    harness.flush();

    let scene = harness.scenes().read();
    assert!(scene.entity_node(d1).is_none());
    let d2_node = scene.entity_node(d2).unwrap();
    assert_eq!(scene.node(d2_node).unwrap().parent(), Some(world));
    drop(scene);

    let list = harness.render_lists().try_build_render_list("main").unwrap();
    assert!(!list.contains(d1));
    assert!(list.contains(d2));
}

#[test]
fn test_destroying_the_source_drops_its_list() {
    let harness = Harness::new();
    let world = harness.scenes().write().add_root("world").unwrap();
    let camera = harness.camera("main", world);
    harness.mesh("cube", 0.0, world);
    harness.flush();
    assert!(harness.render_lists().try_build_render_list("main").is_some());

    harness.entities().destroy_entity(camera);
    harness.flush();
    assert_eq!(harness.render_lists().source_entity("main"), None);
    assert!(harness.render_lists().try_build_render_list("main").is_none());
}

#[test]
fn test_source_outside_any_tree_has_no_list() {
    let harness = Harness::new();
    let entities = harness.entities();
    let camera = entities.create_entity().unwrap();
    entities.add_component(camera, RenderSource::new("orphan")).unwrap();
    harness.flush();

    assert_eq!(harness.render_lists().source_entity("orphan"), Some(camera));
    assert!(harness.render_lists().try_build_render_list("orphan").is_none());
}

#[test]
fn test_destroy_cascade_order() {
    let harness = Harness::new();
    let journal = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&journal);
    harness.events().add_listener(move |event: &ComponentDestroyed| {
        let name = if event.component_type.is::<TransformComponent>() {
            "transform"
        } else if event.component_type.is::<MeshRenderer>() {
            "mesh_renderer"
        } else {
            "other"
        };
        sink.lock().push(name);
    });
    let sink = Arc::clone(&journal);
    harness
        .events()
        .add_listener(move |_: &EntityDestroyed| sink.lock().push("entity"));

    let world = harness.scenes().write().add_root("world").unwrap();
    let (entity, _) = harness.mesh("cube", 0.0, world);
    harness.flush();
    journal.lock().clear();

    harness.entities().destroy_entity(entity);
    harness.flush();
    assert_eq!(*journal.lock(), vec!["transform", "mesh_renderer", "entity"]);
}

#[test]
fn test_failed_asset_only_hides_its_renderer() {
    let root = std::env::temp_dir().join(format!("framegraph-scenario-{}", std::process::id()));
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("cube.mesh"), b"cube").unwrap();

    let mut config = EngineConfig::default();
    config.assets.root = root.display().to_string();
    config.assets.dictionary.insert("cube".to_string(), "cube.mesh".to_string());
    config.assets.dictionary.insert("ghost".to_string(), "ghost.mesh".to_string());
    let harness = Harness::with_config(config);

    let assets = harness.assets();
    assets.enqueue("cube");
    assets.enqueue("ghost");
    assert!(assets.try_get_asset::<RawBytes>("ghost", true).is_none());
    assert_eq!(assets.try_get_asset::<RawBytes>("cube", true).unwrap().0, b"cube");
    assert_eq!(assets.state("ghost"), Some(AssetState::Failed));

    let world = harness.scenes().write().add_root("world").unwrap();
    harness.camera("main", world);
    let (good, _) = harness.mesh("cube", 0.0, world);
    let (broken, _) = harness.mesh("ghost", 1.0, world);
    harness.flush();

    let list = harness.render_lists().try_build_render_list("main").unwrap();
    assert!(list.contains(good) && list.contains(broken));
    assert!(list.drawable(good).is_some());
    assert!(list.drawable(broken).is_none());
    assert_eq!(list.len(), 1);
}

#[test]
fn test_reused_slot_keeps_new_entity_in_tree_and_list() {
    let harness = Harness::new();
    let world = harness.scenes().write().add_root("world").unwrap();
    harness.camera("main", world);
    let (old, _) = harness.mesh("cube", 1.0, world);
    harness.flush();

    assert!(harness.entities().destroy_entity(old));
    let (fresh, fresh_node) = harness.mesh("cube", 2.0, world);
    assert_eq!(fresh.id(), old.id());
    harness.flush();

    let scene = harness.scenes().read();
    assert!(scene.entity_node(old).is_none());
    assert_eq!(scene.entity_node(fresh), Some(fresh_node));
    assert_eq!(scene.find_entity_root(fresh), Some(world));
    drop(scene);

    let list = harness.render_lists().try_build_render_list("main").unwrap();
    assert!(list.contains(fresh));
    assert!(!list.contains(old));
    assert_eq!(list.drawable(fresh).unwrap().model[(0, 3)], 2.0);
}

#[test]
fn test_rebuild_follows_scene_edits_and_transform_changes() {
    let harness = Harness::new();
    let (world, other) = {
        let mut scene = harness.scenes().write();
        (scene.add_root("world").unwrap(), scene.add_root("other").unwrap())
    };
    harness.camera("main", world);
    let (placed, placed_node) = harness.mesh("cube", 1.0, world);

    let entities = harness.entities();
    let loose = entities.create_entity().unwrap();
    entities.add_component(loose, TransformComponent::from_position(Vec3::new(4.0, 0.0, 0.0))).unwrap();
    entities.add_component(loose, MeshRenderer::new("cube", "white")).unwrap();
    harness.flush();

    let lists = harness.render_lists();
    assert_eq!(lists.try_build_render_list("main").unwrap().len(), 1);

    // Scene edits raise no events
    harness.scenes().write().insert_entity_node(world, loose).unwrap();
    let list = lists.try_build_render_list("main").unwrap();
    assert!(list.contains(loose));
    assert_eq!(list.len(), 2);

    entities.with_component_mut(placed, |transform: &mut TransformComponent| transform.position.x = 7.0);
    let list = lists.try_build_render_list("main").unwrap();
    assert_eq!(list.drawable(placed).unwrap().model[(0, 3)], 7.0);

    harness.scenes().write().move_node(other, placed_node).unwrap();
    let list = lists.try_build_render_list("main").unwrap();
    assert!(!list.contains(placed));
    assert!(list.contains(loose));
}
