//! Systems and the runner that ticks them

use std::error::Error;

use super::EcsError;
use crate::resources::{FromResources, LazyCollection, Resource, ResourceGroup, ResourceSet};

/// Error type returned by [`System::update`]
pub type SystemError = Box<dyn Error + Send + Sync>;

/// Per-tick game logic.
///
/// Register the implementing resource in [`ResourceGroup::ECSSystem`] and
/// expose it with `capabilities.provide::<dyn System>(|this| this)`.
pub trait System: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Advance by `delta_time` seconds
    fn update(&self, delta_time: f32) -> Result<(), SystemError>;
}

/// Updates every registered [`System`] in registration order
pub struct SystemRunner {
    systems: LazyCollection<dyn System>,
}

impl Resource for SystemRunner {
    const GROUP: ResourceGroup = ResourceGroup::ECSManager;
}

impl FromResources for SystemRunner {
    fn from_resources(resources: &ResourceSet) -> Self {
        Self {
            systems: resources.get_lazy_all(),
        }
    }
}

impl SystemRunner {
    /// Number of systems driven by this runner
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Whether no system is registered
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Update every system, stopping at the first failure
    pub fn update(&self, delta_time: f32) -> Result<(), EcsError> {
        for system in self.systems.iter() {
            system
                .update(delta_time)
                .map_err(|source| EcsError::SystemFailed {
                    system: system.name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Capabilities;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Counter {
        ticks: Mutex<Vec<f32>>,
    }

    impl Resource for Counter {
        const GROUP: ResourceGroup = ResourceGroup::ECSSystem;

        fn register_capabilities(capabilities: &mut Capabilities<'_, Self>) {
            capabilities.provide::<dyn System>(|this| this);
        }
    }

    impl System for Counter {
        fn update(&self, delta_time: f32) -> Result<(), SystemError> {
            self.ticks.lock().push(delta_time);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Broken;

    impl Resource for Broken {
        const GROUP: ResourceGroup = ResourceGroup::ECSSystem;

        fn register_capabilities(capabilities: &mut Capabilities<'_, Self>) {
            capabilities.provide::<dyn System>(|this| this);
        }
    }

    impl System for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn update(&self, _delta_time: f32) -> Result<(), SystemError> {
            Err("out of fuel".into())
        }
    }

    #[test]
    fn test_runner_updates_registered_systems() {
        let resources = ResourceSet::new();
        let runner = resources.add::<SystemRunner>().unwrap();
        let counter = resources.add::<Counter>().unwrap();

        runner.update(0.5).unwrap();
        runner.update(0.25).unwrap();
        assert_eq!(runner.len(), 1);
        assert_eq!(*counter.ticks.lock(), vec![0.5, 0.25]);
    }

    #[test]
    fn test_runner_reports_failing_system() {
        let resources = ResourceSet::new();
        let runner = resources.add::<SystemRunner>().unwrap();
        resources.add::<Broken>().unwrap();

        let error = runner.update(0.1).unwrap_err();
        assert_eq!(error.to_string(), "System `broken` failed");
    }
}
