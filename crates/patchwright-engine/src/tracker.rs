//! Tracking of item stacks held inside container-like objects.
//!
//! Containers are not reachable through the template or world registries,
//! so the host registers each one as it is constructed. The tracker only
//! stores [`ContainerId`]s; it never owns a container. Liveness is asked of
//! the host on every enumeration, and containers the host reports dead are
//! dropped at that point.

use std::collections::BTreeSet;

use tracing::debug;

use crate::host::{ContainerId, HostRegistry};
use crate::model::ItemStack;

/// Position of one stack inside a tracked container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackRef {
    pub container: ContainerId,
    pub slot: usize,
}

/// Registry of containers whose stacks the engine patches.
#[derive(Debug, Default)]
pub struct LiveInstanceTracker {
    containers: Vec<ContainerId>,
}

impl LiveInstanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `container`. Registering twice is a no-op.
    pub fn register_container(&mut self, container: ContainerId) {
        if !self.containers.contains(&container) {
            self.containers.push(container);
        }
    }

    /// Stop tracking `container`, for hosts that report destruction eagerly.
    pub fn unregister_container(&mut self, container: ContainerId) {
        self.containers.retain(|&c| c != container);
    }

    /// Number of registered containers, dead or alive.
    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Forget every container the host no longer reports alive.
    pub fn prune<H: HostRegistry + ?Sized>(&mut self, host: &H) {
        let before = self.containers.len();
        self.containers.retain(|&c| host.container_alive(c));
        let pruned = before - self.containers.len();
        if pruned > 0 {
            debug!(pruned, "dropped dead containers");
        }
    }

    /// Every stack in every live container.
    pub fn all_tracked_stacks<H: HostRegistry + ?Sized>(&mut self, host: &H) -> Vec<StackRef> {
        self.prune(host);
        self.containers
            .iter()
            .flat_map(|&container| {
                let len = host.container_stacks(container).map_or(0, <[ItemStack]>::len);
                (0..len).map(move |slot| StackRef { container, slot })
            })
            .collect()
    }

    /// Visit every stack in every live container.
    pub fn for_each_stack_mut<H, F>(&mut self, host: &mut H, mut f: F)
    where
        H: HostRegistry + ?Sized,
        F: FnMut(&mut ItemStack),
    {
        self.prune(&*host);
        for &container in &self.containers {
            if let Some(stacks) = host.container_stacks_mut(container) {
                stacks.iter_mut().for_each(&mut f);
            }
        }
    }

    /// Remove every stack whose drop template is in `templates`. Returns
    /// how many stacks were removed.
    pub fn remove_stacks_matching<H: HostRegistry + ?Sized>(
        &mut self,
        host: &mut H,
        templates: &BTreeSet<String>,
    ) -> usize {
        if templates.is_empty() {
            return 0;
        }
        self.prune(&*host);
        let mut removed = 0;
        for &container in &self.containers {
            if let Some(stacks) = host.container_stacks_mut(container) {
                let before = stacks.len();
                stacks.retain(|stack| {
                    stack
                        .drop_template
                        .as_ref()
                        .map_or(true, |t| !templates.contains(t))
                });
                removed += before - stacks.len();
            }
        }
        removed
    }
}
