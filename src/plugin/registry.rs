//! Plugin registry
//!
//! Owns every registration and answers "which plugins run in this phase, for
//! this context, in which order". Ordering is resolved in two stages: the
//! enabled plugins of a phase are sorted once per cache generation, then each
//! call filters that list by applicability without reordering it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::plugin::fallback::FallbackOptions;
use crate::plugin::{Phase, PhaseContext, Plugin, PluginGroup, builtin_groups};

/// Settings used when seeding the built-in plugins
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuiltinSettings {
    pub fallback: FallbackOptions,
}

struct Registration {
    plugin: Arc<Plugin>,
    group: Option<String>,
    enabled: bool,
    registered_at: DateTime<Utc>,
    /// Registration order, used to keep equal priorities stable
    seq: u64,
}

/// Public view of one registration
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationInfo {
    pub name: String,
    pub phase: Phase,
    pub priority: i32,
    pub group: Option<String>,
    pub enabled: bool,
    pub registered_at: DateTime<Utc>,
}

#[derive(Default)]
struct RegistryState {
    registrations: HashMap<String, Registration>,
    /// Sorted enabled plugins per phase; dropped on every mutation
    phase_cache: HashMap<Phase, Vec<Arc<Plugin>>>,
    next_seq: u64,
    /// Bumped on every mutation
    generation: u64,
}

impl RegistryState {
    fn invalidate(&mut self) {
        self.phase_cache.clear();
        self.generation += 1;
    }

    fn insert(&mut self, plugin: Plugin, group: Option<&str>) -> bool {
        if self.registrations.contains_key(plugin.name()) {
            warn!(
                plugin = plugin.name(),
                "Plugin already registered; unregister it first to replace it"
            );
            return false;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        debug!(
            plugin = plugin.name(),
            phase = %plugin.phase(),
            priority = plugin.priority(),
            group,
            "Registered plugin"
        );
        self.registrations.insert(
            plugin.name().to_string(),
            Registration {
                plugin: Arc::new(plugin),
                group: group.map(str::to_string),
                enabled: true,
                registered_at: Utc::now(),
                seq,
            },
        );
        self.invalidate();
        true
    }

    fn insert_group(&mut self, group: PluginGroup) -> usize {
        let PluginGroup { name, plugins } = group;
        plugins
            .into_iter()
            .map(|plugin| self.insert(plugin, Some(&name)))
            .filter(|registered| *registered)
            .count()
    }
}

/// Registry of pipeline plugins
#[derive(Default)]
pub struct PluginRegistry {
    state: Mutex<RegistryState>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.len())
            .finish()
    }
}

impl PluginRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry seeded with the built-in plugins
    pub fn with_defaults(settings: &BuiltinSettings) -> Self {
        let registry = Self::new();
        for group in builtin_groups(settings) {
            registry.register_group(group);
        }
        registry
    }

    /// Register `plugin`, optionally as a member of `group`
    ///
    /// Returns false, leaving the existing registration in place, when the
    /// name is taken.
    pub fn register(&self, plugin: Plugin, group: Option<&str>) -> bool {
        self.state.lock().insert(plugin, group)
    }

    /// Register every plugin of `group`; returns how many were accepted
    pub fn register_group(&self, group: PluginGroup) -> usize {
        self.state.lock().insert_group(group)
    }

    pub fn unregister(&self, name: &str) -> bool {
        let mut state = self.state.lock();
        let removed = state.registrations.remove(name).is_some();
        if removed {
            state.invalidate();
            debug!(plugin = name, "Unregistered plugin");
        }
        removed
    }

    /// Remove every member of `group`; returns false if it had none
    pub fn unregister_group(&self, group: &str) -> bool {
        let mut state = self.state.lock();
        let before = state.registrations.len();
        state
            .registrations
            .retain(|_, r| r.group.as_deref() != Some(group));
        let removed = state.registrations.len() != before;
        if removed {
            state.invalidate();
        }
        removed
    }

    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        let mut state = self.state.lock();
        let Some(registration) = state.registrations.get_mut(name) else {
            return false;
        };
        registration.enabled = enabled;
        state.invalidate();
        true
    }

    pub fn set_group_enabled(&self, group: &str, enabled: bool) -> bool {
        let mut state = self.state.lock();
        let mut found = false;
        for registration in state.registrations.values_mut() {
            if registration.group.as_deref() == Some(group) {
                registration.enabled = enabled;
                found = true;
            }
        }
        if found {
            state.invalidate();
        }
        found
    }

    /// Enabled plugins of `phase`, by priority then registration order
    pub fn ordered_for_phase(&self, phase: Phase) -> Vec<Arc<Plugin>> {
        let mut state = self.state.lock();
        if let Some(cached) = state.phase_cache.get(&phase) {
            return cached.clone();
        }

        let mut entries: Vec<&Registration> = state
            .registrations
            .values()
            .filter(|r| r.enabled && r.plugin.phase() == phase)
            .collect();
        entries.sort_by_key(|r| (r.plugin.priority(), r.seq));
        let ordered: Vec<Arc<Plugin>> = entries.into_iter().map(|r| r.plugin.clone()).collect();

        state.phase_cache.insert(phase, ordered.clone());
        ordered
    }

    /// Plugins of `phase` applicable to `ctx`, in execution order
    pub fn plugins_for_phase(&self, phase: Phase, ctx: PhaseContext<'_>) -> Vec<Arc<Plugin>> {
        self.ordered_for_phase(phase)
            .into_iter()
            .filter(|plugin| plugin.is_applicable(ctx))
            .collect()
    }

    /// Every registration, sorted by name
    pub fn get_all(&self) -> Vec<RegistrationInfo> {
        let state = self.state.lock();
        let mut all: Vec<RegistrationInfo> = state
            .registrations
            .values()
            .map(|r| RegistrationInfo {
                name: r.plugin.name().to_string(),
                phase: r.plugin.phase(),
                priority: r.plugin.priority(),
                group: r.group.clone(),
                enabled: r.enabled,
                registered_at: r.registered_at,
            })
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Counter that changes whenever the registry is mutated
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }

    pub fn get(&self, name: &str) -> Option<Arc<Plugin>> {
        self.state
            .lock()
            .registrations
            .get(name)
            .map(|r| r.plugin.clone())
    }

    /// Checks if `name` is registered and enabled
    pub fn is_enabled(&self, name: &str) -> bool {
        self.state
            .lock()
            .registrations
            .get(name)
            .is_some_and(|r| r.enabled)
    }

    pub fn len(&self) -> usize {
        self.state.lock().registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every plugin, built-ins included
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.registrations.clear();
        state.invalidate();
    }

    /// Drop everything and re-seed the built-in plugins
    ///
    /// Readers never observe the registry in between.
    pub fn reset_to_defaults(&self, settings: &BuiltinSettings) {
        let groups = builtin_groups(settings);
        let mut state = self.state.lock();
        state.registrations.clear();
        for group in groups {
            state.insert_group(group);
        }
        state.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::plugin::{FormatContext, ParseContext, PreParseOutcome};
    use crate::types::FormatOutput;

    fn noop_format(name: &str, priority: i32) -> Plugin {
        Plugin::format(
            name.to_string(),
            |output: FormatOutput, _ctx: &FormatContext| -> Result<FormatOutput> { Ok(output) },
        )
        .with_priority(priority)
    }

    fn names(plugins: &[Arc<Plugin>]) -> Vec<String> {
        plugins.iter().map(|p| p.name().to_string()).collect()
    }

    #[test]
    fn test_priority_order() {
        let registry = PluginRegistry::new();
        registry.register(noop_format("c", 300), None);
        registry.register(noop_format("a", 100), None);
        registry.register(noop_format("b", 200), None);

        let ordered = registry.ordered_for_phase(Phase::Format);
        assert_eq!(names(&ordered), ["a", "b", "c"]);
    }

    #[test]
    fn test_equal_priority_keeps_registration_order() {
        let registry = PluginRegistry::new();
        for name in ["z", "m", "a", "q"] {
            registry.register(noop_format(name, 100), None);
        }
        for _ in 0..3 {
            let ordered = registry.ordered_for_phase(Phase::Format);
            assert_eq!(names(&ordered), ["z", "m", "a", "q"]);
            registry.set_enabled("m", true);
        }
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let registry = PluginRegistry::new();
        assert!(registry.register(noop_format("dup", 1), None));
        assert!(!registry.register(noop_format("dup", 2), None));
        assert_eq!(registry.get("dup").map(|p| p.priority()), Some(1));
    }

    #[test]
    fn test_enable_and_groups() {
        let registry = PluginRegistry::new();
        let added = registry.register_group(PluginGroup::new(
            "g",
            vec![noop_format("one", 1), noop_format("two", 2)],
        ));
        assert_eq!(added, 2);

        assert!(registry.set_enabled("one", false));
        assert_eq!(names(&registry.ordered_for_phase(Phase::Format)), ["two"]);
        assert!(!registry.is_enabled("one"));

        assert!(registry.set_group_enabled("g", false));
        assert!(registry.ordered_for_phase(Phase::Format).is_empty());

        assert!(registry.unregister_group("g"));
        assert!(registry.is_empty());
        assert!(!registry.unregister_group("g"));
        assert!(!registry.set_enabled("one", true));
    }

    #[test]
    fn test_phase_filtering() {
        let registry = PluginRegistry::new();
        registry.register(noop_format("fmt", 1), None);
        registry.register(
            Plugin::pre_parse("pp", |input: String, _ctx: &ParseContext| {
                PreParseOutcome::Continue(input)
            }),
            None,
        );
        assert_eq!(names(&registry.ordered_for_phase(Phase::PreParse)), ["pp"]);
        assert_eq!(registry.get_all().len(), 2);
    }

    #[test]
    fn test_clear_and_reset() {
        let settings = BuiltinSettings::default();
        let registry = PluginRegistry::with_defaults(&settings);
        let builtin_count = registry.len();
        assert!(builtin_count > 0);
        assert!(registry.is_enabled("validator"));

        registry.clear();
        assert!(registry.is_empty());

        registry.reset_to_defaults(&settings);
        assert_eq!(registry.len(), builtin_count);
    }

    #[test]
    fn test_reset_is_never_observed_empty() {
        let settings = BuiltinSettings::default();
        let registry = PluginRegistry::with_defaults(&settings);
        let builtin_count = registry.len();
        let done = std::sync::atomic::AtomicBool::new(false);

        std::thread::scope(|scope| {
            let reader = scope.spawn(|| {
                let mut smallest = usize::MAX;
                loop {
                    smallest = smallest.min(registry.len());
                    if done.load(std::sync::atomic::Ordering::Relaxed) {
                        return smallest;
                    }
                }
            });
            for _ in 0..200 {
                registry.reset_to_defaults(&settings);
            }
            done.store(true, std::sync::atomic::Ordering::Relaxed);
            assert_eq!(reader.join().unwrap(), builtin_count);
        });
    }
}
