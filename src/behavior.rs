use crate::tilemap::{Property, PropertyValue};
use anyhow::{anyhow, Result};
use bevy_ecs::prelude::{Component, Entity};
use std::collections::HashMap;

/// Per-tree-instance key/value store parameterizing tree nodes. Entries keep
/// their seeding order; `set` removes any same-named entry and appends, so
/// forced entries land last and override authored properties.
#[derive(Debug, Clone, Default)]
pub struct Blackboard {
    entries: Vec<(String, PropertyValue)>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a blackboard from an object's property bag, values copied
    /// verbatim. Object references stay raw authoring identifiers and resolve
    /// on use through the world's authoring index.
    pub fn from_properties(properties: &[Property]) -> Self {
        let mut blackboard = Self::new();
        for property in properties {
            blackboard.set(&property.name, property.value.clone());
        }
        blackboard
    }

    pub fn set(&mut self, name: &str, value: PropertyValue) {
        self.entries.retain(|(existing, _)| existing != name);
        self.entries.push((name.to_string(), value));
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.entries.iter().find(|(existing, _)| existing == name).map(|(_, value)| value)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(PropertyValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(PropertyValue::String(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn entries(&self) -> &[(String, PropertyValue)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Success,
    Failure,
    Running,
}

/// A behavior-tree node. Execution semantics beyond ticking belong to the AI
/// collaborator; the pipeline only builds trees and hands them their
/// blackboard. Nodes that need the owning entity receive it at construction
/// through their factory, so no runtime type inspection is involved.
pub trait BehaviorNode: Send + Sync {
    fn tick(&mut self, blackboard: &mut Blackboard) -> NodeStatus;
}

/// A built tree instance, owned by its entity together with the blackboard.
pub struct BehaviorTree {
    root: Box<dyn BehaviorNode>,
    pub blackboard: Blackboard,
}

impl BehaviorTree {
    pub fn new(root: Box<dyn BehaviorNode>, blackboard: Blackboard) -> Self {
        Self { root, blackboard }
    }

    pub fn tick(&mut self) -> NodeStatus {
        self.root.tick(&mut self.blackboard)
    }
}

#[derive(Component)]
pub struct Behavior {
    pub tree: BehaviorTree,
}

type TreeFactory = Box<dyn Fn(Entity, &Blackboard) -> Result<Box<dyn BehaviorNode>> + Send + Sync>;

/// Registry of tree factories keyed by the object type string. Factories are
/// registered statically before any map opens; instantiation failures are the
/// caller's to log and survive.
#[derive(Default)]
pub struct BehaviorRegistry {
    factories: HashMap<String, TreeFactory>,
}

impl BehaviorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, type_name: &str, factory: F)
    where
        F: Fn(Entity, &Blackboard) -> Result<Box<dyn BehaviorNode>> + Send + Sync + 'static,
    {
        self.factories.insert(type_name.to_string(), Box::new(factory));
    }

    pub fn exists(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    pub fn instantiate(
        &self,
        type_name: &str,
        blackboard: Blackboard,
        entity: Entity,
    ) -> Result<BehaviorTree> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| anyhow!("No behavior tree registered for type '{type_name}'"))?;
        let root = factory(entity, &blackboard)?;
        Ok(BehaviorTree::new(root, blackboard))
    }
}

// ---------- Stock nodes ----------

/// Ticks children in order; fails on the first failing child.
pub struct Sequence {
    children: Vec<Box<dyn BehaviorNode>>,
}

impl Sequence {
    pub fn new(children: Vec<Box<dyn BehaviorNode>>) -> Self {
        Self { children }
    }
}

impl BehaviorNode for Sequence {
    fn tick(&mut self, blackboard: &mut Blackboard) -> NodeStatus {
        for child in &mut self.children {
            match child.tick(blackboard) {
                NodeStatus::Success => {}
                other => return other,
            }
        }
        NodeStatus::Success
    }
}

/// Ticks children in order; succeeds on the first succeeding child.
pub struct Selector {
    children: Vec<Box<dyn BehaviorNode>>,
}

impl Selector {
    pub fn new(children: Vec<Box<dyn BehaviorNode>>) -> Self {
        Self { children }
    }
}

impl BehaviorNode for Selector {
    fn tick(&mut self, blackboard: &mut Blackboard) -> NodeStatus {
        for child in &mut self.children {
            match child.tick(blackboard) {
                NodeStatus::Failure => {}
                other => return other,
            }
        }
        NodeStatus::Failure
    }
}

/// Succeeds when a boolean blackboard entry is set and true.
pub struct CheckFlag {
    key: String,
}

impl CheckFlag {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

impl BehaviorNode for CheckFlag {
    fn tick(&mut self, blackboard: &mut Blackboard) -> NodeStatus {
        if blackboard.get_bool(&self.key).unwrap_or(false) {
            NodeStatus::Success
        } else {
            NodeStatus::Failure
        }
    }
}

/// Writes a boolean blackboard entry and succeeds.
pub struct SetFlag {
    key: String,
    value: bool,
}

impl SetFlag {
    pub fn new(key: impl Into<String>, value: bool) -> Self {
        Self { key: key.into(), value }
    }
}

impl BehaviorNode for SetFlag {
    fn tick(&mut self, blackboard: &mut Blackboard) -> NodeStatus {
        blackboard.set(&self.key, PropertyValue::Bool(self.value));
        NodeStatus::Success
    }
}
