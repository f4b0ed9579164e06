use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{WfError, WfResult};
use crate::token::TokenId;

/// Index of an entity in an [`EntityStore`]. Entity 0 is the global entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub usize);

impl EntityId {
    /// The entity that holds world-global settings.
    pub const GLOBAL: EntityId = EntityId(0);

    /// The raw index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of a property in an [`EntityStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyId(pub usize);

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where content added to an entity at runtime is placed in the token layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// Appended at the end of the file (the global entity).
    EndOfFile,
    /// Inserted before this token, normally the entity's closing `)`.
    Before(TokenId),
    /// The entity has no body of its own in the file (it came from a macro
    /// body); new tokens are kept in memory only.
    Detached,
}

/// One node of the entity forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Parent entity, `None` for roots.
    pub parent: Option<EntityId>,
    /// Base type such as `position` or `laser`.
    pub base_type: String,
    /// Macro name the entity was instantiated through, else the base type.
    pub immediate_type: String,
    /// Line of the entity statement (0 for entities created at runtime).
    pub line: usize,
    /// Insertion point for runtime-added properties.
    pub anchor: Anchor,
}

/// A named, possibly tuple-valued attribute of one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Entity the property belongs to.
    pub owner: EntityId,
    /// Property name.
    pub name: String,
    /// Value tokens by tuple index. `None` marks a slot that was never set.
    pub values: Vec<Option<TokenId>>,
    /// Line of the definition currently in effect.
    pub line: usize,
    /// Set the first time a typed read retrieves the property.
    pub used: bool,
    /// The current values live in a macro body shared by every instance.
    pub inherited: bool,
    /// The `[` and `]` tokens, when the property was written as a tuple.
    pub brackets: Option<(TokenId, TokenId)>,
    /// The token holding the property name.
    pub name_token: Option<TokenId>,
}

impl Property {
    /// Token of the value at `index`, if set.
    pub fn value(&self, index: usize) -> Option<TokenId> {
        self.values.get(index).copied().flatten()
    }

    /// Last value token that is set, used as an insertion point.
    pub fn last_value(&self) -> Option<TokenId> {
        self.values.iter().rev().find_map(|v| *v)
    }
}

/// Index-addressed entity forest plus a flat property table.
///
/// Properties are unique per `(entity, name)`: defining a name again reuses the
/// existing entry and replaces its values, so the last definition wins.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityStore {
    entities: Vec<Entity>,
    properties: Vec<Property>,
    #[serde(skip)]
    by_name: HashMap<(EntityId, String), PropertyId>,
}

impl EntityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove all entities and properties.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.properties.clear();
        self.by_name.clear();
    }

    // -----------------------------------------------------------------------
    // Entities
    // -----------------------------------------------------------------------

    /// Append an entity. The parent, if any, must already exist.
    pub fn create_entity(
        &mut self,
        parent: Option<EntityId>,
        base_type: impl Into<String>,
        immediate_type: impl Into<String>,
    ) -> WfResult<EntityId> {
        if let Some(p) = parent.filter(|p| p.0 >= self.entities.len()) {
            return Err(WfError::InvalidParent {
                parent: p,
                count: self.entities.len(),
            });
        }
        let id = EntityId(self.entities.len());
        self.entities.push(Entity {
            parent,
            base_type: base_type.into(),
            immediate_type: immediate_type.into(),
            line: 0,
            anchor: Anchor::Detached,
        });
        Ok(id)
    }

    /// Get an entity.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id.0)
    }

    /// Get an entity mutably.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id.0)
    }

    /// Number of entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// All entities in creation order.
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> + '_ {
        self.entities.iter().enumerate().map(|(i, e)| (EntityId(i), e))
    }

    /// Parent of an entity. `None` for roots and unknown ids.
    pub fn parent_of(&self, id: EntityId) -> Option<EntityId> {
        self.entity(id).and_then(|e| e.parent)
    }

    /// Base type of an entity.
    pub fn base_type(&self, id: EntityId) -> Option<&str> {
        self.entity(id).map(|e| e.base_type.as_str())
    }

    /// Immediate (possibly macro) type of an entity.
    pub fn immediate_type(&self, id: EntityId) -> Option<&str> {
        self.entity(id).map(|e| e.immediate_type.as_str())
    }

    /// First entity whose base type is `base_type`.
    pub fn lookup_entity(&self, base_type: &str) -> Option<EntityId> {
        self.entities
            .iter()
            .position(|e| e.base_type == base_type)
            .map(EntityId)
    }

    /// Children of `parent` in creation order. `None` yields the roots.
    pub fn children_of(&self, parent: Option<EntityId>) -> impl Iterator<Item = EntityId> + '_ {
        self.entities()
            .filter(move |(_, e)| e.parent == parent)
            .map(|(id, _)| id)
    }

    /// The first child of `parent` created after `after` (or the first child).
    pub fn next_child(&self, parent: Option<EntityId>, after: Option<EntityId>) -> Option<EntityId> {
        let start = after.map_or(0, |a| a.0 + 1);
        (start..self.entities.len())
            .map(EntityId)
            .find(|&id| self.entities[id.0].parent == parent)
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    /// Add a property to an entity, or restart the existing one with that name.
    ///
    /// Restarting clears the values and brackets and records the new line, which
    /// is what makes the last definition in file order win.
    pub fn add_property(
        &mut self,
        owner: EntityId,
        name: &str,
        line: usize,
    ) -> WfResult<PropertyId> {
        if owner.0 >= self.entities.len() {
            return Err(WfError::EntityNotFound(owner));
        }
        if let Some(&id) = self.by_name.get(&(owner, name.to_string())) {
            let prop = &mut self.properties[id.0];
            prop.values.clear();
            prop.brackets = None;
            prop.name_token = None;
            prop.inherited = false;
            prop.line = line;
            return Ok(id);
        }
        let id = PropertyId(self.properties.len());
        self.properties.push(Property {
            owner,
            name: name.to_string(),
            values: Vec::new(),
            line,
            used: false,
            inherited: false,
            brackets: None,
            name_token: None,
        });
        self.by_name.insert((owner, name.to_string()), id);
        Ok(id)
    }

    /// Set the value token at `index`, extending the tuple with unset slots if needed.
    pub fn add_property_value(
        &mut self,
        property: PropertyId,
        index: usize,
        token: TokenId,
    ) -> WfResult<()> {
        let prop = self
            .properties
            .get_mut(property.0)
            .ok_or(WfError::PropertyNotFound(property))?;
        if index >= prop.values.len() {
            prop.values.resize(index + 1, None);
        }
        prop.values[index] = Some(token);
        Ok(())
    }

    /// Find the property `name` on `entity`.
    pub fn lookup_property(&self, entity: EntityId, name: &str) -> Option<PropertyId> {
        self.by_name.get(&(entity, name.to_string())).copied()
    }

    /// Get a property.
    pub fn property(&self, id: PropertyId) -> Option<&Property> {
        self.properties.get(id.0)
    }

    /// Get a property mutably.
    pub fn property_mut(&mut self, id: PropertyId) -> Option<&mut Property> {
        self.properties.get_mut(id.0)
    }

    /// Number of properties.
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// All properties in definition order.
    pub fn properties(&self) -> impl Iterator<Item = (PropertyId, &Property)> + '_ {
        self.properties
            .iter()
            .enumerate()
            .map(|(i, p)| (PropertyId(i), p))
    }

    /// Properties of one entity in definition order.
    pub fn properties_of(&self, entity: EntityId) -> impl Iterator<Item = (PropertyId, &Property)> + '_ {
        self.properties().filter(move |(_, p)| p.owner == entity)
    }

    /// Flag a property as read.
    pub fn mark_used(&mut self, id: PropertyId) {
        if let Some(prop) = self.properties.get_mut(id.0) {
            prop.used = true;
        }
    }

    /// Properties no typed read has retrieved yet.
    pub fn unused_properties(&self) -> impl Iterator<Item = (PropertyId, &Property)> + '_ {
        self.properties().filter(|(_, p)| !p.used)
    }
}
