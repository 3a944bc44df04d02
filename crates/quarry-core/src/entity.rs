//! Entity records, attachments, and identity-map keys.

use crate::value::Value;

/// Identity-map key: entity name plus a content hash of the identifier.
///
/// Hashing the identifier instead of storing it keeps the key `Eq + Hash`
/// even though `Value` carries floats. The raw identifier stays on the
/// record itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    entity: String,
    id_hash: u64,
}

impl EntityKey {
    /// Build the key for one entity identifier.
    pub fn new(entity: impl Into<String>, id: &Value) -> Self {
        Self {
            entity: entity.into(),
            id_hash: id.content_hash(),
        }
    }

    /// Entity name this key belongs to.
    pub fn entity(&self) -> &str {
        &self.entity
    }
}

/// Lifecycle status of a managed entity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityStatus {
    /// Tracked by the persistence context
    Managed,
    /// Marked for removal in the current unit of work
    Deleted,
}

/// A named collection slot on an entity record.
///
/// Lazy attachments stay uninitialized until something forces them; eager
/// (non-lazy) attachments are queued for initialization as soon as the
/// owning record materializes.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    role: String,
    lazy: bool,
    initialized: bool,
    elements: Vec<Value>,
}

impl Attachment {
    /// Create an uninitialized attachment slot.
    pub fn new(role: impl Into<String>, lazy: bool) -> Self {
        Self {
            role: role.into(),
            lazy,
            initialized: false,
            elements: Vec::new(),
        }
    }

    /// Attach element values (does not change the initialized flag).
    #[must_use]
    pub fn with_elements(mut self, elements: Vec<Value>) -> Self {
        self.elements = elements;
        self
    }

    /// Role name of this slot.
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Does this slot load lazily?
    pub const fn is_lazy(&self) -> bool {
        self.lazy
    }

    /// Has this slot been initialized?
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Mark this slot initialized.
    pub fn mark_initialized(&mut self) {
        self.initialized = true;
    }

    /// Element values, meaningful once initialized.
    pub fn elements(&self) -> &[Value] {
        &self.elements
    }
}

/// One materialized entity: name, identifier, state values, attachments.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    entity: String,
    id: Value,
    state: Vec<Value>,
    attachments: Vec<Attachment>,
}

impl EntityRecord {
    /// Create a record with an empty state vector.
    pub fn new(entity: impl Into<String>, id: Value) -> Self {
        Self {
            entity: entity.into(),
            id,
            state: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Attach the state values.
    #[must_use]
    pub fn with_state(mut self, state: Vec<Value>) -> Self {
        self.state = state;
        self
    }

    /// Add an attachment slot.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Identity-map key for this record.
    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.entity.clone(), &self.id)
    }

    /// Entity name.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Identifier value.
    pub fn id(&self) -> &Value {
        &self.id
    }

    /// State values.
    pub fn state(&self) -> &[Value] {
        &self.state
    }

    /// Attachment slots.
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Mutable access to one attachment slot by role.
    pub fn attachment_mut(&mut self, role: &str) -> Option<&mut Attachment> {
        self.attachments.iter_mut().find(|a| a.role() == role)
    }

    /// Roles of attachments that load eagerly and are not yet initialized.
    pub fn pending_eager_roles(&self) -> Vec<String> {
        self.attachments
            .iter()
            .filter(|a| !a.is_lazy() && !a.is_initialized())
            .map(|a| a.role().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_equality_follows_identifier_content() {
        let a = EntityKey::new("Order", &Value::BigInt(10));
        let b = EntityKey::new("Order", &Value::BigInt(10));
        let c = EntityKey::new("Order", &Value::BigInt(11));
        let d = EntityKey::new("Invoice", &Value::BigInt(10));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn record_key_round_trip() {
        let record = EntityRecord::new("Order", Value::BigInt(5));
        assert_eq!(record.key(), EntityKey::new("Order", &Value::BigInt(5)));
        assert_eq!(record.entity(), "Order");
    }

    #[test]
    fn pending_eager_roles_skip_lazy_and_initialized() {
        let mut record = EntityRecord::new("Order", Value::BigInt(1))
            .with_attachment(Attachment::new("lines", false))
            .with_attachment(Attachment::new("notes", true))
            .with_attachment(Attachment::new("tags", false));

        record.attachment_mut("tags").unwrap().mark_initialized();
        assert_eq!(record.pending_eager_roles(), vec!["lines".to_string()]);
    }

    #[test]
    fn attachment_initialization() {
        let mut attachment =
            Attachment::new("lines", false).with_elements(vec![Value::Int(1), Value::Int(2)]);
        assert!(!attachment.is_initialized());
        attachment.mark_initialized();
        assert!(attachment.is_initialized());
        assert_eq!(attachment.elements().len(), 2);
    }
}
