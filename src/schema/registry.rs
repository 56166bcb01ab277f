//! Registry of compiled resource schemas

use std::collections::BTreeMap;

use tracing::debug;

use super::{builtin_definitions, ListSchema, ObjectSchema, ResourceKind, ResourceSchema};
use crate::error::RegistryError;

/// Immutable set of compiled schemas, one per resource kind.
///
/// Built once at startup and shared by reference; lookups never mutate it.
/// An unregistered kind is a harness defect, reported as
/// [`RegistryError::UnknownKind`] and never as a scenario failure.
#[derive(Debug)]
pub struct SchemaRegistry {
    schemas: BTreeMap<ResourceKind, ResourceSchema>,
}

impl SchemaRegistry {
    /// Compile every built-in resource declaration.
    pub fn builtin() -> Result<Self, RegistryError> {
        Self::from_definitions(builtin_definitions())
    }

    pub fn from_definitions(
        definitions: impl IntoIterator<Item = (ResourceKind, ObjectSchema)>,
    ) -> Result<Self, RegistryError> {
        let mut schemas = BTreeMap::new();
        for (kind, body) in definitions {
            if schemas.contains_key(&kind) {
                return Err(RegistryError::Duplicate(kind));
            }
            schemas.insert(kind, ResourceSchema::compile(kind, body)?);
        }
        debug!(count = schemas.len(), "Compiled resource schemas");
        Ok(Self { schemas })
    }

    pub fn schema_for(&self, kind: ResourceKind) -> Result<&ResourceSchema, RegistryError> {
        self.schemas
            .get(&kind)
            .ok_or(RegistryError::UnknownKind(kind))
    }

    /// Fresh list envelope whose items are bound to `kind`.
    pub fn list_schema_for(&self, kind: ResourceKind) -> Result<ListSchema, RegistryError> {
        ListSchema::of(self.schema_for(kind)?)
    }

    pub fn kinds(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.schemas.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Contract, FieldSpec, FieldType};

    #[test]
    fn builtin_registry_covers_every_kind() {
        let registry = SchemaRegistry::builtin().unwrap();
        let kinds: Vec<_> = registry.kinds().collect();
        assert_eq!(kinds, ResourceKind::ALL.to_vec());
    }

    #[test]
    fn unknown_kind_is_a_registry_error() {
        let registry = SchemaRegistry::from_definitions(vec![(
            ResourceKind::MetricName,
            ObjectSchema::new(vec![FieldSpec::required("name", FieldType::String)]),
        )])
        .unwrap();

        let err = registry.schema_for(ResourceKind::Alarm).unwrap_err();
        assert!(matches!(err, RegistryError::UnknownKind(ResourceKind::Alarm)));
        assert!(registry.list_schema_for(ResourceKind::Alarm).is_err());
    }

    #[test]
    fn duplicate_kind_is_rejected() {
        let body = ObjectSchema::new(vec![FieldSpec::required("name", FieldType::String)]);
        let err = SchemaRegistry::from_definitions(vec![
            (ResourceKind::MetricName, body.clone()),
            (ResourceKind::MetricName, body),
        ])
        .unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(ResourceKind::MetricName)));
    }

    #[test]
    fn list_schemas_are_independent_per_call() {
        let registry = SchemaRegistry::builtin().unwrap();
        let alarms = registry.list_schema_for(ResourceKind::Alarm).unwrap();
        let metrics = registry.list_schema_for(ResourceKind::Metric).unwrap();

        assert_eq!(alarms.item_kind(), ResourceKind::Alarm);
        assert_eq!(metrics.item_kind(), ResourceKind::Metric);
        assert_ne!(
            alarms.document()["properties"]["elements"],
            metrics.document()["properties"]["elements"]
        );
    }
}
