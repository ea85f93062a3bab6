//! The marshalling type registry.
//!
//! Maps qualified type names to their marshalling treatment. The
//! registry is populated explicitly, typically from a linked API;
//! marshalling a type the registry has never seen is an error, never a
//! silent null.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use crossbind_api::{LinkedApi, TypeKind};

/// How a registered type crosses the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisteredType {
    /// Marshalled field by field as a tagged record.
    ByValue,
    /// Marshalled as a native handle.
    ByReference,
    /// Marshalled as the underlying integer.
    Enum(BTreeMap<String, i64>),
}

/// Qualified name to marshalling treatment.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: RwLock<HashMap<String, RegisteredType>>,
}

impl TypeRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a by-value structure type.
    pub fn register_struct(&self, type_name: impl Into<String>) {
        self.insert(type_name.into(), RegisteredType::ByValue);
    }

    /// Register a by-reference object type.
    pub fn register_reference(&self, type_name: impl Into<String>) {
        self.insert(type_name.into(), RegisteredType::ByReference);
    }

    /// Register an enum with its symbol-to-integer mapping.
    pub fn register_enum(
        &self,
        type_name: impl Into<String>,
        symbols: impl IntoIterator<Item = (String, i64)>,
    ) {
        self.insert(type_name.into(), RegisteredType::Enum(symbols.into_iter().collect()));
    }

    /// Register every type of a linked API: classes by reference,
    /// structs by value, enums with their merged integer values.
    pub fn register_linked(&self, linked: &LinkedApi) {
        for def in &linked.types {
            match def.kind {
                TypeKind::Class => self.register_reference(def.qualified_name.clone()),
                TypeKind::Struct => self.register_struct(def.qualified_name.clone()),
                TypeKind::Enum => self.register_enum(
                    def.qualified_name.clone(),
                    def.enum_values.iter().map(|v| (v.symbol.clone(), v.value)),
                ),
            }
        }
    }

    /// Look up a type's treatment.
    pub fn lookup(&self, type_name: &str) -> Option<RegisteredType> {
        let types = match self.types.read() {
            Ok(types) => types,
            Err(poisoned) => poisoned.into_inner(),
        };
        types.get(type_name).cloned()
    }

    fn insert(&self, type_name: String, registered: RegisteredType) {
        let mut types = match self.types.write() {
            Ok(types) => types,
            Err(poisoned) => poisoned.into_inner(),
        };
        types.insert(type_name, registered);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_reflects_registration() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.lookup("com.example.test.TestStruct"), None);

        registry.register_struct("com.example.test.TestStruct");
        assert_eq!(
            registry.lookup("com.example.test.TestStruct"),
            Some(RegisteredType::ByValue)
        );

        registry.register_enum("com.example.test.TestEnum", [("Zero".to_string(), 0)]);
        let Some(RegisteredType::Enum(symbols)) = registry.lookup("com.example.test.TestEnum")
        else {
            panic!("expected enum registration");
        };
        assert_eq!(symbols.get("Zero"), Some(&0));
    }
}
