use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::element::LocatorStrategy;

/// A single named object: an ordered list of candidate locators tried in
/// the order given, independent of the usual ID→NAME→CSS→XPATH priority.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TestObject {
    pub locators: Vec<(LocatorStrategy, String)>,
}

/// Optional collaborator: mapping from logical name to a [`TestObject`].
/// When attached to the player engine, events referencing an `objectName`
/// have their element field populated at dispatch time if it was empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ObjectRepository {
    objects: HashMap<String, TestObject>,
}

impl ObjectRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, object: TestObject) {
        self.objects.insert(name.into(), object);
    }

    pub fn get(&self, name: &str) -> Option<&TestObject> {
        self.objects.get(name)
    }
}
