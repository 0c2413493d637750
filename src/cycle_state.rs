use std::{any::Any, collections::HashMap};

/// Blackboard shared by the plugins of one scheduling session. Plugins are
/// stateless singletons; whatever they learn during a cycle lives here.
#[derive(Default)]
pub struct CycleState {
    storage: HashMap<String, Box<dyn Any + Send>>,
}

impl CycleState {
    pub fn read<T: 'static>(&self, key: &str) -> Option<&T> {
        self.storage.get(key)?.downcast_ref()
    }

    pub fn read_mut<T: 'static>(&mut self, key: &str) -> Option<&mut T> {
        self.storage.get_mut(key)?.downcast_mut()
    }

    pub fn write(&mut self, key: &str, value: Box<dyn Any + Send>) {
        self.storage.insert(key.to_string(), value);
    }
}
