//! An in-memory, failure-injectable [`ConfigStore`] fake for exercising the
//! lifecycle controller's duplicate-check and rollback paths without
//! touching a filesystem.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::store::ConfigStore;

#[derive(Debug, Clone, Default)]
struct Injected {
    fail_list: bool,
    fail_add: bool,
    fail_remove: bool,
}

pub struct InMemoryConfigStore {
    endpoints: Mutex<Vec<String>>,
    injected: Mutex<Injected>,
    add_calls: Mutex<Vec<String>>,
    remove_calls: Mutex<Vec<String>>,
}

impl InMemoryConfigStore {
    pub fn new(initial: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            endpoints: Mutex::new(initial.into_iter().map(Into::into).collect()),
            injected: Mutex::new(Injected::default()),
            add_calls: Mutex::new(Vec::new()),
            remove_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::<String>::new())
    }

    pub fn fail_next_list(&self) {
        self.injected.lock().unwrap().fail_list = true;
    }

    pub fn fail_next_add(&self) {
        self.injected.lock().unwrap().fail_add = true;
    }

    pub fn fail_next_remove(&self) {
        self.injected.lock().unwrap().fail_remove = true;
    }

    pub fn add_calls(&self) -> Vec<String> {
        self.add_calls.lock().unwrap().clone()
    }

    pub fn remove_calls(&self) -> Vec<String> {
        self.remove_calls.lock().unwrap().clone()
    }

    pub fn contains(&self, endpoint: &str) -> bool {
        self.endpoints.lock().unwrap().iter().any(|e| e == endpoint)
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn list_endpoints(&self) -> Result<Vec<String>, String> {
        if std::mem::take(&mut self.injected.lock().unwrap().fail_list) {
            return Err("injected list_endpoints failure".to_string());
        }
        Ok(self.endpoints.lock().unwrap().clone())
    }

    async fn add_endpoint(&self, endpoint: &str) -> Result<(), String> {
        self.add_calls.lock().unwrap().push(endpoint.to_string());
        if std::mem::take(&mut self.injected.lock().unwrap().fail_add) {
            return Err("injected add_endpoint failure".to_string());
        }
        let mut endpoints = self.endpoints.lock().unwrap();
        if !endpoints.iter().any(|e| e == endpoint) {
            endpoints.push(endpoint.to_string());
        }
        Ok(())
    }

    async fn remove_endpoint(&self, endpoint: &str) -> Result<(), String> {
        self.remove_calls.lock().unwrap().push(endpoint.to_string());
        if std::mem::take(&mut self.injected.lock().unwrap().fail_remove) {
            return Err("injected remove_endpoint failure".to_string());
        }
        self.endpoints.lock().unwrap().retain(|e| e != endpoint);
        Ok(())
    }
}
