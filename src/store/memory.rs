use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use super::{CaseStore, CaseUpdate, StoreError};
use crate::models::CaseReport;

/// Process-local case store for local runs and tests.
#[derive(Default)]
pub struct MemoryCaseStore {
    users: RwLock<HashMap<String, BTreeMap<String, CaseReport>>>,
}

impl MemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("memory store lock poisoned".into())
}

impl CaseStore for MemoryCaseStore {
    fn save_case(&self, uid: &str, report: &CaseReport) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        users
            .entry(uid.to_string())
            .or_default()
            .insert(report.case_id.clone(), report.clone());
        Ok(())
    }

    fn update_case(&self, uid: &str, case_id: &str, update: &CaseUpdate) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        let report = users
            .get_mut(uid)
            .and_then(|cases| cases.get_mut(case_id))
            .ok_or_else(|| StoreError::NotFound(case_id.to_string()))?;
        update.apply(report);
        Ok(())
    }

    fn list_cases(&self, uid: &str) -> Result<Vec<CaseReport>, StoreError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users
            .get(uid)
            .map(|cases| cases.values().cloned().collect())
            .unwrap_or_default())
    }

    fn get_case(&self, uid: &str, case_id: &str) -> Result<Option<CaseReport>, StoreError> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.get(uid).and_then(|cases| cases.get(case_id)).cloned())
    }
}
