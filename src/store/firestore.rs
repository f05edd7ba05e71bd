use serde_json::{Map, Value};

use super::{CaseStore, CaseUpdate, StoreError};
use crate::firebase::firestore::StoredDocument;
use crate::firebase::FirestoreClient;
use crate::models::CaseReport;

const USERS_COLLECTION: &str = "users";
const CASES_COLLECTION: &str = "cases";

/// Cases stored at `users/{uid}/cases/{case_id}`.
pub struct FirestoreCaseStore {
    client: FirestoreClient,
}

impl FirestoreCaseStore {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }
}

fn case_path<'a>(uid: &'a str, case_id: &'a str) -> [&'a str; 4] {
    [USERS_COLLECTION, uid, CASES_COLLECTION, case_id]
}

fn report_fields(report: &CaseReport) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(report)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::Backend(format!(
            "report serialized to non-object {other}"
        ))),
    }
}

fn report_from_document(doc: StoredDocument) -> Result<CaseReport, StoreError> {
    let mut fields = doc.fields;
    // Documents written by other tools may omit the id field
    fields
        .entry("case_id")
        .or_insert_with(|| Value::String(doc.id.clone()));
    Ok(serde_json::from_value(Value::Object(fields))?)
}

impl CaseStore for FirestoreCaseStore {
    fn save_case(&self, uid: &str, report: &CaseReport) -> Result<(), StoreError> {
        let fields = report_fields(report)?;
        self.client
            .set_document(&case_path(uid, &report.case_id), &fields)?;
        tracing::info!(case_id = %report.case_id, "Case saved to Firestore");
        Ok(())
    }

    fn update_case(&self, uid: &str, case_id: &str, update: &CaseUpdate) -> Result<(), StoreError> {
        let (name, value) = update.field()?;
        let mut fields = Map::new();
        fields.insert(name.to_string(), value);
        self.client
            .update_fields(&case_path(uid, case_id), &fields)
            .map_err(|e| match StoreError::from(e) {
                StoreError::NotFound(_) => StoreError::NotFound(case_id.to_string()),
                other => other,
            })?;
        tracing::debug!(case_id = %case_id, field = name, "Case field updated");
        Ok(())
    }

    fn list_cases(&self, uid: &str) -> Result<Vec<CaseReport>, StoreError> {
        let docs = self
            .client
            .list_documents(&[USERS_COLLECTION, uid, CASES_COLLECTION])?;
        let mut reports = Vec::with_capacity(docs.len());
        for doc in docs {
            let id = doc.id.clone();
            match report_from_document(doc) {
                Ok(report) => reports.push(report),
                Err(e) => tracing::warn!(case_id = %id, "Skipping unreadable stored case: {e}"),
            }
        }
        reports.sort_by(|a, b| a.case_id.cmp(&b.case_id));
        Ok(reports)
    }

    fn get_case(&self, uid: &str, case_id: &str) -> Result<Option<CaseReport>, StoreError> {
        self.client
            .get_document(&case_path(uid, case_id))?
            .map(report_from_document)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firebase::firestore::{decode_fields, encode_fields};

    #[test]
    fn report_survives_firestore_encoding() {
        let mut report = CaseReport::sample("HC-5");
        report.perspectives.medical_team.justice = 0;
        report.charts = crate::charts::build_charts(&report.perspectives);

        let encoded = encode_fields(&report_fields(&report).unwrap());
        let decoded = decode_fields(Some(&encoded)).unwrap();
        let restored = report_from_document(StoredDocument {
            id: "HC-5".into(),
            fields: decoded,
        })
        .unwrap();
        assert_eq!(restored, report);
    }

    #[test]
    fn missing_case_id_falls_back_to_document_id() {
        let mut fields = report_fields(&CaseReport::sample("ignored")).unwrap();
        fields.remove("case_id");
        let restored = report_from_document(StoredDocument {
            id: "HC-77".into(),
            fields,
        })
        .unwrap();
        assert_eq!(restored.case_id, "HC-77");
    }

    #[test]
    fn case_path_layout() {
        assert_eq!(case_path("u1", "HC-1"), ["users", "u1", "cases", "HC-1"]);
    }
}
