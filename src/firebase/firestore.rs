//! Firestore REST v1 document client and the JSON ⇄ typed-value codec.

use std::sync::Arc;

use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Map, Number, Value};

use super::token::AccessTokenSource;
use super::{google_error_message, http_client, transport_error, FirebaseError};

const FIRESTORE_TIMEOUT_SECS: u64 = 30;
const LIST_PAGE_SIZE: u32 = 100;

// ═══════════════════════════════════════════════════════════
// Value codec
// ═══════════════════════════════════════════════════════════

/// Encode a JSON value as a Firestore `Value`.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({"nullValue": null}),
        Value::Bool(b) => json!({"booleanValue": b}),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({"integerValue": i.to_string()})
            } else if let Some(u) = n.as_u64() {
                // Firestore integers are i64; larger values degrade to doubles
                json!({"doubleValue": u as f64})
            } else {
                json!({"doubleValue": n.as_f64().unwrap_or(0.0)})
            }
        }
        Value::String(s) => json!({"stringValue": s}),
        Value::Array(items) => {
            json!({"arrayValue": {"values": items.iter().map(encode_value).collect::<Vec<_>>()}})
        }
        Value::Object(map) => json!({"mapValue": {"fields": encode_fields(map)}}),
    }
}

/// Encode an object as a document `fields` map.
pub fn encode_fields(map: &Map<String, Value>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect(),
    )
}

/// Decode a Firestore `Value` into plain JSON.
pub fn decode_value(value: &Value) -> Result<Value, FirebaseError> {
    let obj = value
        .as_object()
        .ok_or_else(|| FirebaseError::Codec(format!("expected a typed value, got {value}")))?;
    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| FirebaseError::Codec("empty typed value".into()))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| FirebaseError::Codec(format!("bad booleanValue {inner}"))),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed
                .map(|i| Value::Number(i.into()))
                .ok_or_else(|| FirebaseError::Codec(format!("bad integerValue {inner}")))
        }
        "doubleValue" => {
            let parsed = match inner {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.parse::<f64>().ok(),
                _ => None,
            };
            // NaN and infinities have no JSON form
            Ok(parsed
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null))
        }
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| FirebaseError::Codec(format!("bad {kind} {inner}"))),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = match inner.get("values") {
                Some(Value::Array(values)) => values
                    .iter()
                    .map(decode_value)
                    .collect::<Result<Vec<_>, _>>()?,
                _ => Vec::new(),
            };
            Ok(Value::Array(values))
        }
        "mapValue" => Ok(Value::Object(decode_fields(inner.get("fields"))?)),
        other => Err(FirebaseError::Codec(format!("unsupported value type {other}"))),
    }
}

/// Decode a document `fields` map. A missing map is an empty object.
pub fn decode_fields(fields: Option<&Value>) -> Result<Map<String, Value>, FirebaseError> {
    match fields {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| Ok((k.clone(), decode_value(v)?)))
            .collect(),
        Some(other) => Err(FirebaseError::Codec(format!("expected fields map, got {other}"))),
    }
}

// ═══════════════════════════════════════════════════════════
// Client
// ═══════════════════════════════════════════════════════════

#[derive(Deserialize)]
struct Document {
    name: String,
    fields: Option<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    next_page_token: Option<String>,
}

/// A decoded document: its id (last path segment) and fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl TryFrom<Document> for StoredDocument {
    type Error = FirebaseError;

    fn try_from(doc: Document) -> Result<Self, Self::Error> {
        let id = doc.name.rsplit('/').next().unwrap_or_default().to_string();
        Ok(Self {
            id,
            fields: decode_fields(doc.fields.as_ref())?,
        })
    }
}

pub struct FirestoreClient {
    /// `.../projects/{project}/databases/(default)/documents`
    documents_root: Url,
    tokens: Arc<dyn AccessTokenSource>,
    client: reqwest::blocking::Client,
}

impl FirestoreClient {
    pub fn new(
        base_url: &str,
        project_id: &str,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Result<Self, FirebaseError> {
        if project_id.trim().is_empty() {
            return Err(FirebaseError::Config("Firestore project_id is empty".into()));
        }
        let root = format!(
            "{}/projects/{}/databases/(default)/documents",
            base_url.trim_end_matches('/'),
            project_id
        );
        let documents_root =
            Url::parse(&root).map_err(|e| FirebaseError::Config(format!("bad Firestore URL: {e}")))?;
        Ok(Self {
            documents_root,
            tokens,
            client: http_client(FIRESTORE_TIMEOUT_SECS)?,
        })
    }

    /// URL of a document or collection; each segment is percent-encoded.
    pub fn url_for(&self, segments: &[&str]) -> Result<Url, FirebaseError> {
        let mut url = self.documents_root.clone();
        url.path_segments_mut()
            .map_err(|_| FirebaseError::Config("Firestore base URL cannot take a path".into()))?
            .extend(segments);
        Ok(url)
    }

    fn send(
        &self,
        request: reqwest::blocking::RequestBuilder,
        path: &[&str],
    ) -> Result<String, FirebaseError> {
        let token = self.tokens.access_token()?;
        let response = request
            .bearer_auth(token)
            .send()
            .map_err(transport_error)?;
        let status = response.status();
        let body = response.text().map_err(transport_error)?;
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FirebaseError::NotFound(path.join("/")));
        }
        if !status.is_success() {
            return Err(FirebaseError::Api {
                status: status.as_u16(),
                message: google_error_message(&body),
            });
        }
        Ok(body)
    }

    /// Create or fully replace a document.
    pub fn set_document(
        &self,
        path: &[&str],
        fields: &Map<String, Value>,
    ) -> Result<(), FirebaseError> {
        let url = self.url_for(path)?;
        let body = json!({"fields": encode_fields(fields)});
        self.send(self.client.patch(url).json(&body), path)?;
        Ok(())
    }

    /// Overwrite the given top-level fields of an existing document.
    pub fn update_fields(
        &self,
        path: &[&str],
        fields: &Map<String, Value>,
    ) -> Result<(), FirebaseError> {
        let url = self.url_for(path)?;
        let mut query: Vec<(&str, &str)> = fields
            .keys()
            .map(|k| ("updateMask.fieldPaths", k.as_str()))
            .collect();
        query.push(("currentDocument.exists", "true"));
        let body = json!({"fields": encode_fields(fields)});
        self.send(self.client.patch(url).query(&query).json(&body), path)?;
        Ok(())
    }

    pub fn get_document(&self, path: &[&str]) -> Result<Option<StoredDocument>, FirebaseError> {
        let url = self.url_for(path)?;
        match self.send(self.client.get(url), path) {
            Ok(body) => {
                let doc: Document = serde_json::from_str(&body)
                    .map_err(|e| FirebaseError::Codec(e.to_string()))?;
                Ok(Some(doc.try_into()?))
            }
            Err(FirebaseError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Every document of a collection, following page tokens.
    pub fn list_documents(&self, collection: &[&str]) -> Result<Vec<StoredDocument>, FirebaseError> {
        let url = self.url_for(collection)?;
        let page_size = LIST_PAGE_SIZE.to_string();
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("pageSize", page_size.as_str())];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }
            let body = match self.send(self.client.get(url.clone()).query(&query), collection) {
                Ok(body) => body,
                // An absent parent reads as an empty collection
                Err(FirebaseError::NotFound(_)) => return Ok(documents),
                Err(e) => return Err(e),
            };
            let page: ListDocumentsResponse =
                serde_json::from_str(&body).map_err(|e| FirebaseError::Codec(e.to_string()))?;
            for doc in page.documents {
                documents.push(doc.try_into()?);
            }
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firebase::token::StaticToken;

    #[test]
    fn encodes_scalars() {
        assert_eq!(encode_value(&json!(null)), json!({"nullValue": null}));
        assert_eq!(encode_value(&json!(true)), json!({"booleanValue": true}));
        assert_eq!(encode_value(&json!(42)), json!({"integerValue": "42"}));
        assert_eq!(encode_value(&json!(-3)), json!({"integerValue": "-3"}));
        assert_eq!(encode_value(&json!(1.5)), json!({"doubleValue": 1.5}));
        assert_eq!(encode_value(&json!("x")), json!({"stringValue": "x"}));
    }

    #[test]
    fn encodes_nested_structures() {
        let encoded = encode_value(&json!({"scores": [1, 2], "meta": {"ok": false}}));
        assert_eq!(
            encoded,
            json!({"mapValue": {"fields": {
                "scores": {"arrayValue": {"values": [{"integerValue": "1"}, {"integerValue": "2"}]}},
                "meta": {"mapValue": {"fields": {"ok": {"booleanValue": false}}}}
            }}})
        );
    }

    #[test]
    fn decodes_provider_document() {
        let fields = json!({
            "case_id": {"stringValue": "HC-1"},
            "age": {"integerValue": "67"},
            "mean": {"doubleValue": 2.5},
            "created": {"timestampValue": "2024-05-01T10:00:00Z"},
            "empty_list": {"arrayValue": {}},
            "empty_map": {"mapValue": {}},
            "nothing": {"nullValue": null}
        });
        let decoded = decode_fields(Some(&fields)).unwrap();
        assert_eq!(decoded["case_id"], "HC-1");
        assert_eq!(decoded["age"], 67);
        assert_eq!(decoded["mean"], 2.5);
        assert_eq!(decoded["created"], "2024-05-01T10:00:00Z");
        assert_eq!(decoded["empty_list"], json!([]));
        assert_eq!(decoded["empty_map"], json!({}));
        assert!(decoded["nothing"].is_null());
    }

    #[test]
    fn encode_then_decode_preserves_report_shape() {
        let original = json!({
            "case_id": "HC-9",
            "perspectives": {"medical_team": {"autonomy": 3, "justice": 0}},
            "chat_history": [{"role": "user", "content": "Why?"}],
            "charts": {"radar": null}
        });
        let encoded = encode_fields(original.as_object().unwrap());
        let decoded = decode_fields(Some(&encoded)).unwrap();
        assert_eq!(Value::Object(decoded), original);
    }

    #[test]
    fn rejects_unknown_value_kind() {
        assert!(matches!(
            decode_value(&json!({"mysteryValue": 1})),
            Err(FirebaseError::Codec(_))
        ));
        assert!(decode_value(&json!("bare")).is_err());
    }

    #[test]
    fn urls_encode_segments() {
        let client = FirestoreClient::new(
            "https://firestore.googleapis.com/v1",
            "demo",
            Arc::new(StaticToken("owner".into())),
        )
        .unwrap();
        let url = client.url_for(&["users", "u1", "cases", "HC 1?x"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://firestore.googleapis.com/v1/projects/demo/databases/(default)/documents/users/u1/cases/HC%201%3Fx"
        );
    }

    #[test]
    fn document_id_is_last_segment() {
        let doc = Document {
            name: "projects/p/databases/(default)/documents/users/u/cases/HC-3".into(),
            fields: None,
        };
        let stored = StoredDocument::try_from(doc).unwrap();
        assert_eq!(stored.id, "HC-3");
        assert!(stored.fields.is_empty());
    }

    // ── Against a local HTTP server ─────────────────────────

    use axum::http::StatusCode;

    use crate::test_http::StubServer;

    const CASES_PATH: &str = "/projects/demo/databases/(default)/documents/users/u1/cases";

    fn document(id: &str) -> Value {
        json!({
            "name": format!("projects/demo/databases/(default)/documents/users/u1/cases/{id}"),
            "fields": {"case_id": {"stringValue": id}, "age": {"integerValue": "80"}}
        })
    }

    /// Run `f` with a client pointed at `stub`, off the async runtime.
    async fn with_client<T: Send + 'static>(
        stub: &StubServer,
        f: impl FnOnce(&FirestoreClient) -> T + Send + 'static,
    ) -> T {
        let base = stub.base_url.clone();
        tokio::task::spawn_blocking(move || {
            let client =
                FirestoreClient::new(&base, "demo", Arc::new(StaticToken("owner".into()))).unwrap();
            f(&client)
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn set_document_replaces_whole_document() {
        let stub = StubServer::start(vec![(StatusCode::OK, document("HC-1"))]).await;
        let fields = json!({"case_id": "HC-1", "age": 80});
        with_client(&stub, move |client| {
            client.set_document(&["users", "u1", "cases", "HC-1"], fields.as_object().unwrap())
        })
        .await
        .unwrap();

        let requests = stub.requests();
        assert_eq!(requests[0].method, "PATCH");
        assert_eq!(requests[0].path, format!("{CASES_PATH}/HC-1"));
        assert_eq!(requests[0].query, "");
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer owner"));
        assert_eq!(
            requests[0].json()["fields"],
            json!({"case_id": {"stringValue": "HC-1"}, "age": {"integerValue": "80"}})
        );
    }

    #[tokio::test]
    async fn update_fields_masks_and_requires_existing_document() {
        let stub = StubServer::start(vec![
            (StatusCode::OK, document("HC-1")),
            (
                StatusCode::NOT_FOUND,
                json!({"error": {"message": "No document to update"}}),
            ),
        ])
        .await;
        let (updated, missing) = with_client(&stub, |client| {
            let fields = json!({"deliberative_analysis": "Committee view"});
            let fields = fields.as_object().unwrap();
            (
                client.update_fields(&["users", "u1", "cases", "HC-1"], fields),
                client.update_fields(&["users", "u1", "cases", "HC-2"], fields),
            )
        })
        .await;
        assert!(updated.is_ok());
        assert!(matches!(missing, Err(FirebaseError::NotFound(_))));

        let requests = stub.requests();
        assert_eq!(requests[0].method, "PATCH");
        assert_eq!(
            requests[0].query_pairs(),
            vec![
                (
                    "updateMask.fieldPaths".to_string(),
                    "deliberative_analysis".to_string()
                ),
                ("currentDocument.exists".to_string(), "true".to_string()),
            ]
        );
        assert_eq!(
            requests[0].json()["fields"]["deliberative_analysis"],
            json!({"stringValue": "Committee view"})
        );
    }

    #[tokio::test]
    async fn get_document_missing_is_none() {
        let stub = StubServer::start(vec![
            (StatusCode::OK, document("HC-1")),
            (
                StatusCode::NOT_FOUND,
                json!({"error": {"code": 404, "message": "Document not found"}}),
            ),
        ])
        .await;
        let (found, missing) = with_client(&stub, |client| {
            (
                client.get_document(&["users", "u1", "cases", "HC-1"]),
                client.get_document(&["users", "u1", "cases", "HC-404"]),
            )
        })
        .await;

        let found = found.unwrap().unwrap();
        assert_eq!(found.id, "HC-1");
        assert_eq!(found.fields["age"], 80);
        assert!(missing.unwrap().is_none());
        assert_eq!(stub.requests()[1].method, "GET");
    }

    #[tokio::test]
    async fn list_documents_follows_page_tokens() {
        let stub = StubServer::start(vec![
            (
                StatusCode::OK,
                json!({"documents": [document("HC-1")], "nextPageToken": "page-2"}),
            ),
            (
                StatusCode::OK,
                json!({"documents": [document("HC-2")], "nextPageToken": ""}),
            ),
        ])
        .await;
        let docs = with_client(&stub, |client| {
            client.list_documents(&["users", "u1", "cases"])
        })
        .await
        .unwrap();

        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["HC-1", "HC-2"]);

        let requests = stub.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].path, CASES_PATH);
        assert_eq!(
            requests[0].query_pairs(),
            vec![("pageSize".to_string(), "100".to_string())]
        );
        assert_eq!(
            requests[1].query_pairs(),
            vec![
                ("pageSize".to_string(), "100".to_string()),
                ("pageToken".to_string(), "page-2".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn list_under_absent_parent_is_empty() {
        let stub = StubServer::start(vec![(
            StatusCode::NOT_FOUND,
            json!({"error": {"message": "not found"}}),
        )])
        .await;
        let docs = with_client(&stub, |client| {
            client.list_documents(&["users", "nobody", "cases"])
        })
        .await
        .unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn server_error_carries_provider_message() {
        let stub = StubServer::start(vec![(
            StatusCode::SERVICE_UNAVAILABLE,
            json!({"error": {"code": 503, "message": "The service is currently unavailable."}}),
        )])
        .await;
        let err = with_client(&stub, |client| {
            client.get_document(&["users", "u1", "cases", "HC-1"])
        })
        .await
        .unwrap_err();
        match &err {
            FirebaseError::Api { status, message } => {
                assert_eq!(*status, 503);
                assert_eq!(message, "The service is currently unavailable.");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        assert!(err.is_unavailable());
    }
}
