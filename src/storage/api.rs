//! API storage backend
//!
//! Implements RecordStore over a remote document store reached through HTTP.
//! Used for online mode (default).
//!
//! Endpoints, relative to the base URL:
//! - `POST   /collections/{collection}/documents`
//! - `GET    /collections/{collection}/documents`
//! - `PATCH  /collections/{collection}/documents/{id}`
//! - `DELETE /collections/{collection}/documents/{id}`
//!
//! ## Security
//!
//! All collection parameters are validated to prevent injection attacks.
//! Only alphanumeric characters, hyphens, and underscores are allowed.

use super::{RecordStore, StorageError, validate_collection_name};
use crate::models::{Document, StoredDocument};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};

/// API record store that communicates with an HTTP document service
pub struct ApiRecordStore {
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl ApiRecordStore {
    /// Create a new API record store
    ///
    /// # Arguments
    ///
    /// * `base_url` - Base URL of the API server (e.g., "https://api.example.com/v1")
    /// * `auth_token` - Optional bearer token for authentication
    ///
    /// # Example
    ///
    /// ```rust
    /// use emigration_data_sdk::storage::api::ApiRecordStore;
    ///
    /// let store = ApiRecordStore::new(
    ///     "https://api.example.com/v1",
    ///     Some("bearer_token_here".to_string()),
    /// );
    /// ```
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token,
            client: reqwest::Client::new(),
        }
    }

    /// Build a request with authentication headers
    fn build_request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method, &url);

        if let Some(ref token) = self.auth_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        request
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        action: &str,
        collection: &str,
        id: Option<&str>,
    ) -> Result<reqwest::Response, StorageError> {
        let response = request.send().await.map_err(|e| {
            StorageError::NetworkError(format!("Failed to {} in {}: {}", action, collection, e))
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match id {
            Some(id) if status == reqwest::StatusCode::NOT_FOUND => Err(StorageError::RecordNotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            }),
            _ if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN =>
            {
                Err(StorageError::PermissionDenied(format!(
                    "{} in {}: {}",
                    action, collection, status
                )))
            }
            _ => Err(StorageError::BackendError(format!(
                "Request to {} in {} failed: {}",
                action, collection, status
            ))),
        }
    }
}

fn documents_path(collection: &str) -> String {
    format!("/collections/{}/documents", urlencoding::encode(collection))
}

fn document_path(collection: &str, id: &str) -> String {
    format!("{}/{}", documents_path(collection), urlencoding::encode(id))
}

/// Decode a listing response.
///
/// Accepts either a bare array or an object with a `documents` array. Each
/// entry is either `{ "id": .., "fields": { .. } }` or a flat object carrying
/// its `id` next to the fields. Entries without an id are skipped.
fn decode_documents(body: Value) -> Result<Vec<StoredDocument>, StorageError> {
    let entries = match body {
        Value::Array(entries) => entries,
        Value::Object(mut object) => match object.remove("documents") {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(StorageError::SerializationError(
                    "Expected an array of documents".to_string(),
                ));
            }
        },
        _ => {
            return Err(StorageError::SerializationError(
                "Expected an array of documents".to_string(),
            ));
        }
    };

    Ok(entries.into_iter().filter_map(decode_document).collect())
}

fn decode_document(entry: Value) -> Option<StoredDocument> {
    let Value::Object(mut object) = entry else {
        return None;
    };
    let id = match object.remove("id")? {
        Value::String(id) => id,
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let fields = match object.remove("fields") {
        Some(Value::Object(fields)) => fields,
        Some(other) => {
            object.insert("fields".to_string(), other);
            object
        }
        None => object,
    };
    Some(StoredDocument { id, fields })
}

fn decode_created_id(body: &Value) -> Result<String, StorageError> {
    match body.get("id") {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(StorageError::SerializationError(
            "Create response carries no document id".to_string(),
        )),
    }
}

#[async_trait(?Send)]
impl RecordStore for ApiRecordStore {
    async fn create(&self, collection: &str, document: Document) -> Result<String, StorageError> {
        validate_collection_name(collection)?;

        let request = self
            .build_request(reqwest::Method::POST, &documents_path(collection))
            .json(&document);
        let response = self.send(request, "create document", collection, None).await?;

        let body: Value = response.json().await.map_err(|e| {
            StorageError::SerializationError(format!("Failed to parse create response: {}", e))
        })?;
        let id = decode_created_id(&body)?;
        debug!("Created document {} in {}", id, collection);
        Ok(id)
    }

    async fn read_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StorageError> {
        validate_collection_name(collection)?;

        let request = self.build_request(reqwest::Method::GET, &documents_path(collection));
        let response = self.send(request, "read documents", collection, None).await?;

        let body: Value = response.json().await.map_err(|e| {
            StorageError::SerializationError(format!("Failed to parse documents: {}", e))
        })?;
        decode_documents(body)
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<(), StorageError> {
        validate_collection_name(collection)?;

        let request = self
            .build_request(reqwest::Method::PATCH, &document_path(collection, id))
            .json(&fields);
        self.send(request, "update document", collection, Some(id))
            .await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StorageError> {
        validate_collection_name(collection)?;

        let request = self.build_request(reqwest::Method::DELETE, &document_path(collection, id));
        self.send(request, "delete document", collection, Some(id))
            .await?;
        Ok(())
    }

    async fn delete_all(&self, collection: &str) -> Result<(), StorageError> {
        // The service has no bulk delete; remove documents one at a time
        let documents = self.read_all(collection).await?;
        let count = documents.len();
        for document in documents {
            self.delete(collection, &document.id).await?;
        }
        info!("Deleted {} document(s) in {}", count, collection);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paths_are_encoded() {
        assert_eq!(documents_path("age"), "/collections/age/documents");
        assert_eq!(
            document_path("age", "a b/c"),
            "/collections/age/documents/a%20b%2Fc"
        );
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let store = ApiRecordStore::new("https://example.com/v1/", None);
        assert_eq!(store.base_url, "https://example.com/v1");
    }

    #[test]
    fn test_decode_nested_and_flat_documents() {
        let body = json!([
            { "id": "a", "fields": { "year": 1981, "male": 3 } },
            { "id": "b", "year": 1982, "male": 4 },
            { "year": 1983 }
        ]);
        let docs = decode_documents(body).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "a");
        assert_eq!(docs[0].fields.get("male"), Some(&json!(3)));
        assert_eq!(docs[1].id, "b");
        assert_eq!(docs[1].fields.get("year"), Some(&json!(1982)));
        assert!(!docs[1].fields.contains_key("id"));
    }

    #[test]
    fn test_decode_wrapped_listing() {
        let body = json!({ "documents": [{ "id": 7, "fields": {} }] });
        let docs = decode_documents(body).unwrap();
        assert_eq!(docs[0].id, "7");

        assert!(decode_documents(json!("nope")).is_err());
    }

    #[test]
    fn test_decode_created_id() {
        assert_eq!(decode_created_id(&json!({ "id": "x1" })).unwrap(), "x1");
        assert!(decode_created_id(&json!({})).is_err());
    }
}
