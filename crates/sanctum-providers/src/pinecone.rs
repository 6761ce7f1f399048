//! Pinecone data-plane client.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use sanctum_core::model::IndexStats;
use sanctum_core::traits::{VectorIndex, VectorRecord};

use crate::error::{check_store_status, store_transport_error, StoreError};

pub const DEFAULT_CONTROL_PLANE_URL: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2024-07";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// A single namespace of a Pinecone serverless index.
pub struct PineconeIndex {
    api_key: String,
    host: String,
    namespace: String,
    client: reqwest::Client,
}

impl PineconeIndex {
    /// Address an index by its data-plane host.
    pub fn new(api_key: &str, host: &str, namespace: &str) -> Result<Self, StoreError> {
        if api_key.trim().is_empty() {
            return Err(StoreError::Unavailable("pinecone API key is not set".into()));
        }
        Ok(Self {
            api_key: api_key.trim().to_string(),
            host: normalize_host(host),
            namespace: namespace.to_string(),
            client: build_client()?,
        })
    }

    /// Look up the data-plane host of `index_name` through the control plane.
    #[instrument(skip(api_key, control_plane_url))]
    pub async fn connect(
        api_key: &str,
        index_name: &str,
        namespace: &str,
        control_plane_url: Option<&str>,
    ) -> Result<Self, StoreError> {
        if api_key.trim().is_empty() {
            return Err(StoreError::Unavailable("pinecone API key is not set".into()));
        }
        let base = control_plane_url
            .unwrap_or(DEFAULT_CONTROL_PLANE_URL)
            .trim_end_matches('/');
        let client = build_client()?;

        #[derive(Deserialize)]
        struct IndexDescription {
            host: String,
        }

        let response = client
            .get(format!("{base}/indexes/{index_name}"))
            .header("Api-Key", api_key.trim())
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .await
            .map_err(store_transport_error)?;
        if response.status().as_u16() == 404 {
            return Err(StoreError::Unavailable(format!(
                "pinecone index '{index_name}' does not exist"
            )));
        }
        let description: IndexDescription = check_store_status(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Unavailable(format!("failed to parse index description: {e}")))?;

        info!(host = %description.host, "resolved pinecone index host");
        Ok(Self {
            api_key: api_key.trim().to_string(),
            host: normalize_host(&description.host),
            namespace: namespace.to_string(),
            client,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn url(&self, path: &str) -> Result<Url, StoreError> {
        Url::parse(&format!("{}{path}", self.host))
            .map_err(|e| StoreError::Unavailable(format!("invalid index host '{}': {e}", self.host)))
    }

    async fn send<R: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<R, StoreError> {
        let response = req
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .send()
            .await
            .map_err(store_transport_error)?;
        check_store_status(response)
            .await?
            .json::<R>()
            .await
            .map_err(|e| StoreError::Unavailable(format!("failed to parse index response: {e}")))
    }
}

fn build_client() -> Result<reqwest::Client, StoreError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .map_err(|e| StoreError::Unavailable(format!("failed to build HTTP client: {e}")))
}

/// Index hosts are reported without a scheme.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

#[derive(Serialize)]
struct UpsertBody<'a> {
    vectors: &'a [VectorRecord],
    namespace: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Deserialize)]
struct FetchResponse {
    #[serde(default)]
    vectors: HashMap<String, FetchedVector>,
}

#[derive(Deserialize)]
struct FetchedVector {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Serialize)]
struct DeleteBody<'a> {
    ids: &'a [String],
    namespace: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    #[serde(default)]
    dimension: u32,
    #[serde(default)]
    total_vector_count: u64,
    #[serde(default)]
    namespaces: HashMap<String, NamespaceStats>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceStats {
    #[serde(default)]
    vector_count: u64,
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn name(&self) -> &str {
        "pinecone"
    }

    #[instrument(skip(self, records), fields(count = records.len(), namespace = %self.namespace))]
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }
        let body = UpsertBody {
            vectors: &records,
            namespace: &self.namespace,
        };
        let req = self.client.post(self.url("/vectors/upsert")?).json(&body);
        let response: UpsertResponse = self.send(req).await?;
        debug!(upserted = response.upserted_count, "pinecone upsert finished");
        Ok(response.upserted_count)
    }

    #[instrument(skip(self, ids), fields(count = ids.len(), namespace = %self.namespace))]
    async fn fetch(&self, ids: &[String]) -> Result<HashMap<String, Vec<f32>>, StoreError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let mut url = self.url("/vectors/fetch")?;
        {
            let mut query = url.query_pairs_mut();
            for id in ids {
                query.append_pair("ids", id);
            }
            query.append_pair("namespace", &self.namespace);
        }
        let response: FetchResponse = self.send(self.client.get(url)).await?;
        Ok(response
            .vectors
            .into_iter()
            .map(|(id, v)| (id, v.values))
            .collect())
    }

    #[instrument(skip(self, ids), fields(count = ids.len(), namespace = %self.namespace))]
    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let body = DeleteBody {
            ids,
            namespace: &self.namespace,
        };
        let response = self
            .client
            .post(self.url("/vectors/delete")?)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(store_transport_error)?;
        // Deleting from a namespace that was never written is a 404.
        if response.status().as_u16() == 404 {
            return Ok(());
        }
        check_store_status(response).await?;
        Ok(())
    }

    async fn describe_stats(&self) -> Result<IndexStats, StoreError> {
        let req = self
            .client
            .post(self.url("/describe_index_stats")?)
            .json(&serde_json::json!({}));
        let response: StatsResponse = self.send(req).await?;
        let vector_count = response
            .namespaces
            .get(&self.namespace)
            .map(|ns| ns.vector_count)
            .unwrap_or(if response.namespaces.is_empty() {
                response.total_vector_count
            } else {
                0
            });
        Ok(IndexStats {
            vector_count,
            dimension: response.dimension,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn index(server: &MockServer) -> PineconeIndex {
        PineconeIndex::new("pc-key", &server.uri(), "flashcards").unwrap()
    }

    #[test]
    fn hosts_without_scheme_get_https() {
        assert_eq!(
            normalize_host("sanctum2-abc.svc.pinecone.io/"),
            "https://sanctum2-abc.svc.pinecone.io"
        );
        assert_eq!(normalize_host("http://localhost:5080"), "http://localhost:5080");
    }

    #[test]
    fn empty_key_is_rejected() {
        let err = PineconeIndex::new("", "localhost", "ns").err().unwrap();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn upsert_sends_namespace_and_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .and(header("Api-Key", "pc-key"))
            .and(body_partial_json(serde_json::json!({
                "namespace": "flashcards",
                "vectors": [{"id": "a", "values": [1.0, 0.0]}]
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"upsertedCount": 1})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let written = index(&server)
            .await
            .upsert(vec![VectorRecord {
                id: "a".into(),
                values: vec![1.0, 0.0],
            }])
            .await
            .unwrap();
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn fetch_returns_found_vectors_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/vectors/fetch"))
            .and(query_param("ids", "a"))
            .and(query_param("namespace", "flashcards"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "vectors": {"a": {"id": "a", "values": [0.25, 0.5]}},
                "namespace": "flashcards"
            })))
            .mount(&server)
            .await;

        let found = index(&server)
            .await
            .fetch(&["a".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found["a"], vec![0.25, 0.5]);
    }

    #[tokio::test]
    async fn delete_tolerates_missing_namespace() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vectors/delete"))
            .and(body_partial_json(serde_json::json!({"ids": ["gone"]})))
            .respond_with(ResponseTemplate::new(404).set_body_string("Namespace not found"))
            .mount(&server)
            .await;

        index(&server).await.delete(&["gone".to_string()]).await.unwrap();
    }

    #[tokio::test]
    async fn stats_prefer_namespace_count() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/describe_index_stats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "dimension": 1536,
                "totalVectorCount": 50,
                "namespaces": {"flashcards": {"vectorCount": 12}, "other": {"vectorCount": 38}}
            })))
            .mount(&server)
            .await;

        let stats = index(&server).await.describe_stats().await.unwrap();
        assert_eq!(stats.vector_count, 12);
        assert_eq!(stats.dimension, 1536);
    }

    #[tokio::test]
    async fn server_errors_are_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/vectors/fetch"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad ids"))
            .mount(&server)
            .await;

        let idx = index(&server).await;
        let err = idx
            .upsert(vec![VectorRecord {
                id: "a".into(),
                values: vec![1.0],
            }])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        let err = idx.fetch(&["a".to_string()]).await.unwrap_err();
        assert!(matches!(err, StoreError::Invalid(_)));
    }

    #[tokio::test]
    async fn connect_discovers_host() {
        let control = MockServer::start().await;
        let data = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/indexes/sanctum2"))
            .and(header("Api-Key", "pc-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "sanctum2",
                "dimension": 1536,
                "host": data.uri()
            })))
            .mount(&control)
            .await;

        let idx = PineconeIndex::connect("pc-key", "sanctum2", "flashcards", Some(&control.uri()))
            .await
            .unwrap();
        assert_eq!(idx.host(), data.uri());
        assert_eq!(idx.namespace(), "flashcards");
    }

    #[tokio::test]
    async fn connect_unknown_index_fails() {
        let control = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/nope"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&control)
            .await;

        let err = PineconeIndex::connect("pc-key", "nope", "ns", Some(&control.uri()))
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("does not exist"));
    }
}
