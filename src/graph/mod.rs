//! Graph API client: authenticated GETs against a fixed base URL, JSON
//! decoding and classification of API error envelopes.

pub mod error;
pub mod paging;
pub mod transport;
pub mod types;

pub use error::{GraphError, TransportError};
pub use transport::{HttpTransport, Transport};
pub use types::{AssetRecord, UserInfo};

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use url::Url;

pub const GRAPH_ENDPOINT: &str = "https://graph.facebook.com";

/// Query parameters for a Graph call. Ordered so generated URLs are stable.
pub type QueryParams = BTreeMap<String, String>;

const PHOTO_FIELDS: &str = "source,created_time,updated_time,name,from,album";
const VIDEO_FIELDS: &str = "source,created_time,updated_time,name,from";

pub struct GraphClient {
    transport: Box<dyn Transport>,
    access_token: String,
    base: Url,
    max_pages: Option<u32>,
}

impl std::fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient")
            .field("base", &self.base.as_str())
            .field("access_token", &"<redacted>")
            .field("max_pages", &self.max_pages)
            .finish_non_exhaustive()
    }
}

impl GraphClient {
    pub fn new(transport: Box<dyn Transport>, access_token: impl Into<String>) -> Self {
        let base = Url::parse(GRAPH_ENDPOINT).expect("valid Graph endpoint");
        Self::with_base(transport, access_token, base)
    }

    /// Point the client at a different API root (a stub server in tests).
    pub fn with_base(
        transport: Box<dyn Transport>,
        access_token: impl Into<String>,
        base: Url,
    ) -> Self {
        Self {
            transport,
            access_token: access_token.into(),
            base,
            max_pages: None,
        }
    }

    /// Cap on pages followed by [`GraphClient::fetch_all`].
    pub fn with_max_pages(mut self, max_pages: Option<u32>) -> Self {
        self.max_pages = max_pages;
        self
    }

    #[allow(dead_code)]
    pub fn set_access_token(&mut self, access_token: impl Into<String>) {
        self.access_token = access_token.into();
    }

    /// The underlying transport, shared with the downloader.
    pub fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    /// Build the request URL: base path, then each non-empty segment of
    /// `edge_path`, then the query with `access_token` overwritten.
    pub(crate) fn build_url(&self, edge_path: &str, params: &QueryParams) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(edge_path.split('/').filter(|s| !s.is_empty()));
        }

        let mut query = params.clone();
        query.insert("access_token".to_string(), self.access_token.clone());
        url.query_pairs_mut().clear().extend_pairs(query.iter());
        url
    }

    /// Single authenticated GET.
    ///
    /// An empty body yields an empty object whatever the status. Otherwise
    /// the status decides how the body is read: 200 is data, anything else
    /// is an error envelope.
    pub async fn get(&self, edge_path: &str, params: &QueryParams) -> Result<Value, GraphError> {
        let url = self.build_url(edge_path, params);
        let response = self.transport.get(url.as_str()).await?;
        tracing::debug!(
            edge = edge_path,
            status = response.status,
            bytes = response.body.len(),
            "Graph GET"
        );

        if response.body.is_empty() {
            if !response.is_ok() {
                tracing::debug!(
                    edge = edge_path,
                    status = response.status,
                    "Empty error response, treating as no data"
                );
            }
            return Ok(Value::Object(Map::new()));
        }

        let body: Value = serde_json::from_slice(&response.body).map_err(|source| {
            GraphError::MalformedResponse {
                status: response.status,
                source,
            }
        })?;

        if response.is_ok() {
            return Ok(body);
        }

        let error = body.get("error");
        let field = |name: &str| error.and_then(|e| e.get(name));
        Err(GraphError::Api {
            status: response.status,
            code: field("code").and_then(Value::as_i64),
            subcode: field("error_subcode").and_then(Value::as_i64),
            message: field("message").and_then(Value::as_str).map(str::to_string),
        })
    }

    pub async fn user_info(&self) -> Result<UserInfo, GraphError> {
        let value = self.get("/me", &QueryParams::new()).await?;
        serde_json::from_value(value).map_err(|source| GraphError::UnexpectedShape {
            edge: "/me".to_string(),
            source,
        })
    }

    pub async fn user_photos(&self) -> Result<Vec<AssetRecord>, GraphError> {
        self.fetch_records("/me/photos/uploaded", PHOTO_FIELDS).await
    }

    pub async fn user_tagged_photos(&self) -> Result<Vec<AssetRecord>, GraphError> {
        self.fetch_records("/me/photos", PHOTO_FIELDS).await
    }

    pub async fn user_videos(&self) -> Result<Vec<AssetRecord>, GraphError> {
        self.fetch_records("/me/videos/uploaded", VIDEO_FIELDS).await
    }

    pub async fn user_tagged_videos(&self) -> Result<Vec<AssetRecord>, GraphError> {
        self.fetch_records("/me/videos", VIDEO_FIELDS).await
    }

    async fn fetch_records(
        &self,
        edge_path: &str,
        fields: &str,
    ) -> Result<Vec<AssetRecord>, GraphError> {
        let mut params = QueryParams::new();
        params.insert("fields".to_string(), fields.to_string());
        let items = self.fetch_all(edge_path, params).await?;
        items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AssetRecord>, _>>()
            .map_err(|source| GraphError::UnexpectedShape {
                edge: edge_path.to_string(),
                source,
            })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn stub_client(server: &MockServer) -> GraphClient {
        let transport = HttpTransport::new(std::time::Duration::from_secs(5), None).unwrap();
        GraphClient::with_base(
            Box::new(transport),
            "TOKEN",
            Url::parse(&server.uri()).unwrap(),
        )
    }

    fn offline_client(base: &str) -> GraphClient {
        let transport = HttpTransport::new(std::time::Duration::from_secs(1), None).unwrap();
        GraphClient::with_base(Box::new(transport), "TOKEN", Url::parse(base).unwrap())
    }

    #[test]
    fn test_build_url_leading_slash_and_bare_edge_match() {
        let client = offline_client("https://graph.facebook.com");
        let params = QueryParams::new();
        let a = client.build_url("/me/photos", &params);
        let b = client.build_url("me/photos", &params);
        let c = client.build_url("me/photos/", &params);
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(
            a.as_str(),
            "https://graph.facebook.com/me/photos?access_token=TOKEN"
        );
    }

    #[test]
    fn test_build_url_keeps_versioned_base_path() {
        let client = offline_client("https://graph.facebook.com/v2.0/");
        let url = client.build_url("/me", &QueryParams::new());
        assert_eq!(url.path(), "/v2.0/me");
    }

    #[test]
    fn test_build_url_token_overwrites_caller_value() {
        let client = offline_client("https://graph.facebook.com");
        let mut params = QueryParams::new();
        params.insert("access_token".into(), "STALE".into());
        params.insert("fields".into(), "source,album".into());
        let url = client.build_url("/me/photos", &params);
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("access_token".to_string(), "TOKEN".to_string()),
                ("fields".to_string(), "source,album".to_string()),
            ]
        );
    }

    #[test]
    fn test_build_url_encodes_cursor_once() {
        let client = offline_client("https://graph.facebook.com");
        let mut params = QueryParams::new();
        params.insert("after".into(), "QVFI=+/".into());
        let url = client.build_url("/me/photos", &params);
        assert!(url.as_str().contains("after=QVFI%3D%2B%2F"), "{url}");
        let after = url
            .query_pairs()
            .find(|(k, _)| k == "after")
            .map(|(_, v)| v.into_owned());
        assert_eq!(after.as_deref(), Some("QVFI=+/"));
    }

    #[test]
    fn test_set_access_token_replaces_token() {
        let mut client = offline_client("https://graph.facebook.com");
        client.set_access_token("SECOND");
        let url = client.build_url("/me", &QueryParams::new());
        assert_eq!(url.query(), Some("access_token=SECOND"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = offline_client("https://graph.facebook.com");
        let dbg = format!("{client:?}");
        assert!(!dbg.contains("TOKEN"));
    }

    #[tokio::test]
    async fn test_get_decodes_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .and(query_param("access_token", "TOKEN"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "1", "name": "Jo"})))
            .mount(&server)
            .await;

        let value = stub_client(&server)
            .get("/me", &QueryParams::new())
            .await
            .unwrap();
        assert_eq!(value["name"], "Jo");
    }

    #[tokio::test]
    async fn test_get_error_envelope_becomes_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"error": {"code": 100, "error_subcode": 33}})),
            )
            .mount(&server)
            .await;

        let err = stub_client(&server)
            .get("/me/photos", &QueryParams::new())
            .await
            .unwrap_err();
        match err {
            GraphError::Api {
                status,
                code,
                subcode,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code, Some(100));
                assert_eq!(subcode, Some(33));
                assert!(message.is_none());
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_error_envelope_on_200_is_plain_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"error": {"code": 100, "error_subcode": 33}})),
            )
            .mount(&server)
            .await;

        let value = stub_client(&server)
            .get("/me/photos", &QueryParams::new())
            .await
            .unwrap();
        assert_eq!(value["error"]["code"], 100);
    }

    #[tokio::test]
    async fn test_get_error_envelope_without_codes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"oops": true})))
            .mount(&server)
            .await;

        let err = stub_client(&server)
            .get("/me", &QueryParams::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::Api {
                status: 403,
                code: None,
                subcode: None,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_get_empty_500_is_empty_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let value = stub_client(&server)
            .get("/me/photos", &QueryParams::new())
            .await
            .unwrap();
        assert_eq!(value, json!({}));
    }

    #[tokio::test]
    async fn test_get_empty_200_is_empty_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let value = stub_client(&server)
            .get("/me", &QueryParams::new())
            .await
            .unwrap();
        assert_eq!(value, json!({}));
    }

    #[tokio::test]
    async fn test_get_invalid_json_on_success_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
            .mount(&server)
            .await;

        let err = stub_client(&server)
            .get("/me", &QueryParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::MalformedResponse { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_get_invalid_json_on_error_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let err = stub_client(&server)
            .get("/me", &QueryParams::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::MalformedResponse { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_get_transport_failure_propagates() {
        let client = offline_client("http://127.0.0.1:1");
        let err = client.get("/me", &QueryParams::new()).await.unwrap_err();
        assert!(matches!(err, GraphError::Transport(_)));
    }

    #[tokio::test]
    async fn test_user_photos_requests_photo_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me/photos/uploaded"))
            .and(query_param("fields", PHOTO_FIELDS))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"source": "http://x/a.jpg", "album": {"name": "Trip"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let records = stub_client(&server).user_photos().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].album_name(), Some("Trip"));
    }

    #[tokio::test]
    async fn test_user_tagged_videos_requests_video_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me/videos"))
            .and(query_param("fields", VIDEO_FIELDS))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"source": "http://x/v.mp4"}, {"id": "no-source"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let records = stub_client(&server).user_tagged_videos().await.unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[1].source.is_none());
    }

    #[tokio::test]
    async fn test_records_with_wrong_shape_are_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": ["nope"]})))
            .mount(&server)
            .await;

        let err = stub_client(&server).user_videos().await.unwrap_err();
        assert!(matches!(err, GraphError::UnexpectedShape { .. }));
    }

    #[tokio::test]
    async fn test_user_info_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "42", "name": "Jo"})))
            .mount(&server)
            .await;

        let me = stub_client(&server).user_info().await.unwrap();
        assert_eq!(me.id.as_deref(), Some("42"));
        assert_eq!(me.name.as_deref(), Some("Jo"));
    }
}
