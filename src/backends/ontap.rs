//! ONTAP REST Adapter
//!
//! Implements the storage controller ports against the ONTAP cluster
//! management REST API (`/api/...`) using HTTP basic authentication.

use crate::config::OntapConfig;
use crate::domain::ports::{
    Account, AccountApi, AccountSpec, Aggregate, AggregateApi, InterfaceSpec, NetworkApi, Node,
    NodeApi, PartitionApi, PeeringApi, Svm, SvmCreateRequest, SvmState,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

const SVM_FIELDS: &str = "uuid,name,state,nvme,aggregates";

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct Collection<T> {
    #[serde(default = "Vec::new")]
    records: Vec<T>,
    #[serde(default)]
    num_records: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct NamedRef {
    #[serde(default)]
    name: String,
    #[serde(default)]
    uuid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProtocolService {
    #[serde(default)]
    enabled: bool,
}

#[derive(Debug, Deserialize)]
struct SvmRecord {
    name: String,
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    nvme: Option<ProtocolService>,
    #[serde(default)]
    aggregates: Vec<NamedRef>,
}

impl From<SvmRecord> for Svm {
    fn from(record: SvmRecord) -> Self {
        Svm {
            name: record.name,
            uuid: record.uuid,
            state: record
                .state
                .as_deref()
                .map(SvmState::parse)
                .unwrap_or(SvmState::Creating),
            nvme_enabled: record.nvme.map(|n| n.enabled).unwrap_or(false),
            aggregates: record.aggregates.into_iter().map(|a| a.name).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NodeRecord {
    uuid: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct AggregateRecord {
    uuid: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct AccountRecord {
    name: String,
    #[serde(default)]
    owner: NamedRef,
    #[serde(default)]
    role: NamedRef,
    #[serde(default)]
    locked: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// The resource a request acts on, used to build errors
#[derive(Debug, Clone, Copy)]
struct Target<'a> {
    operation: &'a str,
    kind: &'a str,
    name: &'a str,
}

/// Translate a non-success response into an engine error
fn map_error(target: Target<'_>, status: StatusCode, body: &str) -> Error {
    let detail = serde_json::from_str::<ErrorBody>(body).ok().map(|b| b.error);
    let message = match &detail {
        Some(d) if d.code.is_some() => {
            format!("{} (code {})", d.message, d.code.as_deref().unwrap_or_default())
        }
        Some(d) => d.message.clone(),
        None => body.trim().to_string(),
    };

    let lowered = message.to_lowercase();
    let duplicate = lowered.contains("duplicate entry") || lowered.contains("already exists");

    match status {
        StatusCode::NOT_FOUND => Error::NotFound {
            kind: target.kind.to_string(),
            name: target.name.to_string(),
        },
        StatusCode::CONFLICT => Error::AlreadyExists {
            kind: target.kind.to_string(),
            name: target.name.to_string(),
        },
        s if s.is_client_error() && duplicate => Error::AlreadyExists {
            kind: target.kind.to_string(),
            name: target.name.to_string(),
        },
        s => Error::Controller {
            operation: target.operation.to_string(),
            status: s.as_u16(),
            message,
        },
    }
}

// =============================================================================
// Request Bodies
// =============================================================================

fn svm_body(request: &SvmCreateRequest) -> Value {
    let aggregates: Vec<Value> = request
        .aggregates
        .iter()
        .map(|name| json!({ "name": name }))
        .collect();
    json!({
        "name": request.name,
        "aggregates": aggregates,
        "nvme": { "enabled": request.nvme_enabled },
    })
}

fn interface_body(spec: &InterfaceSpec) -> Value {
    json!({
        "name": spec.name,
        "ip": {
            "address": spec.ip.to_string(),
            "netmask": spec.netmask.to_string(),
        },
        "svm": { "uuid": spec.svm_uuid },
        "location": { "home_node": { "uuid": spec.node_uuid } },
        "service_policy": { "name": spec.service_policy },
        "vip": spec.vip,
    })
}

fn account_body(spec: &AccountSpec) -> Value {
    json!({
        "name": spec.credentials.username,
        "owner": { "uuid": spec.owner_uuid },
        "password": spec.credentials.password,
        "role": { "name": spec.role },
        "applications": [
            { "application": "http", "authentication_methods": ["password"] },
            { "application": "ontapi", "authentication_methods": ["password"] },
        ],
    })
}

// =============================================================================
// ONTAP Client
// =============================================================================

/// ONTAP cluster management client
pub struct OntapClient {
    config: OntapConfig,
    http: reqwest::Client,
}

impl OntapClient {
    pub fn new(config: OntapConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()?;
        Ok(Self { config, http })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(path))
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(header::ACCEPT, "application/json")
    }

    async fn send(&self, target: Target<'_>, builder: RequestBuilder) -> Result<Response> {
        debug!(operation = target.operation, name = target.name, "ONTAP request");
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await?;
        Err(map_error(target, status, &body))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        target: Target<'_>,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .send(target, self.request(Method::GET, path).query(query))
            .await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl PartitionApi for OntapClient {
    async fn get_svm_by_name(&self, name: &str) -> Result<Option<Svm>> {
        let target = Target {
            operation: "get svm by name",
            kind: "Svm",
            name,
        };
        let collection: Collection<SvmRecord> = self
            .get_json(target, "/svm/svms", &[("name", name), ("fields", SVM_FIELDS)])
            .await?;
        Ok(collection.records.into_iter().next().map(Svm::from))
    }

    async fn get_svm(&self, uuid: &str) -> Result<Svm> {
        let target = Target {
            operation: "get svm",
            kind: "Svm",
            name: uuid,
        };
        let path = format!("/svm/svms/{}", urlencoding::encode(uuid));
        let record: SvmRecord = self
            .get_json(target, &path, &[("fields", SVM_FIELDS)])
            .await?;
        Ok(record.into())
    }

    async fn create_svm(&self, request: &SvmCreateRequest) -> Result<()> {
        let target = Target {
            operation: "create svm",
            kind: "Svm",
            name: &request.name,
        };
        self.send(
            target,
            self.request(Method::POST, "/svm/svms").json(&svm_body(request)),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl NodeApi for OntapClient {
    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let target = Target {
            operation: "list nodes",
            kind: "Node",
            name: "*",
        };
        let collection: Collection<NodeRecord> = self
            .get_json(target, "/cluster/nodes", &[("fields", "uuid,name")])
            .await?;
        Ok(collection
            .records
            .into_iter()
            .map(|n| Node {
                uuid: n.uuid,
                name: n.name,
            })
            .collect())
    }
}

#[async_trait]
impl AggregateApi for OntapClient {
    async fn list_aggregates(&self) -> Result<Vec<Aggregate>> {
        let target = Target {
            operation: "list aggregates",
            kind: "Aggregate",
            name: "*",
        };
        let collection: Collection<AggregateRecord> = self
            .get_json(target, "/storage/aggregates", &[("fields", "uuid,name")])
            .await?;
        Ok(collection
            .records
            .into_iter()
            .map(|a| Aggregate {
                uuid: a.uuid,
                name: a.name,
            })
            .collect())
    }
}

#[async_trait]
impl NetworkApi for OntapClient {
    async fn create_interface(&self, spec: &InterfaceSpec) -> Result<()> {
        let target = Target {
            operation: "create interface",
            kind: "NetworkInterface",
            name: &spec.name,
        };
        self.send(
            target,
            self.request(Method::POST, "/network/ip/interfaces")
                .json(&interface_body(spec)),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl PeeringApi for OntapClient {
    async fn bgp_peer_group_count(&self) -> Result<usize> {
        let target = Target {
            operation: "list bgp peer groups",
            kind: "BgpPeerGroup",
            name: "*",
        };
        let collection: Collection<NamedRef> = self
            .get_json(target, "/network/ip/bgp/peer-groups", &[("fields", "name")])
            .await?;
        Ok(collection.num_records.unwrap_or(collection.records.len()))
    }
}

#[async_trait]
impl AccountApi for OntapClient {
    async fn create_account(&self, spec: &AccountSpec) -> Result<()> {
        let target = Target {
            operation: "create account",
            kind: "Account",
            name: &spec.credentials.username,
        };
        self.send(
            target,
            self.request(Method::POST, "/security/accounts")
                .json(&account_body(spec)),
        )
        .await?;
        Ok(())
    }

    async fn get_account(&self, owner_uuid: &str, username: &str) -> Result<Option<Account>> {
        let target = Target {
            operation: "get account",
            kind: "Account",
            name: username,
        };
        let path = account_path(owner_uuid, username);
        match self
            .get_json::<AccountRecord>(target, &path, &[("fields", "name,owner,role,locked")])
            .await
        {
            Ok(record) => Ok(Some(Account {
                owner_uuid: record.owner.uuid.unwrap_or_else(|| owner_uuid.to_string()),
                username: record.name,
                role: record.role.name,
                locked: record.locked,
            })),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn set_account_password(
        &self,
        owner_uuid: &str,
        username: &str,
        password: &str,
    ) -> Result<()> {
        let target = Target {
            operation: "set account password",
            kind: "Account",
            name: username,
        };
        self.send(
            target,
            self.request(Method::PATCH, &account_path(owner_uuid, username))
                .json(&json!({ "password": password })),
        )
        .await?;
        Ok(())
    }
}

fn account_path(owner_uuid: &str, username: &str) -> String {
    format!(
        "/security/accounts/{}/{}",
        urlencoding::encode(owner_uuid),
        urlencoding::encode(username)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{Credentials, InterfaceRole};
    use assert_matches::assert_matches;
    use std::net::IpAddr;
    use wiremock::matchers::{basic_auth, body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const USER: &str = "admin";
    const PASSWORD: &str = "netapp1!";

    fn client_for(server: &MockServer) -> OntapClient {
        OntapClient::new(OntapConfig {
            endpoint: server.uri(),
            username: USER.into(),
            password: PASSWORD.into(),
            ..OntapConfig::default()
        })
        .unwrap()
    }

    fn data_interface() -> InterfaceSpec {
        InterfaceSpec {
            name: "data-lif-0".into(),
            ip: IpAddr::from([10, 0, 0, 11]),
            netmask: 24,
            role: InterfaceRole::Data,
            vip: false,
            service_policy: "default-data-nvme-tcp".into(),
            svm_uuid: "svm-uuid-1".into(),
            node_uuid: "node-uuid-1".into(),
        }
    }

    fn target() -> Target<'static> {
        Target {
            operation: "create account",
            kind: "Account",
            name: "vsadmin",
        }
    }

    #[test]
    fn test_svm_record_conversion() {
        let body = r#"{
            "records": [{
                "uuid": "02c9e252-41be-11e9-81d5-00a0986138f7",
                "name": "tenant-a",
                "state": "running",
                "nvme": { "enabled": true, "allowed": true },
                "aggregates": [{ "name": "aggr1", "uuid": "a1" }, { "name": "aggr2" }]
            }],
            "num_records": 1
        }"#;
        let collection: Collection<SvmRecord> = serde_json::from_str(body).unwrap();
        let svm: Svm = collection.records.into_iter().next().unwrap().into();

        assert_eq!(svm.uuid.as_deref(), Some("02c9e252-41be-11e9-81d5-00a0986138f7"));
        assert_eq!(svm.state, SvmState::Running);
        assert!(svm.nvme_enabled);
        assert_eq!(svm.aggregates, vec!["aggr1", "aggr2"]);
        assert!(svm.is_ready());
    }

    #[test]
    fn test_svm_record_without_state() {
        let record: SvmRecord = serde_json::from_str(r#"{ "name": "tenant-a" }"#).unwrap();
        let svm = Svm::from(record);
        assert_eq!(svm.state, SvmState::Creating);
        assert!(!svm.nvme_enabled);
        assert!(!svm.is_ready());
    }

    #[test]
    fn test_empty_collection() {
        let collection: Collection<NodeRecord> =
            serde_json::from_str(r#"{ "num_records": 0 }"#).unwrap();
        assert!(collection.records.is_empty());
    }

    #[test]
    fn test_status_mapping() {
        assert_matches!(
            map_error(target(), StatusCode::NOT_FOUND, ""),
            Error::NotFound { .. }
        );
        assert_matches!(
            map_error(target(), StatusCode::CONFLICT, ""),
            Error::AlreadyExists { .. }
        );

        let duplicate = r#"{"error":{"message":"duplicate entry","code":"1"}}"#;
        assert_matches!(
            map_error(target(), StatusCode::BAD_REQUEST, duplicate),
            Error::AlreadyExists { .. }
        );

        let other = r#"{"error":{"message":"Failed to create LIF","code":"1377663"}}"#;
        assert_matches!(
            map_error(target(), StatusCode::BAD_REQUEST, other),
            Error::Controller { status: 400, ref message, .. } if message.contains("1377663")
        );

        assert_matches!(
            map_error(target(), StatusCode::SERVICE_UNAVAILABLE, "gateway down"),
            Error::Controller { status: 503, ref message, .. } if message == "gateway down"
        );
    }

    #[test]
    fn test_interface_body() {
        let spec = InterfaceSpec {
            name: "data-lif-0".into(),
            ip: IpAddr::from([10, 0, 0, 11]),
            netmask: 32,
            role: InterfaceRole::Data,
            vip: true,
            service_policy: "default-data-nvme-tcp".into(),
            svm_uuid: "svm-uuid".into(),
            node_uuid: "node-uuid".into(),
        };
        let body = interface_body(&spec);

        assert_eq!(body["ip"]["address"], "10.0.0.11");
        assert_eq!(body["ip"]["netmask"], "32");
        assert_eq!(body["vip"], true);
        assert_eq!(body["location"]["home_node"]["uuid"], "node-uuid");
        assert_eq!(body["service_policy"]["name"], "default-data-nvme-tcp");
    }

    #[test]
    fn test_svm_body_uses_every_aggregate() {
        let body = svm_body(&SvmCreateRequest {
            name: "tenant-a".into(),
            aggregates: vec!["aggr1".into(), "aggr2".into()],
            nvme_enabled: true,
        });
        assert_eq!(body["aggregates"].as_array().unwrap().len(), 2);
        assert_eq!(body["nvme"]["enabled"], true);
    }

    #[test]
    fn test_account_body_and_path() {
        let body = account_body(&AccountSpec {
            owner_uuid: "svm-uuid".into(),
            role: "vsadmin".into(),
            credentials: Credentials::new("vsadmin", "ab12cdef"),
        });
        assert_eq!(body["owner"]["uuid"], "svm-uuid");
        assert_eq!(body["role"]["name"], "vsadmin");
        assert_eq!(body["applications"].as_array().unwrap().len(), 2);

        assert_eq!(
            account_path("svm uuid", "vs/admin"),
            "/security/accounts/svm%20uuid/vs%2Fadmin"
        );
    }

    #[test]
    fn test_client_url() {
        let client = OntapClient::new(OntapConfig {
            endpoint: "https://cluster-mgmt/".into(),
            ..OntapConfig::default()
        })
        .unwrap();
        assert_eq!(client.url("/svm/svms"), "https://cluster-mgmt/api/svm/svms");
    }

    #[tokio::test]
    async fn test_get_svm_by_name_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/svm/svms"))
            .and(query_param("name", "tenant-a"))
            .and(query_param("fields", SVM_FIELDS))
            .and(basic_auth(USER, PASSWORD))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [{
                    "uuid": "svm-uuid-1",
                    "name": "tenant-a",
                    "state": "running",
                    "nvme": { "enabled": true }
                }],
                "num_records": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let svm = client_for(&server)
            .get_svm_by_name("tenant-a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(svm.uuid.as_deref(), Some("svm-uuid-1"));
        assert!(svm.is_ready());
    }

    #[tokio::test]
    async fn test_get_svm_by_name_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/svm/svms"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "records": [], "num_records": 0 })),
            )
            .mount(&server)
            .await;

        assert!(client_for(&server)
            .get_svm_by_name("tenant-a")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_get_svm_missing_uuid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/svm/svms/svm-uuid-9"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": { "message": "entry doesn't exist", "code": "4" }
            })))
            .mount(&server)
            .await;

        assert_matches!(
            client_for(&server).get_svm("svm-uuid-9").await,
            Err(Error::NotFound { ref kind, ref name }) if kind == "Svm" && name == "svm-uuid-9"
        );
    }

    #[tokio::test]
    async fn test_create_svm_posts_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/svm/svms"))
            .and(basic_auth(USER, PASSWORD))
            .and(body_partial_json(json!({
                "name": "tenant-a",
                "aggregates": [{ "name": "aggr1" }],
                "nvme": { "enabled": true }
            })))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "job": { "uuid": "j1" } })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .create_svm(&SvmCreateRequest {
                name: "tenant-a".into(),
                aggregates: vec!["aggr1".into()],
                nvme_enabled: true,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_interface_error_mapping() {
        let cases = [
            (409u16, json!({ "error": { "message": "conflict" } })),
            (
                400,
                json!({ "error": { "message": "Duplicate entry for data-lif-0", "code": "1" } }),
            ),
            (500, json!({ "error": { "message": "port unavailable", "code": "1377663" } })),
        ];

        for (status, body) in cases {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/api/network/ip/interfaces"))
                .and(body_partial_json(json!({
                    "name": "data-lif-0",
                    "location": { "home_node": { "uuid": "node-uuid-1" } }
                })))
                .respond_with(ResponseTemplate::new(status).set_body_json(body))
                .expect(1)
                .mount(&server)
                .await;

            let result = client_for(&server).create_interface(&data_interface()).await;
            match status {
                500 => assert_matches!(
                    result,
                    Err(Error::Controller { status: 500, ref message, .. })
                        if message.contains("port unavailable")
                ),
                _ => assert_matches!(result, Err(Error::AlreadyExists { ref name, .. }) if name == "data-lif-0"),
            }
        }
    }

    #[tokio::test]
    async fn test_get_account_not_found_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/security/accounts/svm-uuid-1/vsadmin"))
            .and(basic_auth(USER, PASSWORD))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        assert!(client_for(&server)
            .get_account("svm-uuid-1", "vsadmin")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_get_account_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/security/accounts/svm-uuid-1/vsadmin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "vsadmin",
                "owner": { "uuid": "svm-uuid-1", "name": "tenant-a" },
                "role": { "name": "vsadmin" },
                "locked": false
            })))
            .mount(&server)
            .await;

        let account = client_for(&server)
            .get_account("svm-uuid-1", "vsadmin")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.owner_uuid, "svm-uuid-1");
        assert_eq!(account.role, "vsadmin");
        assert!(!account.locked);
    }

    #[tokio::test]
    async fn test_get_account_server_error_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/security/accounts/svm-uuid-1/vsadmin"))
            .respond_with(ResponseTemplate::new(503).set_body_string("gateway down"))
            .mount(&server)
            .await;

        assert_matches!(
            client_for(&server).get_account("svm-uuid-1", "vsadmin").await,
            Err(Error::Controller { status: 503, ref message, .. }) if message == "gateway down"
        );
    }

    #[tokio::test]
    async fn test_set_account_password_patches() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/security/accounts/svm-uuid-1/vsadmin"))
            .and(basic_auth(USER, PASSWORD))
            .and(body_partial_json(json!({ "password": "ab12cdef" })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .set_account_password("svm-uuid-1", "vsadmin", "ab12cdef")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_account_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/security/accounts"))
            .and(body_partial_json(json!({ "name": "vsadmin", "owner": { "uuid": "svm-uuid-1" } })))
            .respond_with(ResponseTemplate::new(409))
            .expect(1)
            .mount(&server)
            .await;

        let spec = AccountSpec {
            owner_uuid: "svm-uuid-1".into(),
            role: "vsadmin".into(),
            credentials: Credentials::new("vsadmin", "ab12cdef"),
        };
        let err = client_for(&server).create_account(&spec).await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_peer_group_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/network/ip/bgp/peer-groups"))
            .and(query_param("fields", "name"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [{ "name": "pg1" }],
                "num_records": 3
            })))
            .mount(&server)
            .await;
        assert_eq!(client_for(&server).bgp_peer_group_count().await.unwrap(), 3);

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/network/ip/bgp/peer-groups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [{ "name": "pg1" }, { "name": "pg2" }]
            })))
            .mount(&server)
            .await;
        assert_eq!(client_for(&server).bgp_peer_group_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_list_nodes_and_aggregates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cluster/nodes"))
            .and(query_param("fields", "uuid,name"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [
                    { "uuid": "node-uuid-2", "name": "n2" },
                    { "uuid": "node-uuid-1", "name": "n1" }
                ],
                "num_records": 2
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/storage/aggregates"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [{ "uuid": "aggr-uuid-1", "name": "aggr1" }]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let nodes = client.list_nodes().await.unwrap();
        let names: Vec<_> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["n2", "n1"]);
        assert_eq!(client.list_aggregates().await.unwrap()[0].name, "aggr1");
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cluster/nodes"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        assert_matches!(
            client_for(&server).list_nodes().await,
            Err(Error::JsonParse(_))
        );
    }
}
