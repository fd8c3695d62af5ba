//! REST implementation of [`ClusterApi`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use repliq_engine::cluster::{ClusterApi, CreateRequest};
use repliq_engine::{
    ClusterIdentity, NodeNetworks, PathStatus, RawRelationship, ReplError, Result, Role,
};

use crate::config::ToolConfig;

const ENTRIES_PAGE: usize = 1000;

/// Authenticated session with one cluster's REST API.
#[derive(Debug)]
pub struct RestCluster {
    host: String,
    base_url: String,
    client: reqwest::Client,
    token: String,
    replication_port: u16,
}

#[derive(Deserialize)]
struct LoginResponse {
    bearer_token: String,
}

#[derive(Deserialize)]
struct ClusterSettings {
    cluster_name: String,
}

#[derive(Deserialize)]
struct NodeState {
    cluster_id: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct DirEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Paging {
    next: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct EntriesPage {
    files: Vec<DirEntry>,
    paging: Paging,
}

impl RestCluster {
    /// Log in to `host` and keep the session token.
    pub async fn connect(
        host: &str,
        user: &str,
        password: &str,
        config: &ToolConfig,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| ReplError::Connection {
                host: host.to_string(),
                msg: e.to_string(),
            })?;
        let base_url = format!("https://{}:{}", host, config.api_port);

        let response = client
            .post(format!("{}/v1/session/login", base_url))
            .json(&json!({ "username": user, "password": password }))
            .send()
            .await
            .map_err(|e| transport_error(host, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReplError::Auth {
                host: host.to_string(),
                msg: format!(
                    "login as {} rejected ({}): {}",
                    user,
                    status,
                    error_message(&body)
                ),
            });
        }
        let login: LoginResponse = response.json().await.map_err(|e| ReplError::Auth {
            host: host.to_string(),
            msg: format!("unexpected login response: {}", e),
        })?;

        info!("Logged in to {} as {}", host, user);
        Ok(Self {
            host: host.to_string(),
            base_url,
            client,
            token: login.bearer_token,
            replication_port: config.replication_port,
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        subject: &str,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        let mut request = self.client.request(method, &url).bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(&self.host, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(classify(&self.host, status, &text, subject))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, subject: &str) -> Result<T> {
        let response = self.send(Method::GET, path, None, subject).await?;
        decode(response).await
    }

    fn relationships_url(role: Role) -> &'static str {
        match role {
            Role::Source => "/v2/replication/source-relationships/",
            Role::Destination => "/v2/replication/target-relationships/",
        }
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status().as_u16();
    response.json().await.map_err(|e| ReplError::Remote {
        status,
        msg: format!("malformed response: {}", e),
    })
}

fn transport_error(host: &str, e: reqwest::Error) -> ReplError {
    ReplError::Connection {
        host: host.to_string(),
        msg: e.to_string(),
    }
}

/// URL segment addressing a file system path.
pub fn path_ref(path: &str) -> String {
    urlencoding::encode(path).into_owned()
}

/// Human-readable part of an error body.
pub fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["description", "error_class", "message"] {
            if let Some(msg) = value.get(key).and_then(Value::as_str) {
                return msg.to_string();
            }
        }
    }
    body.lines().next().unwrap_or_default().trim().to_string()
}

/// Map a rejected request onto the error taxonomy.
///
/// `subject` is the path or id the request was about.
pub fn classify(host: &str, status: StatusCode, body: &str, subject: &str) -> ReplError {
    let msg = error_message(body);
    let lowered = body.to_ascii_lowercase();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return ReplError::Auth {
            host: host.to_string(),
            msg: if msg.is_empty() { status.to_string() } else { msg },
        };
    }
    if lowered.contains("not_empty") || lowered.contains("not empty") {
        return ReplError::TargetNotEmpty {
            path: subject.to_string(),
        };
    }
    if status == StatusCode::CONFLICT
        || lowered.contains("already exists")
        || lowered.contains("already_exists")
    {
        return ReplError::AlreadyExists {
            path: subject.to_string(),
        };
    }
    ReplError::Remote {
        status: status.as_u16(),
        msg: if msg.is_empty() { status.to_string() } else { msg },
    }
}

/// Child count reported by an attributes record, which may be a number or a string.
fn child_count(attributes: &Value) -> u64 {
    match attributes.get("child_count") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

#[async_trait]
impl ClusterApi for RestCluster {
    fn host(&self) -> &str {
        &self.host
    }

    async fn cluster_identity(&self) -> Result<ClusterIdentity> {
        let settings: ClusterSettings = self
            .get_json("/v1/cluster/settings", "cluster settings")
            .await
            .map_err(|e| ReplError::IdentityLookup(e.to_string()))?;
        let node: NodeState = self
            .get_json("/v1/node/state", "node state")
            .await
            .map_err(|e| ReplError::IdentityLookup(e.to_string()))?;
        Ok(ClusterIdentity {
            name: settings.cluster_name,
            id: node.cluster_id,
        })
    }

    async fn list_relationships(&self, role: Role) -> Result<Vec<RawRelationship>> {
        let path = format!("{}status/", Self::relationships_url(role));
        self.get_json(&path, "relationship list").await
    }

    // allow_non_empty takes effect when the destination authorizes the relationship
    async fn create_relationship(&self, request: &CreateRequest) -> Result<RawRelationship> {
        let body = json!({
            "source_root_path": request.source_path,
            "target_root_path": request.target_path,
            "target_address": request.target_address,
            "target_port": self.replication_port,
            "replication_enabled": true,
        });
        let response = self
            .send(
                Method::POST,
                Self::relationships_url(Role::Source),
                Some(body),
                &request.source_path,
            )
            .await?;
        decode(response).await
    }

    async fn accept_relationship(
        &self,
        id: &str,
        allow_non_empty: bool,
    ) -> Result<RawRelationship> {
        let path = format!(
            "{}{}/authorize?allow-non-empty-directory={}&allow-fs-path-create=true",
            Self::relationships_url(Role::Destination),
            path_ref(id),
            allow_non_empty
        );
        let response = self.send(Method::POST, &path, None, id).await?;
        decode(response).await
    }

    async fn delete_relationship(&self, role: Role, id: &str) -> Result<()> {
        let path = format!("{}{}", Self::relationships_url(role), path_ref(id));
        self.send(Method::DELETE, &path, None, id).await?;
        Ok(())
    }

    async fn set_readonly(&self, path: &str) -> Result<()> {
        let url = format!("/v1/files/{}/info/attributes", path_ref(path));
        self.send(Method::PATCH, &url, Some(json!({ "mode": "0555" })), path)
            .await?;
        Ok(())
    }

    async fn list_networks(&self) -> Result<Vec<NodeNetworks>> {
        self.get_json("/v2/network/interfaces/1/status/", "network status")
            .await
    }

    async fn list_subdirectories(&self, basepath: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut next = Some(format!(
            "/v1/files/{}/entries/?limit={}",
            path_ref(basepath),
            ENTRIES_PAGE
        ));
        while let Some(url) = next.take() {
            let page: EntriesPage = self.get_json(&url, basepath).await?;
            names.extend(
                page.files
                    .into_iter()
                    .filter(|e| e.kind == "FS_FILE_TYPE_DIRECTORY")
                    .map(|e| e.name),
            );
            next = page.paging.next.filter(|n| !n.is_empty());
        }
        Ok(names)
    }

    async fn path_status(&self, path: &str) -> Result<PathStatus> {
        let url = format!("/v1/files/{}/info/attributes", path_ref(path));
        match self.get_json::<Value>(&url, path).await {
            Ok(attributes) => match child_count(&attributes) {
                0 => Ok(PathStatus::Empty),
                n => Ok(PathStatus::NonEmpty(n)),
            },
            Err(ReplError::Remote { status: 404, .. }) => Ok(PathStatus::Absent),
            Err(e) => Err(e),
        }
    }
}
