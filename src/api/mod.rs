pub mod resources;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::api::resources::{AppEntity, BuildpackEntity, QueryResponse, Resource, ResourceKind};
use crate::command::CommandExecutor;
use crate::config::Backend;
use crate::error::{HarnessError, HarnessResult, StatusCategory};
use crate::identity::SessionEnv;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiMethod {
    Get,
    Put,
    Post,
    Delete,
}

impl ApiMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: ApiMethod,
    pub path: String,
    pub body: Option<Value>,
    pub timeout: Duration,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            method: ApiMethod::Get,
            path: path.into(),
            body: None,
            timeout,
        }
    }

    pub fn put(path: impl Into<String>, body: Value, timeout: Duration) -> Self {
        Self {
            method: ApiMethod::Put,
            path: path.into(),
            body: Some(body),
            timeout,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub trait ApiTransport: Send + Sync + 'static {
    fn send(
        &self,
        executor: &CommandExecutor,
        session: &SessionEnv,
        request: &ApiRequest,
    ) -> HarnessResult<ApiResponse>;
}

pub type SharedApiTransport = Arc<dyn ApiTransport>;

#[derive(Clone)]
pub struct ApiClient {
    transport: SharedApiTransport,
    executor: CommandExecutor,
}

impl ApiClient {
    pub fn new(transport: SharedApiTransport, executor: CommandExecutor) -> Self {
        Self {
            transport,
            executor,
        }
    }

    pub fn request(&self, session: &SessionEnv, request: &ApiRequest) -> HarnessResult<Value> {
        debug!(
            identity = session.identity().label(),
            method = request.method.as_str(),
            path = %request.path,
            "api request"
        );
        let response = self.transport.send(&self.executor, session, request)?;
        if !response.is_success() {
            return Err(HarnessError::Api {
                method: request.method.as_str().to_string(),
                path: request.path.clone(),
                category: StatusCategory::from_status(response.status),
                status: Some(response.status),
                raw_body: response.body,
            });
        }
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(response.body.as_str()).map_err(|source| HarnessError::Decode {
            context: format!("{} {} response", request.method.as_str(), request.path),
            source,
        })
    }

    pub fn query<E>(
        &self,
        session: &SessionEnv,
        kind: ResourceKind,
        name: &str,
        timeout: Duration,
    ) -> HarnessResult<Vec<Resource<E>>>
    where
        E: DeserializeOwned,
    {
        let request = ApiRequest::get(kind.query_path(name), timeout);
        let value = self.request(session, &request)?;
        let envelope: QueryResponse<E> =
            serde_json::from_value(value).map_err(|source| HarnessError::Decode {
                context: format!("{} query envelope", kind.label()),
                source,
            })?;
        Ok(envelope.resources)
    }

    pub fn find_by_name<E>(
        &self,
        session: &SessionEnv,
        kind: ResourceKind,
        name: &str,
        timeout: Duration,
    ) -> HarnessResult<Resource<E>>
    where
        E: DeserializeOwned,
    {
        let mut resources = self.query::<E>(session, kind, name, timeout)?;
        match resources.len() {
            0 => Err(HarnessError::NotFound {
                kind: kind.label().to_string(),
                name: name.to_string(),
            }),
            1 => Ok(resources.remove(0)),
            count => Err(HarnessError::AmbiguousResource {
                kind: kind.label().to_string(),
                name: name.to_string(),
                count,
            }),
        }
    }

    pub fn buildpack(
        &self,
        session: &SessionEnv,
        name: &str,
        timeout: Duration,
    ) -> HarnessResult<Resource<BuildpackEntity>> {
        self.find_by_name(session, ResourceKind::Buildpack, name, timeout)
    }

    pub fn app(
        &self,
        session: &SessionEnv,
        name: &str,
        timeout: Duration,
    ) -> HarnessResult<Resource<AppEntity>> {
        self.find_by_name(session, ResourceKind::App, name, timeout)
    }

    pub fn set_buildpack_enabled(
        &self,
        session: &SessionEnv,
        guid: &str,
        enabled: bool,
        timeout: Duration,
    ) -> HarnessResult<Value> {
        info!(buildpack_guid = guid, enabled, "updating buildpack");
        let request = ApiRequest::put(
            ResourceKind::Buildpack.item_path(guid),
            json!({ "enabled": enabled }),
            timeout,
        );
        self.request(session, &request)
    }

    pub fn set_app_command(
        &self,
        session: &SessionEnv,
        guid: &str,
        command: &str,
        timeout: Duration,
    ) -> HarnessResult<Value> {
        info!(app_guid = guid, "updating app start command");
        let request = ApiRequest::put(
            ResourceKind::App.item_path(guid),
            json!({ "command": command }),
            timeout,
        );
        self.request(session, &request)
    }

    pub fn set_app_backend(
        &self,
        session: &SessionEnv,
        guid: &str,
        backend: Backend,
        timeout: Duration,
    ) -> HarnessResult<Value> {
        info!(app_guid = guid, backend = backend.as_str(), "selecting app backend");
        let request = ApiRequest::put(
            ResourceKind::App.item_path(guid),
            json!({ "diego": backend.is_diego() }),
            timeout,
        );
        self.request(session, &request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::cli::CfCli;
    use crate::command::{CommandResult, CommandRunner, CommandSpec};
    use crate::config::Credentials;
    use crate::identity::Identity;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    struct NoCommands;

    impl CommandRunner for NoCommands {
        fn run(&self, spec: &CommandSpec) -> HarnessResult<CommandResult> {
            panic!("unexpected command {}", spec.display());
        }
    }

    #[derive(Clone, Default)]
    struct FakeTransport {
        seen: Arc<Mutex<Vec<ApiRequest>>>,
        next: Arc<Mutex<Vec<ApiResponse>>>,
    }

    impl FakeTransport {
        fn with_next(self, status: u16, body: &str) -> Self {
            self.next
                .lock()
                .expect("fake transport mutex poisoned")
                .push(ApiResponse {
                    status,
                    body: body.to_string(),
                });
            self
        }

        fn take_seen(&self) -> Vec<ApiRequest> {
            std::mem::take(&mut *self.seen.lock().expect("fake transport mutex poisoned"))
        }
    }

    impl ApiTransport for FakeTransport {
        fn send(
            &self,
            _executor: &CommandExecutor,
            _session: &SessionEnv,
            request: &ApiRequest,
        ) -> HarnessResult<ApiResponse> {
            self.seen
                .lock()
                .expect("fake transport mutex poisoned")
                .push(request.clone());
            let mut next = self.next.lock().expect("fake transport mutex poisoned");
            Ok(if next.is_empty() {
                ApiResponse {
                    status: 200,
                    body: String::from("{}"),
                }
            } else {
                next.remove(0)
            })
        }
    }

    fn client(transport: FakeTransport) -> ApiClient {
        ApiClient::new(
            Arc::new(transport),
            CommandExecutor::new(Arc::new(NoCommands), CfCli::new("cf")),
        )
    }

    fn session() -> SessionEnv {
        SessionEnv::new(
            Identity::new("admin", Credentials::new("admin", "pw")),
            "/tmp/homes/admin",
        )
    }

    const ONE_BUILDPACK: &str = r#"{
        "total_results": 1,
        "resources": [
            {"metadata": {"guid": "bp-guid-1", "url": "/v2/buildpacks/bp-guid-1"},
             "entity": {"name": "CATS-BP-1", "position": 1, "enabled": true, "locked": false}}
        ]
    }"#;

    #[test]
    fn find_by_name_returns_single_match_and_encodes_query() {
        let transport = FakeTransport::default().with_next(200, ONE_BUILDPACK);
        let api = client(transport.clone());

        let bp = api
            .buildpack(&session(), "CATS BP+1", Duration::from_secs(5))
            .expect("single buildpack should resolve");
        assert_eq!(bp.metadata.guid, "bp-guid-1");
        assert_eq!(bp.entity.name, "CATS-BP-1");

        let seen = transport.take_seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, ApiMethod::Get);
        assert_eq!(seen[0].path, "/v2/buildpacks?q=name%3ACATS+BP%2B1");
    }

    #[test]
    fn find_by_name_never_picks_first_of_many() {
        let two = r#"{"resources": [
            {"metadata": {"guid": "a"}, "entity": {"name": "dup"}},
            {"metadata": {"guid": "b"}, "entity": {"name": "dup"}}
        ]}"#;
        let api = client(
            FakeTransport::default()
                .with_next(200, two)
                .with_next(200, r#"{"resources": []}"#),
        );

        let err = api
            .app(&session(), "dup", Duration::from_secs(5))
            .expect_err("two matches are ambiguous");
        assert!(matches!(err, HarnessError::AmbiguousResource { count: 2, .. }));

        let err = api
            .app(&session(), "missing", Duration::from_secs(5))
            .expect_err("zero matches is not found");
        assert!(matches!(err, HarnessError::NotFound { ref name, .. } if name == "missing"));
    }

    #[test]
    fn non_success_status_is_categorized_with_raw_body() {
        let api = client(FakeTransport::default().with_next(
            404,
            r#"{"code": 10000, "description": "Unknown request"}"#,
        ));

        let err = api
            .set_app_command(&session(), "gone", "FOO=bar", Duration::from_secs(5))
            .expect_err("404 should fail");
        match err {
            HarnessError::Api {
                method,
                path,
                category,
                status,
                raw_body,
            } => {
                assert_eq!(method, "PUT");
                assert_eq!(path, "/v2/apps/gone");
                assert_eq!(category, StatusCategory::ClientError);
                assert_eq!(status, Some(404));
                assert!(raw_body.contains("Unknown request"));
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn updates_send_expected_bodies() {
        let transport = FakeTransport::default();
        let api = client(transport.clone());

        api.set_buildpack_enabled(&session(), "bp-guid-1", false, Duration::from_secs(5))
            .expect("disable should succeed");
        api.set_app_command(
            &session(),
            "app-guid-1",
            "FOO=bar bundle exec rackup config.ru -p $PORT",
            Duration::from_secs(5),
        )
        .expect("command update should succeed");
        api.set_app_backend(&session(), "app-guid-1", Backend::Diego, Duration::from_secs(5))
            .expect("backend update should succeed");

        let seen = transport.take_seen();
        assert_eq!(seen[0].path, "/v2/buildpacks/bp-guid-1");
        assert_eq!(seen[0].body, Some(json!({"enabled": false})));
        assert_eq!(
            seen[1].body,
            Some(json!({"command": "FOO=bar bundle exec rackup config.ru -p $PORT"}))
        );
        assert_eq!(seen[2].body, Some(json!({"diego": true})));
    }

    #[test]
    fn undecodable_body_is_a_decode_error() {
        let api = client(FakeTransport::default().with_next(200, "<html>not json</html>"));
        let err = api
            .request(&session(), &ApiRequest::get("/v2/info", Duration::from_secs(5)))
            .expect_err("html should not decode");
        assert_eq!(err.kind(), "decode");
    }
}
