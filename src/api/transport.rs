use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::api::{ApiMethod, ApiRequest, ApiResponse, ApiTransport};
use crate::command::cli::CfCommand;
use crate::command::CommandExecutor;
use crate::config::ConfigError;
use crate::error::{HarnessError, HarnessResult, StatusCategory};
use crate::identity::SessionEnv;

fn transport_error(request: &ApiRequest, raw_body: impl Into<String>) -> HarnessError {
    HarnessError::Api {
        method: request.method.as_str().to_string(),
        path: request.path.clone(),
        category: StatusCategory::Transport,
        status: None,
        raw_body: raw_body.into(),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CliCurlTransport;

impl ApiTransport for CliCurlTransport {
    fn send(
        &self,
        executor: &CommandExecutor,
        session: &SessionEnv,
        request: &ApiRequest,
    ) -> HarnessResult<ApiResponse> {
        let command = CfCommand::Curl {
            path: request.path.clone(),
            method: request.method,
            body: request.body.as_ref().map(Value::to_string),
            include_headers: true,
        };
        let result = executor.cf(session, &command, request.timeout)?;
        if !result.success() {
            return Err(transport_error(
                request,
                format!("{}{}", result.stdout, result.stderr),
            ));
        }
        Ok(parse_curl_output(result.stdout.as_str()))
    }
}

fn split_head(text: &str) -> (&str, &str) {
    let crlf = text.find("\r\n\r\n").map(|idx| (idx, 4));
    let lf = text.find("\n\n").map(|idx| (idx, 2));
    let split = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };
    match split {
        Some((idx, width)) => (&text[..idx], &text[idx + width..]),
        None => (text, ""),
    }
}

// `curl -i` output: one or more status blocks (informational 1xx first) followed
// by the body. Output without a status line is a bare 200 body.
pub fn parse_curl_output(raw: &str) -> ApiResponse {
    let mut rest = raw.trim_start();
    loop {
        if !rest.starts_with("HTTP/") {
            return ApiResponse {
                status: 200,
                body: rest.to_string(),
            };
        }
        let (head, body) = split_head(rest);
        let status = head
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|code| code.parse::<u16>().ok())
            .unwrap_or(0);
        if (100..200).contains(&status) {
            rest = body.trim_start();
            continue;
        }
        return ApiResponse {
            status,
            body: body.to_string(),
        };
    }
}

pub struct HttpApiTransport {
    client: Client,
    base: Url,
    tokens: Mutex<HashMap<PathBuf, String>>,
}

impl HttpApiTransport {
    pub fn new(api_url: &str, skip_ssl_validation: bool) -> HarnessResult<Self> {
        let base = Url::parse(api_url).map_err(|e| ConfigError::InvalidField {
            field: String::from("api"),
            message: e.to_string(),
        })?;
        let client = Client::builder()
            .danger_accept_invalid_certs(skip_ssl_validation)
            .build()
            .map_err(|e| HarnessError::HttpClientInit(e.to_string()))?;
        Ok(Self {
            client,
            base,
            tokens: Mutex::new(HashMap::new()),
        })
    }

    fn token(
        &self,
        executor: &CommandExecutor,
        session: &SessionEnv,
        request: &ApiRequest,
    ) -> HarnessResult<String> {
        if let Some(token) = self
            .tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session.home())
        {
            return Ok(token.clone());
        }

        let result = executor.cf(session, &CfCommand::OauthToken, request.timeout)?;
        let token = match (result.success(), result.last_stdout_line()) {
            (true, Some(line)) => line.to_string(),
            _ => {
                return Err(HarnessError::Provisioning {
                    message: format!(
                        "could not obtain an access token for '{}'",
                        session.identity().label()
                    ),
                    output: result.captured(),
                })
            }
        };
        debug!(identity = session.identity().label(), "cached access token");
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(session.home().to_path_buf(), token.clone());
        Ok(token)
    }

    fn forget_token(&self, session: &SessionEnv) {
        self.tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session.home());
    }

    fn execute(&self, request: &ApiRequest, token: &str) -> HarnessResult<ApiResponse> {
        let url = self
            .base
            .join(request.path.as_str())
            .map_err(|e| transport_error(request, format!("invalid api path: {e}")))?;
        let method = match request.method {
            ApiMethod::Get => Method::GET,
            ApiMethod::Put => Method::PUT,
            ApiMethod::Post => Method::POST,
            ApiMethod::Delete => Method::DELETE,
        };
        let mut builder = self
            .client
            .request(method, url)
            .header(AUTHORIZATION, token)
            .timeout(request.timeout);
        if let Some(body) = request.body.as_ref() {
            builder = builder.json(body);
        }
        let response = builder
            .send()
            .map_err(|e| transport_error(request, e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| transport_error(request, format!("failed to read body: {e}")))?;
        Ok(ApiResponse { status, body })
    }
}

impl ApiTransport for HttpApiTransport {
    fn send(
        &self,
        executor: &CommandExecutor,
        session: &SessionEnv,
        request: &ApiRequest,
    ) -> HarnessResult<ApiResponse> {
        let mut refreshed = false;
        loop {
            let token = self.token(executor, session, request)?;
            let response = self.execute(request, token.as_str())?;
            if response.status == 401 && !refreshed {
                warn!(
                    identity = session.identity().label(),
                    path = %request.path,
                    "access token rejected; refreshing"
                );
                self.forget_token(session);
                refreshed = true;
                continue;
            }
            return Ok(response);
        }
    }
}
