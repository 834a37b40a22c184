pub mod config;
mod err;
pub mod model;

pub use self::err::*;
use self::{config::ClientConfig, model::*};
use crate::{problems::ProblemQuery, session::SessionStore};
use async_trait::async_trait;
use reqwest::{header, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::{sync::Arc, time::Duration};
use tracing::instrument;

/// Name of the session cookie issued by the backend.
pub const SESSION_COOKIE: &str = "JSESSIONID";

/// The read side of the judge backend that observers depend on.
#[async_trait]
pub trait JudgeApi: Send + Sync {
    /// Fetch submission metadata. A submission that does not exist yields
    /// [`ApiErr::NotFound`].
    async fn fetch_submission(&self, id: &SubmissionId) -> Result<Submission, ApiErr>;

    /// Fetch all test case results appended so far, in backend order.
    async fn fetch_results(&self, id: &SubmissionId) -> Result<Vec<TestCaseResult>, ApiErr>;

    /// Ids of problems the current session has solved. Empty when not logged in.
    async fn solved_problems(&self) -> Result<Vec<i64>, ApiErr>;
}

/// [`JudgeApi`] over the backend's HTTP interface.
pub struct HttpJudgeApi {
    cfg: Arc<ClientConfig>,
    client: reqwest::Client,
    session: Arc<SessionStore>,
}

impl HttpJudgeApi {
    pub fn new(cfg: Arc<ClientConfig>, session: Arc<SessionStore>) -> Result<HttpJudgeApi, ApiErr> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(HttpJudgeApi {
            cfg,
            client,
            session,
        })
    }

    pub fn cfg(&self) -> &ClientConfig {
        &self.cfg
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    fn with_session(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.session.current() {
            Some(s) => req.header(header::COOKIE, format!("{}={}", SESSION_COOKIE, s)),
            None => req,
        }
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        self.with_session(self.client.get(url))
    }

    fn post(&self, url: Url) -> reqwest::RequestBuilder {
        self.with_session(self.client.post(url))
    }

    /// Enqueue a new submission and return its id.
    #[instrument(skip(self, code))]
    pub async fn submit(
        &self,
        problem_id: i64,
        code: String,
        language: String,
    ) -> Result<SubmissionId, ApiErr> {
        if code.trim().is_empty() {
            return Err(ApiErr::EmptyCode);
        }
        let req = SubmitRequest {
            problem_id,
            code,
            language,
        };
        let res = self
            .post(self.cfg.submit_endpoint()?)
            .json(&req)
            .send()
            .await?;
        let res = read_json::<SubmitResponse>(res).await?;
        tracing::info!(submission_id = %res.submission_id, "Submission accepted");
        Ok(res.submission_id)
    }

    /// The last code this session submitted to `problem_id`, if any.
    pub async fn latest_code(&self, problem_id: i64) -> Result<Option<LatestCode>, ApiErr> {
        let res = self
            .get(self.cfg.latest_endpoint()?)
            .query(&[("problemId", problem_id)])
            .send()
            .await?;
        let value = read_json::<serde_json::Value>(res).await?;
        Ok(LatestCode::from_value(&value))
    }

    pub async fn list_problems(&self, query: &ProblemQuery) -> Result<ProblemPage, ApiErr> {
        let (endpoint, params) = query.request_parts(&self.cfg)?;
        tracing::debug!("Listing problems from {} {:?}", endpoint, params);
        let res = self.get(endpoint).query(&params).send().await?;
        read_json(res).await
    }

    /// One page of submission history, newest first.
    pub async fn list_submissions(
        &self,
        scope: HistoryScope,
        page: u32,
        size: u32,
    ) -> Result<SubmissionPage, ApiErr> {
        let endpoint = self.cfg.history_endpoint(&scope)?;
        tracing::debug!("Listing submissions from {}", endpoint);
        let res = self
            .get(endpoint)
            .query(&[("page", page.max(1)), ("size", size.max(1))])
            .send()
            .await?;
        read_json(res).await
    }

    /// Log in and publish the new session to the session store.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ApiErr> {
        let req = LoginRequest {
            username: username.to_owned(),
            password: password.to_owned(),
        };
        let res = self
            .client
            .post(self.cfg.login_endpoint()?)
            .json(&req)
            .send()
            .await?;
        let session = res
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(session_from_set_cookie)
            .map(str::to_owned);
        // Surfaces the backend's error message for bad credentials
        read_json::<serde_json::Value>(res).await?;

        let session = session.ok_or_else(|| {
            ApiErr::Any(anyhow::anyhow!("Server did not issue a session cookie"))
        })?;
        tracing::info!("Logged in as {}", username);
        self.session.replace(Some(session.clone()));
        Ok(session)
    }
}

#[async_trait]
impl JudgeApi for HttpJudgeApi {
    async fn fetch_submission(&self, id: &SubmissionId) -> Result<Submission, ApiErr> {
        let res = self.get(self.cfg.submission_endpoint(id)?).send().await?;
        if res.status() == StatusCode::NOT_FOUND {
            return Err(ApiErr::NotFound(id.to_string()));
        }
        let submission = match read_json::<Option<Submission>>(res).await {
            Err(ApiErr::Status { message, .. }) if is_missing_submission_message(&message) => {
                return Err(ApiErr::NotFound(id.to_string()))
            }
            res => res?,
        };
        submission.ok_or_else(|| ApiErr::NotFound(id.to_string()))
    }

    async fn fetch_results(&self, id: &SubmissionId) -> Result<Vec<TestCaseResult>, ApiErr> {
        let res = self.get(self.cfg.result_endpoint(id)?).send().await?;
        Ok(read_json::<ResultList>(res).await?.into_vec())
    }

    async fn solved_problems(&self) -> Result<Vec<i64>, ApiErr> {
        if self.session.current().is_none() {
            return Ok(vec![]);
        }
        let res = self.get(self.cfg.solved_endpoint()?).send().await?;
        Ok(read_json::<SolvedList>(res)
            .await?
            .data
            .unwrap_or_default())
    }
}

/// Decode a JSON response. Non-success statuses become errors via
/// [`status_error`].
async fn read_json<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, ApiErr> {
    let status = res.status();
    let body = res.bytes().await?;
    if !status.is_success() {
        return Err(status_error(status, &body));
    }
    Ok(serde_json::from_slice(&body)?)
}

/// `401` means the session is missing or expired; anything else carries the
/// backend's error message, if it sent one.
fn status_error(status: StatusCode, body: &[u8]) -> ApiErr {
    if status == StatusCode::UNAUTHORIZED {
        tracing::warn!("Request rejected, session missing or expired");
        return ApiErr::NotLoggedIn;
    }
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error.or(b.message))
        .unwrap_or_default();
    tracing::warn!("Request failed. Status: {}; message: {:?}", status, message);
    ApiErr::Status {
        status: status.as_u16(),
        message,
    }
}

/// The backend reports unknown submissions as a server error with this text.
fn is_missing_submission_message(message: &str) -> bool {
    message.contains("未找到提交") || message.to_lowercase().contains("not found")
}

/// Extract the session id from one `Set-Cookie` header value.
fn session_from_set_cookie(value: &str) -> Option<&str> {
    let pair = value.split(';').next()?.trim();
    let (name, session) = pair.split_once('=')?;
    (name == SESSION_COOKIE && !session.is_empty()).then(|| session)
}
