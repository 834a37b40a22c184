//! Wire models of the judge backend. The client only ever reads these.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, sync::Arc};

/// Opaque identifier of a submission. The backend sends numbers, but nothing
/// here relies on that.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubmissionId(String);

impl SubmissionId {
    pub fn new(id: impl Into<String>) -> SubmissionId {
        SubmissionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<&str> for SubmissionId {
    fn from(s: &str) -> Self {
        SubmissionId::new(s)
    }
}

impl std::str::FromStr for SubmissionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("submission id cannot be empty".into());
        }
        Ok(SubmissionId::new(s))
    }
}

impl From<i64> for SubmissionId {
    fn from(n: i64) -> Self {
        SubmissionId(n.to_string())
    }
}

impl Serialize for SubmissionId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SubmissionId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Num(i64),
            Str(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Num(n) => SubmissionId::from(n),
            RawId::Str(s) => SubmissionId(s),
        })
    }
}

/// Overall status of a submission. Once it leaves `Pending`/`Running` it
/// never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "RUNNING")]
    Running,
    #[serde(rename = "AC")]
    Accepted,
    #[serde(rename = "WA")]
    WrongAnswer,
    #[serde(rename = "TLE")]
    TimeLimitExceeded,
    #[serde(rename = "MLE")]
    MemoryLimitExceeded,
    #[serde(rename = "RE")]
    RuntimeError,
    #[serde(rename = "CE")]
    CompileError,
}

impl SubmissionStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SubmissionStatus::Pending | SubmissionStatus::Running)
    }

    pub fn code(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "PENDING",
            SubmissionStatus::Running => "RUNNING",
            SubmissionStatus::Accepted => "AC",
            SubmissionStatus::WrongAnswer => "WA",
            SubmissionStatus::TimeLimitExceeded => "TLE",
            SubmissionStatus::MemoryLimitExceeded => "MLE",
            SubmissionStatus::RuntimeError => "RE",
            SubmissionStatus::CompileError => "CE",
        }
    }

    /// Human-readable label used in the status banner.
    pub fn label(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "Pending",
            SubmissionStatus::Running => "Judging",
            SubmissionStatus::Accepted => "Accepted",
            SubmissionStatus::WrongAnswer => "Wrong Answer",
            SubmissionStatus::TimeLimitExceeded => "Time Limit Exceeded",
            SubmissionStatus::MemoryLimitExceeded => "Memory Limit Exceeded",
            SubmissionStatus::RuntimeError => "Runtime Error",
            SubmissionStatus::CompileError => "Compile Error",
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Status of a single test case. Unlike [`SubmissionStatus`] this set is
/// open; unknown codes are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CaseStatus {
    Pending,
    Running,
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    RuntimeError,
    CompileError,
    Other(String),
}

impl CaseStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CaseStatus::Pending | CaseStatus::Running)
    }

    pub fn code(&self) -> &str {
        match self {
            CaseStatus::Pending => "PENDING",
            CaseStatus::Running => "RUNNING",
            CaseStatus::Accepted => "AC",
            CaseStatus::WrongAnswer => "WA",
            CaseStatus::TimeLimitExceeded => "TLE",
            CaseStatus::MemoryLimitExceeded => "MLE",
            CaseStatus::RuntimeError => "RE",
            CaseStatus::CompileError => "CE",
            CaseStatus::Other(s) => s,
        }
    }
}

impl From<String> for CaseStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PENDING" => CaseStatus::Pending,
            "RUNNING" => CaseStatus::Running,
            "AC" => CaseStatus::Accepted,
            "WA" => CaseStatus::WrongAnswer,
            "TLE" => CaseStatus::TimeLimitExceeded,
            "MLE" => CaseStatus::MemoryLimitExceeded,
            "RE" => CaseStatus::RuntimeError,
            "CE" => CaseStatus::CompileError,
            _ => CaseStatus::Other(s),
        }
    }
}

impl From<CaseStatus> for String {
    fn from(s: CaseStatus) -> Self {
        s.code().to_owned()
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: SubmissionId,
    pub status: SubmissionStatus,
    pub code: Option<String>,
    pub language: Option<String>,
    pub problem_id: Option<i64>,
    pub user_id: Option<i64>,
    /// Milliseconds
    pub max_time_used: Option<i64>,
    /// Kilobytes
    pub max_memory_used: Option<i64>,
    pub error_message: Option<String>,
    /// Backend-local timestamp, e.g. `2024-05-01T12:00:00`
    pub submitted_at: Option<String>,
    pub username: Option<String>,
    pub problem_title: Option<String>,
}

impl Submission {
    pub fn submitted_at(&self) -> Option<chrono::NaiveDateTime> {
        self.submitted_at
            .as_deref()
            .and_then(|s| s.parse::<chrono::NaiveDateTime>().ok())
    }
}

/// Result of one test case. Rows are only ever appended by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    pub id: Option<i64>,
    pub status: CaseStatus,
    pub time_used: Option<i64>,
    pub memory_used: Option<i64>,
    pub error_message: Option<String>,
    pub input_content: Option<Arc<str>>,
    pub expected_output_content: Option<Arc<str>>,
    pub actual_output_content: Option<Arc<str>>,
}

impl TestCaseResult {
    pub fn blob(&self, kind: BlobKind) -> Option<&Arc<str>> {
        match kind {
            BlobKind::Input => self.input_content.as_ref(),
            BlobKind::Expected => self.expected_output_content.as_ref(),
            BlobKind::Actual => self.actual_output_content.as_ref(),
        }
    }
}

/// The three text payloads attached to a test case result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobKind {
    Input,
    Expected,
    Actual,
}

impl BlobKind {
    pub const ALL: [BlobKind; 3] = [BlobKind::Input, BlobKind::Expected, BlobKind::Actual];

    pub fn label(self) -> &'static str {
        match self {
            BlobKind::Input => "Input",
            BlobKind::Expected => "Expected output",
            BlobKind::Actual => "Actual output",
        }
    }
}

impl std::str::FromStr for BlobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input" | "in" => Ok(BlobKind::Input),
            "expected" | "ans" => Ok(BlobKind::Expected),
            "actual" | "out" | "output" => Ok(BlobKind::Actual),
            _ => Err(format!("unknown payload `{}`", s)),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultList {
    pub data: Option<Vec<TestCaseResult>>,
}

impl ResultList {
    pub fn into_vec(self) -> Vec<TestCaseResult> {
        self.data.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub problem_id: i64,
    pub code: String,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub submission_id: SubmissionId,
}

/// The last code a user submitted to a problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestCode {
    pub code: String,
    pub language: Option<String>,
}

impl LatestCode {
    /// The endpoint answers with a submission, `{}`, or a "not logged in"
    /// object. Only the first carries code.
    pub fn from_value(v: &serde_json::Value) -> Option<LatestCode> {
        let code = v.get("code")?.as_str()?;
        if code.is_empty() {
            return None;
        }
        Some(LatestCode {
            code: code.to_owned(),
            language: v
                .get("language")
                .and_then(|l| l.as_str())
                .map(str::to_owned),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    pub difficulty: Option<String>,
    pub number_of_submissions: Option<i64>,
    pub number_of_accepted: Option<i64>,
    pub categories: Option<Vec<String>>,
}

impl Problem {
    /// EASY < MEDIUM < HARD; unknown or missing difficulties rank 0.
    pub fn difficulty_rank(&self) -> u8 {
        match self.difficulty.as_deref() {
            Some("EASY") => 1,
            Some("MEDIUM") => 2,
            Some("HARD") => 3,
            _ => 0,
        }
    }

    /// Percentage of accepted submissions, 0 when nobody submitted yet.
    pub fn pass_rate(&self) -> f64 {
        let total = self.number_of_submissions.unwrap_or(0);
        if total <= 0 {
            return 0.0;
        }
        self.number_of_accepted.unwrap_or(0) as f64 / total as f64 * 100.0
    }

    pub fn categories(&self) -> &[String] {
        self.categories.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemPage {
    pub data: Option<Vec<Problem>>,
    pub total: Option<i64>,
}

/// Which submissions a history listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryScope {
    Recent,
    User(i64),
    Problem(i64),
}

/// One page of submission history. Entries carry no test case results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionPage {
    pub data: Option<Vec<Submission>>,
    pub total: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolvedList {
    pub data: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Error payload returned by the backend's exception handler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: Option<String>,
    pub message: Option<String>,
}
