use crate::client::{
    model::{CaseStatus, Submission, SubmissionId, SubmissionStatus, TestCaseResult},
    ApiErr, JudgeApi,
};
use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

/// What the mock backend answers to one poll cycle.
#[derive(Debug, Clone)]
pub enum MockPoll {
    Ok(Submission, Vec<TestCaseResult>),
    NetworkError,
    NotFound,
}

/// A scripted [`JudgeApi`]. Every `fetch_submission` starts a new poll cycle
/// and answers with the next scripted entry; `fetch_results` answers from the
/// cycle in progress, so a cycle whose submission fetch failed does not shift
/// the script. The last entry repeats forever.
pub struct MockApi {
    script: Mutex<Vec<MockPoll>>,
    solved: Mutex<Vec<i64>>,
    /// Index of the cycle in progress, plus one
    cycles: AtomicUsize,
    submission_calls: AtomicUsize,
    results_calls: AtomicUsize,
    solved_calls: AtomicUsize,
}

impl MockApi {
    pub fn new() -> MockApi {
        MockApi::with_script(vec![])
    }

    pub fn with_script(script: Vec<MockPoll>) -> MockApi {
        MockApi {
            script: Mutex::new(script),
            solved: Mutex::new(vec![]),
            cycles: AtomicUsize::new(0),
            submission_calls: AtomicUsize::new(0),
            results_calls: AtomicUsize::new(0),
            solved_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_solved(&self, solved: Vec<i64>) {
        *self.solved.lock().unwrap() = solved;
    }

    pub fn submission_calls(&self) -> usize {
        self.submission_calls.load(Ordering::SeqCst)
    }

    pub fn results_calls(&self) -> usize {
        self.results_calls.load(Ordering::SeqCst)
    }

    pub fn solved_calls(&self) -> usize {
        self.solved_calls.load(Ordering::SeqCst)
    }

    fn nth(&self, n: usize) -> MockPoll {
        let script = self.script.lock().unwrap();
        script
            .get(n)
            .or_else(|| script.last())
            .cloned()
            .expect("Mock script is empty")
    }
}

fn network_error() -> ApiErr {
    ApiErr::Any(anyhow::anyhow!("connection refused"))
}

#[async_trait]
impl JudgeApi for MockApi {
    async fn fetch_submission(&self, id: &SubmissionId) -> Result<Submission, ApiErr> {
        self.submission_calls.fetch_add(1, Ordering::SeqCst);
        let n = self.cycles.fetch_add(1, Ordering::SeqCst);
        match self.nth(n) {
            MockPoll::Ok(s, _) => Ok(s),
            MockPoll::NetworkError => Err(network_error()),
            MockPoll::NotFound => Err(ApiErr::NotFound(id.to_string())),
        }
    }

    async fn fetch_results(&self, id: &SubmissionId) -> Result<Vec<TestCaseResult>, ApiErr> {
        self.results_calls.fetch_add(1, Ordering::SeqCst);
        let n = self.cycles.load(Ordering::SeqCst).saturating_sub(1);
        match self.nth(n) {
            MockPoll::Ok(_, r) => Ok(r),
            MockPoll::NetworkError => Err(network_error()),
            MockPoll::NotFound => Err(ApiErr::NotFound(id.to_string())),
        }
    }

    async fn solved_problems(&self) -> Result<Vec<i64>, ApiErr> {
        self.solved_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.solved.lock().unwrap().clone())
    }
}

pub fn submission(id: &str, status: SubmissionStatus) -> Submission {
    Submission {
        id: id.into(),
        status,
        code: Some("int main() { return 0; }".into()),
        language: Some("cpp".into()),
        problem_id: Some(1),
        user_id: Some(7),
        max_time_used: None,
        max_memory_used: None,
        error_message: None,
        submitted_at: Some("2024-05-01T12:00:00".into()),
        username: Some("alice".into()),
        problem_title: Some("A + B".into()),
    }
}

pub fn case(id: i64, status: CaseStatus) -> TestCaseResult {
    TestCaseResult {
        id: Some(id),
        status,
        time_used: Some(3),
        memory_used: Some(1024),
        error_message: None,
        input_content: Some(Arc::from("1 2\n")),
        expected_output_content: Some(Arc::from("3\n")),
        actual_output_content: Some(Arc::from("3\n")),
    }
}

pub fn ok(status: SubmissionStatus, results: Vec<TestCaseResult>) -> MockPoll {
    MockPoll::Ok(submission("42", status), results)
}
