use clap::{Args, Parser, Subcommand};
use ssoj_observer::{
    client::{
        config::ClientConfig,
        model::{BlobKind, HistoryScope, SubmissionId},
    },
    problems::SortKey,
};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(name = "ssoj", version, about = "Submit to and watch an online judge")]
pub struct Opts {
    #[clap(subcommand)]
    pub cmd: SubCmd,

    #[clap(flatten)]
    pub opt: GlobalOpts,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalOpts {
    /// Configuration file, defaults to `<config dir>/ssoj/config.toml`
    #[clap(long, short, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// The backend's host (include port if needed)
    #[clap(long, global = true)]
    pub host: Option<String>,

    /// Connect with https
    #[clap(long, global = true)]
    pub ssl: bool,

    /// Session id to use instead of the stored one
    #[clap(long, global = true, env = "SSOJ_SESSION", hide_env_values = true)]
    pub session: Option<String>,
}

impl GlobalOpts {
    /// Let command line flags override values read from the config file.
    pub fn apply(&self, cfg: &mut ClientConfig) {
        if let Some(host) = &self.host {
            cfg.host = host.clone();
        }
        if self.ssl {
            cfg.ssl = true;
        }
        if let Some(session) = &self.session {
            cfg.session = Some(session.clone());
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCmd {
    /// Watch a submission until it is judged
    #[clap(name = "watch")]
    Watch(WatchSubCmd),

    /// Submit code to a problem
    #[clap(name = "submit")]
    Submit(SubmitSubCmd),

    /// Show the code last submitted to a problem
    #[clap(name = "latest")]
    Latest(LatestSubCmd),

    /// List problems
    #[clap(name = "problems")]
    Problems(ProblemsSubCmd),

    /// Log in and remember the session
    #[clap(name = "login")]
    Login(LoginSubCmd),

    /// Copy the input or output of a test case to the clipboard
    #[clap(name = "copy")]
    Copy(CopySubCmd),

    /// List recent submissions, or those of one user or problem
    #[clap(name = "submissions")]
    Submissions(SubmissionsSubCmd),
}

#[derive(Args, Debug, Clone)]
pub struct WatchSubCmd {
    /// The submission to watch
    #[clap(required = true)]
    pub id: SubmissionId,

    /// Also show input and outputs of this test case (1-based)
    #[clap(long, short, value_name = "CASE")]
    pub expand: Option<usize>,

    /// Print the first response and exit instead of watching
    #[clap(long)]
    pub once: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SubmitSubCmd {
    /// Problem to submit to
    #[clap(long, short)]
    pub problem: i64,

    /// Language of the code, e.g. `cpp`, `java`, `python`
    #[clap(long, short)]
    pub language: String,

    /// File containing the code
    #[clap(required = true)]
    pub file: PathBuf,

    /// Watch the submission after submitting
    #[clap(long, short)]
    pub watch: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LatestSubCmd {
    #[clap(long, short)]
    pub problem: i64,

    /// Write the code to this file instead of stdout
    #[clap(long, short, value_name = "FILE")]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct ProblemsSubCmd {
    /// Search titles for this keyword
    #[clap(long, short)]
    pub keyword: Option<String>,

    /// Only show problems with this tag
    #[clap(long, short)]
    pub tag: Option<String>,

    /// One of `id`, `difficulty`, `pass-rate`. Repeating a key flips its
    /// order, like clicking a column header again
    #[clap(long, short)]
    pub sort: Vec<SortKey>,

    /// Reverse the resulting order
    #[clap(long)]
    pub desc: bool,

    #[clap(long, default_value = "1")]
    pub page: u32,

    #[clap(long, default_value = "20")]
    pub size: u32,

    /// Hide problems already solved by the current session
    #[clap(long)]
    pub unsolved: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LoginSubCmd {
    #[clap(long, short)]
    pub username: String,

    #[clap(long, env = "SSOJ_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Args, Debug, Clone)]
pub struct CopySubCmd {
    /// The submission the test case belongs to
    pub id: SubmissionId,

    /// Test case number (1-based)
    pub case: usize,

    /// One of `input`, `expected`, `actual`
    pub which: BlobKind,
}

#[derive(Args, Debug, Clone)]
pub struct SubmissionsSubCmd {
    /// Only submissions of this user id
    #[clap(long, short, conflicts_with = "problem")]
    pub user: Option<i64>,

    /// Only submissions to this problem
    #[clap(long, short)]
    pub problem: Option<i64>,

    #[clap(long, default_value = "1")]
    pub page: u32,

    #[clap(long, default_value = "20")]
    pub size: u32,
}

impl SubmissionsSubCmd {
    pub fn scope(&self) -> HistoryScope {
        match (self.user, self.problem) {
            (Some(user), _) => HistoryScope::User(user),
            (None, Some(problem)) => HistoryScope::Problem(problem),
            (None, None) => HistoryScope::Recent,
        }
    }
}
