use anyhow::{bail, Context};
use clap::Parser;
use itertools::Itertools;
use ssoj_observer::{
    client::{
        config::ClientConfig,
        model::{BlobKind, CaseStatus, SubmissionId},
        HttpJudgeApi, JudgeApi,
    },
    observer::{ObserveOptions, Phase, Snapshot, SubmissionObserver},
    problems::{ProblemFilter, ProblemQuery, SortSpec},
    render::{
        copy_to_clipboard, CopyMethod, DiffRenderer, Outputs, PayloadRenderer, PayloadState,
        RenderedText,
    },
    session::{SessionStore, SolvedSet},
    view,
};
use std::{
    io::IsTerminal,
    path::Path,
    process::exit,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod opt;

static CTRL_C: AtomicBool = AtomicBool::new(false);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt = opt::Opts::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancellationToken::new();
    ctrlc::set_handler({
        let cancel = cancel.clone();
        move || handle_ctrl_c(&cancel)
    })
    .context("Failed to set termination handler")?;

    let cfg_path = match &opt.opt.config {
        Some(path) => path.clone(),
        None => ClientConfig::default_path()?,
    };
    let mut cfg = ClientConfig::load(&cfg_path)
        .await
        .with_context(|| format!("Failed to read config at {}", cfg_path.display()))?;
    opt.opt.apply(&mut cfg);
    let cfg = Arc::new(cfg);

    let session = Arc::new(SessionStore::new(cfg.session.clone()));
    let api = Arc::new(HttpJudgeApi::new(cfg.clone(), session)?);

    match opt.cmd {
        opt::SubCmd::Watch(cmd) => watch(api, cmd.id, cmd.expand, cmd.once, cancel).await,
        opt::SubCmd::Submit(cmd) => submit(api, cmd, cancel).await,
        opt::SubCmd::Latest(cmd) => latest(&api, cmd).await,
        opt::SubCmd::Problems(cmd) => problems(api, cmd).await,
        opt::SubCmd::Login(cmd) => login(&api, cmd, &cfg_path).await,
        opt::SubCmd::Copy(cmd) => copy(&api, cmd).await,
        opt::SubCmd::Submissions(cmd) => submissions(&api, cmd).await,
    }
}

fn handle_ctrl_c(cancel: &CancellationToken) {
    if !CTRL_C.swap(true, Ordering::SeqCst) {
        tracing::warn!("Stopping... Press Ctrl-C again to force quit.");
        cancel.cancel();
    } else {
        tracing::error!("Force quit!");
        exit(101);
    }
}

async fn watch(
    api: Arc<HttpJudgeApi>,
    id: SubmissionId,
    expand: Option<usize>,
    once: bool,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let opts = ObserveOptions::from(&api.cfg().poll);
    let mut renderers = BlobKind::ALL
        .iter()
        .map(|_| PayloadRenderer::new(api.cfg().render.clone()))
        .collect::<Vec<_>>();
    let mut diff = DiffRenderer::new(api.cfg().render.clone());

    let observer = SubmissionObserver::start_observing(api, id, opts);
    let mut snapshots = observer.subscribe();
    let interactive = std::io::stdout().is_terminal();

    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        if interactive {
            print!("\x1b[2J\x1b[H");
        }
        print!("{}", view::render_snapshot(&snapshot));
        if let Some(n) = expand {
            tokio::select! {
                _ = cancel.cancelled() => {
                    observer.stop_observing();
                    break;
                }
                // Layout in progress carries over to the newer snapshot
                Ok(()) = snapshots.changed() => continue,
                _ = print_case(&snapshot, n, &mut renderers, &mut diff) => {}
            }
        }
        if once && snapshot.phase != Phase::Loading {
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                observer.stop_observing();
                break;
            }
            res = snapshots.changed() => {
                if res.is_err() {
                    break;
                }
            }
        }
    }

    for r in renderers.iter_mut() {
        r.teardown();
    }
    diff.teardown();
    match observer.snapshot().phase {
        Phase::NotFound => bail!("Submission {} does not exist", observer.id()),
        _ => Ok(()),
    }
}

async fn print_case(
    snapshot: &Snapshot,
    n: usize,
    renderers: &mut [PayloadRenderer],
    diff: &mut DiffRenderer,
) {
    let case = match n.checked_sub(1).and_then(|idx| snapshot.results.get(idx)) {
        Some(case) => case,
        None => {
            println!("\nCase #{} has no result yet", n);
            return;
        }
    };

    for (kind, r) in BlobKind::ALL.iter().zip(renderers.iter_mut()) {
        let blob = case.blob(*kind).cloned();
        // Every poll decodes fresh payloads; only re-render real changes
        if r.state() == PayloadState::Idle || r.blob().map(|b| &**b) != blob.as_deref() {
            r.set_blob(blob);
        }
    }
    let outputs: Option<Outputs> = match (
        case.blob(BlobKind::Actual),
        case.blob(BlobKind::Expected),
    ) {
        (Some(actual), Some(expected)) if case.status != CaseStatus::Accepted => {
            Some((actual.clone(), expected.clone()))
        }
        _ => None,
    };
    let shown = diff.outputs().map(|(a, e)| (&**a, &**e));
    let next = outputs.as_ref().map(|(a, e)| (&**a, &**e));
    if diff.state() == PayloadState::Idle || shown != next {
        diff.set_outputs(outputs);
    }
    if renderers.iter().any(|r| r.state() == PayloadState::Loading)
        || diff.state() == PayloadState::Loading
    {
        println!("\nLoading test case #{}...", n);
    }

    let mut panels = vec![];
    for (kind, r) in BlobKind::ALL.iter().zip(renderers.iter()) {
        if let Some(text) = r.rendered().await {
            panels.push((*kind, text));
        }
    }
    let panels = panels
        .iter()
        .map(|(kind, text)| (*kind, &**text))
        .collect::<Vec<(BlobKind, &RenderedText)>>();
    let diff = diff.rendered().await;
    print!(
        "\n{}",
        view::render_case(n - 1, case, &panels, diff.as_deref())
    );
}

async fn submit(
    api: Arc<HttpJudgeApi>,
    cmd: opt::SubmitSubCmd,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let code = tokio::fs::read_to_string(&cmd.file)
        .await
        .with_context(|| format!("Failed to read {}", cmd.file.display()))?;
    let id = api
        .submit(cmd.problem, code, cmd.language)
        .await
        .map_err(|e| anyhow::anyhow!("Submission failed: {}", e.user_message()))?;
    println!("Submitted as {}", id);

    if cmd.watch {
        watch(api, id, None, false, cancel).await?;
    }
    Ok(())
}

async fn latest(api: &HttpJudgeApi, cmd: opt::LatestSubCmd) -> anyhow::Result<()> {
    let latest = match api.latest_code(cmd.problem).await {
        Ok(latest) => latest,
        Err(e) => {
            tracing::debug!("Failed to load latest code: {}", e);
            None
        }
    };
    let latest = match latest {
        Some(latest) => latest,
        None => {
            println!("No previous submission for problem {}", cmd.problem);
            return Ok(());
        }
    };
    match cmd.out {
        Some(path) => {
            write_code(&path, &latest.code).await?;
            tracing::info!("Restored latest code to {}", path.display());
        }
        None => print!("{}", latest.code),
    }
    Ok(())
}

async fn write_code(path: &Path, code: &str) -> anyhow::Result<()> {
    tokio::fs::write(path, code)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

async fn problems(api: Arc<HttpJudgeApi>, cmd: opt::ProblemsSubCmd) -> anyhow::Result<()> {
    let mut sort = SortSpec::from_selections(&cmd.sort);
    if cmd.desc {
        sort = sort.reversed();
    }
    let query = ProblemQuery {
        keyword: cmd.keyword,
        tag: cmd.tag.clone(),
        page: cmd.page,
        size: cmd.size,
        sort,
    };
    let filter = ProblemFilter {
        tag: cmd.tag,
        unsolved_only: cmd.unsolved,
    };

    let mut solved = SolvedSet::follow(api.clone() as Arc<dyn JudgeApi>, api.session());
    let page = api
        .list_problems(&query)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load problems: {}", e.user_message()))?;
    solved.changed().await;
    let solved = solved.current();

    let total = page.total.unwrap_or(0);
    let problems = query.present(page.data.unwrap_or_default(), &filter, &solved);
    println!(
        "  {:<6}{:<40}{:<8}{:>8}  {}",
        "Id", "Title", "Level", "Rate", "Tags"
    );
    for p in &problems {
        println!(
            "{} {:<6}{:<40}{:<8}{:>7.1}%  {}",
            if solved.contains(&p.id) { '+' } else { ' ' },
            p.id,
            p.title,
            p.difficulty.as_deref().unwrap_or("-"),
            p.pass_rate(),
            p.categories().iter().join(", "),
        );
    }
    println!("Page {} ({} problems in total)", query.page, total);
    Ok(())
}

async fn login(api: &HttpJudgeApi, cmd: opt::LoginSubCmd, cfg_path: &Path) -> anyhow::Result<()> {
    let session = api
        .login(&cmd.username, &cmd.password)
        .await
        .map_err(|e| anyhow::anyhow!("Login failed: {}", e.user_message()))?;

    // Only the session changes; flags given on this run are not persisted
    let mut cfg = ClientConfig::load(cfg_path).await?;
    cfg.session = Some(session);
    cfg.save(cfg_path)
        .await
        .with_context(|| format!("Failed to save session to {}", cfg_path.display()))?;
    println!("Logged in as {}", cmd.username);
    Ok(())
}

async fn copy(api: &HttpJudgeApi, cmd: opt::CopySubCmd) -> anyhow::Result<()> {
    let results = api
        .fetch_results(&cmd.id)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e.user_message()))?;
    let case = match cmd.case.checked_sub(1).and_then(|idx| results.get(idx)) {
        Some(case) => case,
        None => bail!("Submission {} has no test case #{}", cmd.id, cmd.case),
    };
    let blob = match case.blob(cmd.which) {
        Some(blob) if !blob.is_empty() => blob,
        _ => bail!("Test case #{} has no {}", cmd.case, cmd.which.label()),
    };

    match copy_to_clipboard(blob).await {
        CopyMethod::Tool(tool) => println!("Copied {} bytes with {}", blob.len(), tool),
        CopyMethod::Osc52 => println!("Asked the terminal to copy {} bytes", blob.len()),
    }
    Ok(())
}

async fn submissions(api: &HttpJudgeApi, cmd: opt::SubmissionsSubCmd) -> anyhow::Result<()> {
    let page = api
        .list_submissions(cmd.scope(), cmd.page, cmd.size)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load submissions: {}", e.user_message()))?;
    print!("{}", view::history_table(&page.data.unwrap_or_default()));
    println!(
        "Page {} ({} submissions in total)",
        cmd.page.max(1),
        page.total.unwrap_or(0)
    );
    Ok(())
}
