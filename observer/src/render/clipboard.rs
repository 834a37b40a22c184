use crate::client::ClipboardErr;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::process::Stdio;
use tokio::{io::AsyncWriteExt, process::Command};

/// How a payload ended up on the clipboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyMethod {
    /// Piped into a platform clipboard tool
    Tool(&'static str),
    /// Written to the terminal as an OSC 52 sequence
    Osc52,
}

/// A clipboard tool and the arguments that make it read stdin.
type Tool = (&'static str, &'static [&'static str]);

const NO_ARGS: &[&str] = &[];

#[cfg(target_os = "macos")]
fn candidate_tools() -> Vec<Tool> {
    vec![("pbcopy", NO_ARGS)]
}

#[cfg(windows)]
fn candidate_tools() -> Vec<Tool> {
    vec![("clip", NO_ARGS)]
}

#[cfg(not(any(target_os = "macos", windows)))]
fn candidate_tools() -> Vec<Tool> {
    let mut tools: Vec<Tool> = vec![];
    if std::env::var_os("WAYLAND_DISPLAY").is_some() {
        tools.push(("wl-copy", NO_ARGS));
    }
    tools.push(("xclip", &["-selection", "clipboard"]));
    tools.push(("xsel", &["--clipboard", "--input"]));
    tools
}

async fn pipe_to(tool: &str, args: &[&str], text: &str) -> Result<(), ClipboardErr> {
    let mut child = Command::new(tool)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(text.as_bytes()).await?;
        // Closing stdin lets the tool finish
        drop(stdin);
    }
    let status = child.wait().await?;
    if status.success() {
        Ok(())
    } else {
        Err(ClipboardErr::Failed(format!("{} exited with {}", tool, status)))
    }
}

/// Try each platform clipboard tool in turn.
pub async fn copy_with_tool(text: &str) -> Result<&'static str, ClipboardErr> {
    for (tool, args) in candidate_tools() {
        match pipe_to(tool, args, text).await {
            Ok(()) => return Ok(tool),
            Err(ClipboardErr::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::trace!("{} is not installed", tool);
            }
            Err(e) => tracing::debug!("Copying with {} failed: {}", tool, e),
        }
    }
    Err(ClipboardErr::NoTool)
}

/// The OSC 52 escape sequence asking the terminal to put `text` on the
/// system clipboard.
pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", BASE64.encode(text))
}

/// Copy `text` to the clipboard. A platform tool is preferred; when none
/// works the terminal is asked to do it instead. Failures are only logged.
pub async fn copy_to_clipboard(text: &str) -> CopyMethod {
    match copy_with_tool(text).await {
        Ok(tool) => {
            tracing::debug!("Copied {} bytes with {}", text.len(), tool);
            CopyMethod::Tool(tool)
        }
        Err(e) => {
            tracing::debug!("Falling back to OSC 52: {}", e);
            let mut out = tokio::io::stdout();
            let written = async {
                out.write_all(osc52_sequence(text).as_bytes()).await?;
                out.flush().await
            };
            if let Err(e) = written.await {
                tracing::debug!("Writing OSC 52 sequence failed: {}", e);
            }
            CopyMethod::Osc52
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn osc52_encodes_full_text() {
        assert_eq!(osc52_sequence("hi\n"), "\x1b]52;c;aGkK\x07");

        let big = "x".repeat(30_000);
        let seq = osc52_sequence(&big);
        let payload = &seq["\x1b]52;c;".len()..seq.len() - 1];
        assert_eq!(BASE64.decode(payload).unwrap(), big.as_bytes());
    }

    #[tokio::test]
    async fn missing_tool_is_reported_as_io() {
        let res = pipe_to("ssoj-surely-not-a-clipboard-tool", &[], "x").await;
        assert!(
            matches!(&res, Err(ClipboardErr::Io(e)) if e.kind() == std::io::ErrorKind::NotFound),
            "{:?}",
            res
        );
    }
}
