use crate::error::{ClientError, ClientResult};
use clap::Parser;
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "gosend",
    about = "Fetch or send text memos, clipboard text and files to a go-send server",
    long_about = "Without any action flag, prints the most recent text memo.\n\
                  --clip takes precedence over --text, which takes precedence over --file."
)]
pub struct Cli {
    /// Send this text to the cloud clipboard
    #[arg(short, long)]
    pub clip: Option<String>,

    /// Insert a text memo
    #[arg(short, long)]
    pub text: Option<String>,

    /// Upload a file
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Set the password (prompts when no value is given)
    #[arg(short, long, num_args = 0..=1)]
    pub pass: Option<Option<String>>,

    /// Set the website address of go-send, e.g. http://127.0.0.1:80
    #[arg(short, long)]
    pub addr: Option<String>,

    /// Folder holding the config file (default: ~/gosend_data_folder)
    #[arg(long, env = "GOSEND_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordInput {
    Given(String),
    Prompt,
}

/// The single thing one invocation does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Configure {
        password: Option<PasswordInput>,
        address: Option<String>,
    },
    SendClip(String),
    SendText(String),
    SendFile(PathBuf),
    FetchLastText,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.is_empty())
}

impl Cli {
    /// Resolve the flags into an action. Settings flags cannot be mixed
    /// with sending flags.
    pub fn action(&self) -> ClientResult<Action> {
        // A bare `--pass` prompts; `--pass ""` is the same as no flag.
        let password = match &self.pass {
            None => None,
            Some(None) => Some(PasswordInput::Prompt),
            Some(Some(p)) if p.is_empty() => None,
            Some(Some(p)) => Some(PasswordInput::Given(p.clone())),
        };
        let address = non_empty(&self.addr);
        let clip = non_empty(&self.clip);
        let text = non_empty(&self.text);
        let file = self.file.clone().filter(|f| !f.as_os_str().is_empty());

        let configuring = password.is_some() || address.is_some();
        let sending = [clip.is_some(), text.is_some(), file.is_some()];
        let senders = sending.iter().filter(|s| **s).count();

        if configuring && senders > 0 {
            return Err(ClientError::FlagConflict);
        }
        if configuring {
            return Ok(Action::Configure { password, address });
        }
        if senders > 1 {
            warn!("several of --clip, --text and --file given, only the first in that order is used");
        }

        Ok(match (clip, text, file) {
            (Some(clip), _, _) => Action::SendClip(clip),
            (None, Some(text), _) => Action::SendText(text),
            (None, None, Some(file)) => Action::SendFile(file),
            (None, None, None) => Action::FetchLastText,
        })
    }
}
