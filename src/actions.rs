// Action layer: turns a resolved `Action` into config writes or API calls
// and reports the result to the user.

use crate::api::{ApiClient, Transport};
use crate::cli::{Action, Cli, PasswordInput};
use crate::config::{Config, ConfigStore};
use anyhow::{Context, Result};
use dialoguer::Password;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Entry point used by the binary.
pub fn run(cli: Cli) -> Result<()> {
    let action = cli.action()?;
    let store = match &cli.data_dir {
        Some(dir) => ConfigStore::new(dir),
        None => ConfigStore::default_location(),
    }
    .context("Failed to prepare the data folder")?;

    match action {
        Action::Configure { password, address } => {
            let password = password.map(resolve_password).transpose()?;
            apply_settings(&store, password.as_deref(), address.as_deref())?;
            Ok(())
        }
        action => {
            let config = store
                .load_or_migrate()
                .with_context(|| format!("Failed to read {}", store.path().display()))?;
            let mut api = ApiClient::connect(config, store)?;
            let stdout = std::io::stdout();
            perform(&mut api, action, &mut stdout.lock())
        }
    }
}

fn resolve_password(input: PasswordInput) -> Result<String> {
    match input {
        PasswordInput::Given(password) => Ok(password),
        PasswordInput::Prompt => Password::new()
            .with_prompt("Password")
            .interact()
            .context("Failed to read password"),
    }
}

/// Merge the given settings into the stored config and save it.
pub fn apply_settings(
    store: &ConfigStore,
    password: Option<&str>,
    address: Option<&str>,
) -> Result<Config> {
    let mut config = store
        .load()
        .with_context(|| format!("Failed to read {}", store.path().display()))?;
    if let Some(password) = password {
        config.set_password(password);
        info!("Password is set.");
    }
    if let Some(address) = address {
        config.set_address(address);
        info!("Address is set.");
    }
    store.save(&config).context("Failed to save config")?;
    Ok(config)
}

/// Carry out a sending or fetching action. Output meant for the user
/// (the fetched memo) goes to `out`.
pub fn perform<T: Transport>(
    api: &mut ApiClient<T>,
    action: Action,
    out: &mut impl Write,
) -> Result<()> {
    match action {
        Action::FetchLastText => {
            let text = api.last_text().context("Failed to fetch the last text")?;
            writeln!(out, "{}", text)?;
        }
        Action::SendText(text) => {
            api.add_text(&text).context("Failed to send text")?;
            info!("Text sent.");
        }
        Action::SendClip(text) => {
            api.add_clip(&text).context("Failed to send clip")?;
            info!("Clip sent.");
        }
        Action::SendFile(path) => {
            upload(api, &path)?;
            info!(file = %path.display(), "File sent.");
        }
        Action::Configure { .. } => anyhow::bail!("settings cannot be changed while sending"),
    }
    Ok(())
}

fn upload<T: Transport>(api: &mut ApiClient<T>, path: &Path) -> Result<()> {
    // indicatif spinner on stderr while the blocking upload runs.
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message(format!("Uploading {}...", path.display()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = api.add_file(path);
    spinner.finish_and_clear();
    result.with_context(|| format!("Failed to upload {}", path.display()))?;
    Ok(())
}
