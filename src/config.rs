// Local settings: server address, password and the session cookie handed
// out by the server. Everything lives in one small JSON file inside the
// per-user data folder shared with the go-send server.

use crate::error::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DATA_FOLDER_NAME: &str = "gosend_data_folder";
const CONFIG_FILE_NAME: &str = "config-cli";
/// Config file written by the go-send server itself.
const SERVER_CONFIG_FILE_NAME: &str = "config";

/// Session cookie issued by `/api/login`. Opaque to the client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
}

impl SessionCookie {
    /// Value for a `Cookie` request header.
    pub fn header_value(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<SessionCookie>,
}

impl Config {
    /// Both the address and the password must be known before talking to
    /// the server.
    pub fn validate(&self) -> ClientResult<()> {
        match (self.address.is_empty(), self.password.is_empty()) {
            (true, true) => Err(ClientError::MissingSettings("password and address")),
            (false, true) => Err(ClientError::MissingSettings("password")),
            (true, false) => Err(ClientError::MissingSettings("address")),
            (false, false) => Ok(()),
        }
    }

    pub fn set_password(&mut self, password: &str) {
        if self.password != password {
            self.cookie = None;
        }
        self.password = password.to_string();
    }

    pub fn set_address(&mut self, address: &str) {
        self.address = address.trim().trim_end_matches('/').to_string();
    }
}

/// Reads and writes the config file inside a data directory.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    /// Use `dir` as the data folder, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> ClientResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(ConfigStore { dir })
    }

    /// `~/gosend_data_folder`, or the current directory when no home
    /// directory can be determined.
    pub fn default_location() -> ClientResult<Self> {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(home.join(DATA_FOLDER_NAME))
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE_NAME)
    }

    fn server_config_path(&self) -> PathBuf {
        self.dir.join(SERVER_CONFIG_FILE_NAME)
    }

    /// Load the stored config. A missing or empty file yields the default
    /// (empty) config; any other failure is an error.
    pub fn load(&self) -> ClientResult<Config> {
        Ok(read_config(&self.path())?.unwrap_or_default())
    }

    /// Like [`ConfigStore::load`], but when the client has no config yet it
    /// adopts the address and password from the server's own config file.
    pub fn load_or_migrate(&self) -> ClientResult<Config> {
        if let Some(cfg) = read_config(&self.path())? {
            return Ok(cfg);
        }
        match read_config(&self.server_config_path())? {
            Some(server) => {
                let mut cfg = Config::default();
                cfg.password = server.password;
                if !server.address.is_empty() {
                    cfg.set_address(&format!("http://{}", server.address));
                }
                info!(path = %self.server_config_path().display(), "imported settings from go-send config");
                self.save(&cfg)?;
                Ok(cfg)
            }
            None => Ok(Config::default()),
        }
    }

    pub fn save(&self, cfg: &Config) -> ClientResult<()> {
        let path = self.path();
        let mut buf = Vec::new();
        let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, fmt);
        cfg.serialize(&mut ser)?;
        let mut file = open_private(&path)?;
        file.write_all(&buf)?;
        debug!(path = %path.display(), "config saved");
        Ok(())
    }
}

fn read_config(path: &Path) -> ClientResult<Option<Config>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(&data)?))
}

/// Open `path` for writing, truncated, readable by the owner only. A new
/// file is created with mode 0600; an existing one is tightened before any
/// byte is written.
#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.set_permissions(fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) fn temp_store(name: &str) -> ConfigStore {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "gosend-test-{}-{}-{}",
            std::process::id(),
            name,
            n
        ));
        let _ = fs::remove_dir_all(&dir);
        ConfigStore::new(dir).unwrap()
    }

    #[test]
    fn test_missing_file_loads_default() {
        let store = temp_store("missing");
        assert_eq!(store.load().unwrap(), Config::default());
    }

    #[test]
    fn test_empty_file_loads_default() {
        let store = temp_store("empty");
        fs::write(store.path(), "  \n").unwrap();
        assert_eq!(store.load().unwrap(), Config::default());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let store = temp_store("corrupt");
        fs::write(store.path(), "{not json").unwrap();
        assert!(matches!(store.load(), Err(ClientError::Json(_))));
    }

    #[test]
    fn test_save_then_load_keeps_everything() {
        let store = temp_store("roundtrip");
        let cfg = Config {
            address: "http://127.0.0.1:80".into(),
            password: "abc".into(),
            cookie: Some(SessionCookie {
                name: "gosend-session".into(),
                value: "xyz".into(),
            }),
        };
        store.save(&cfg).unwrap();
        assert_eq!(store.load().unwrap(), cfg);

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"Address\": \"http://127.0.0.1:80\""));
        assert!(raw.contains("\"Name\": \"gosend-session\""));
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let store = temp_store("perms");
        store.save(&Config::default()).unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_new_file_is_private_before_writing() {
        use std::os::unix::fs::PermissionsExt;
        let store = temp_store("created");
        let file = open_private(&store.path()).unwrap();
        let mode = file.metadata().unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(file.metadata().unwrap().len(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_readable_file_is_tightened() {
        use std::os::unix::fs::PermissionsExt;
        let store = temp_store("tighten");
        fs::write(store.path(), r#"{"Address":"http://a","Password":"old"}"#).unwrap();
        fs::set_permissions(store.path(), fs::Permissions::from_mode(0o644)).unwrap();

        let mut cfg = store.load().unwrap();
        cfg.set_password("new");
        store.save(&cfg).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.load().unwrap(), cfg);
    }

    #[test]
    fn test_reads_files_without_cookie() {
        let store = temp_store("nocookie");
        fs::write(store.path(), r#"{"Address":"http://a","Password":"p"}"#).unwrap();
        let cfg = store.load().unwrap();
        assert_eq!(cfg.address, "http://a");
        assert_eq!(cfg.password, "p");
        assert!(cfg.cookie.is_none());
    }

    #[test]
    fn test_migrates_server_config() {
        let store = temp_store("migrate");
        fs::write(
            store.dir.join(SERVER_CONFIG_FILE_NAME),
            r#"{"Password":"pw","Address":"127.0.0.1:80","MaxAge":"365d"}"#,
        )
        .unwrap();
        let cfg = store.load_or_migrate().unwrap();
        assert_eq!(cfg.address, "http://127.0.0.1:80");
        assert_eq!(cfg.password, "pw");
        assert_eq!(store.load().unwrap(), cfg);
    }

    #[test]
    fn test_client_config_wins_over_server_config() {
        let store = temp_store("nomigrate");
        fs::write(
            store.dir.join(SERVER_CONFIG_FILE_NAME),
            r#"{"Password":"server","Address":"1.2.3.4"}"#,
        )
        .unwrap();
        let mut mine = Config::default();
        mine.set_address("https://memo.example.com/");
        mine.set_password("mine");
        store.save(&mine).unwrap();
        assert_eq!(store.load_or_migrate().unwrap(), mine);
    }

    #[test]
    fn test_validate_names_missing_fields() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.validate(),
            Err(ClientError::MissingSettings("password and address"))
        ));
        cfg.password = "p".into();
        assert!(matches!(cfg.validate(), Err(ClientError::MissingSettings("address"))));
        cfg.password.clear();
        cfg.address = "http://a".into();
        assert!(matches!(cfg.validate(), Err(ClientError::MissingSettings("password"))));
        cfg.password = "p".into();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_new_password_drops_cookie() {
        let mut cfg = Config {
            address: "http://a".into(),
            password: "old".into(),
            cookie: Some(SessionCookie {
                name: "s".into(),
                value: "v".into(),
            }),
        };
        cfg.set_password("old");
        assert!(cfg.cookie.is_some());
        cfg.set_password("new");
        assert!(cfg.cookie.is_none());
    }
}
