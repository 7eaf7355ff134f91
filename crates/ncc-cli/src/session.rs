//! Persisted session: the access token and the signed-in user's profile.
//!
//! Both live under two fixed keys of a small JSON file. The session is loaded
//! once at startup and handed to the client and the app as a shared
//! [`SessionHandle`]; the client clears it when the backend answers `401`.

use std::{
  fs, io,
  path::{Path, PathBuf},
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use ncc_core::record::UserProfile;
use serde_json::{Map, Value};
use thiserror::Error;

/// Key holding the bearer token.
pub const TOKEN_KEY: &str = "token_ncc";
/// Key holding the user profile returned at login.
pub const PROFILE_KEY: &str = "usuario_ncc";

#[derive(Debug, Error)]
pub enum SessionError {
  #[error("session file {path}: {source}")]
  Io {
    path:   PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("session file {path} is not valid JSON: {source}")]
  Json {
    path:   PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// Shared, lockable session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Lock `handle`, recovering the data if a previous holder panicked.
pub fn lock(handle: &SessionHandle) -> MutexGuard<'_, Session> {
  handle.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug)]
pub struct Session {
  path:    PathBuf,
  token:   Option<String>,
  profile: Option<UserProfile>,
}

impl Session {
  /// Read the session file at `path`. A missing file is an empty session.
  pub fn load(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
    let path = path.into();
    let map = read_map(&path)?;

    let token = map
      .get(TOKEN_KEY)
      .and_then(Value::as_str)
      .filter(|t| !t.is_empty())
      .map(str::to_owned);
    // A malformed profile is dropped rather than blocking startup.
    let profile = map
      .get(PROFILE_KEY)
      .cloned()
      .and_then(|v| serde_json::from_value(v).ok());

    tracing::debug!(path = %path.display(), signed_in = token.is_some(), "session loaded");
    Ok(Self {
      path,
      token,
      profile,
    })
  }

  pub fn into_handle(self) -> SessionHandle { Arc::new(Mutex::new(self)) }

  pub fn path(&self) -> &Path { &self.path }

  pub fn token(&self) -> Option<&str> { self.token.as_deref() }

  pub fn profile(&self) -> Option<&UserProfile> { self.profile.as_ref() }

  /// Whether the signed-in view should be shown.
  pub fn is_authenticated(&self) -> bool { self.token.is_some() }

  pub fn is_admin(&self) -> bool { self.profile.as_ref().is_some_and(UserProfile::is_admin) }

  /// Store a fresh token and profile, persisting both keys.
  pub fn sign_in(
    &mut self,
    token: String,
    profile: Option<UserProfile>,
  ) -> Result<(), SessionError> {
    self.token = Some(token);
    self.profile = profile;
    self.persist()
  }

  /// Forget the token and profile and remove both keys from the file.
  pub fn clear(&mut self) -> Result<(), SessionError> {
    self.token = None;
    self.profile = None;
    self.persist()
  }

  /// Rewrite the file, keeping any keys other than ours untouched.
  fn persist(&self) -> Result<(), SessionError> {
    let mut map = read_map(&self.path)?;

    match &self.token {
      Some(token) => map.insert(TOKEN_KEY.into(), Value::String(token.clone())),
      None => map.remove(TOKEN_KEY),
    };
    match &self.profile {
      Some(profile) => {
        let value = serde_json::to_value(profile).map_err(|source| SessionError::Json {
          path: self.path.clone(),
          source,
        })?;
        map.insert(PROFILE_KEY.into(), value)
      }
      None => map.remove(PROFILE_KEY),
    };

    let io_err = |source| SessionError::Io {
      path: self.path.clone(),
      source,
    };
    if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
      fs::create_dir_all(parent).map_err(io_err)?;
    }
    let body = serde_json::to_string_pretty(&Value::Object(map)).map_err(|source| {
      SessionError::Json {
        path: self.path.clone(),
        source,
      }
    })?;
    fs::write(&self.path, body).map_err(io_err)
  }
}

fn read_map(path: &Path) -> Result<Map<String, Value>, SessionError> {
  let raw = match fs::read_to_string(path) {
    Ok(raw) => raw,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
    Err(source) => {
      return Err(SessionError::Io {
        path: path.to_path_buf(),
        source,
      });
    }
  };
  if raw.trim().is_empty() {
    return Ok(Map::new());
  }
  match serde_json::from_str(&raw) {
    Ok(Value::Object(map)) => Ok(map),
    Ok(_) => Ok(Map::new()),
    Err(source) => Err(SessionError::Json {
      path: path.to_path_buf(),
      source,
    }),
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;

  /// A session file path inside a fresh temporary directory.
  pub(crate) fn temp_session_path() -> PathBuf {
    std::env::temp_dir()
      .join(format!("ncc-test-{}", uuid::Uuid::new_v4()))
      .join("session.json")
  }

  fn profile() -> UserProfile {
    UserProfile {
      handle: Some("ana".into()),
      role_id: Some(1),
      ..Default::default()
    }
  }

  #[test]
  fn missing_file_is_signed_out() {
    let session = Session::load(temp_session_path()).unwrap();
    assert!(!session.is_authenticated());
    assert!(session.profile().is_none());
  }

  #[test]
  fn sign_in_persists_both_keys() {
    let path = temp_session_path();
    let mut session = Session::load(&path).unwrap();
    session.sign_in("tok".into(), Some(profile())).unwrap();

    let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw[TOKEN_KEY], "tok");
    assert_eq!(raw[PROFILE_KEY]["usuario"], "ana");

    let reloaded = Session::load(&path).unwrap();
    assert_eq!(reloaded.token(), Some("tok"));
    assert!(reloaded.is_admin());
  }

  #[test]
  fn clear_removes_both_keys_and_keeps_others() {
    let path = temp_session_path();
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(
      &path,
      r#"{ "token_ncc": "tok", "usuario_ncc": { "id_rol": 2 }, "theme": "dark" }"#,
    )
    .unwrap();

    let mut session = Session::load(&path).unwrap();
    assert!(session.is_authenticated());
    assert!(!session.is_admin());
    session.clear().unwrap();

    let raw: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert!(raw.get(TOKEN_KEY).is_none());
    assert!(raw.get(PROFILE_KEY).is_none());
    assert_eq!(raw["theme"], "dark");
    assert!(!Session::load(&path).unwrap().is_authenticated());
  }

  #[test]
  fn corrupt_file_is_an_error() {
    let path = temp_session_path();
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(Session::load(&path), Err(SessionError::Json { .. })));
  }
}
