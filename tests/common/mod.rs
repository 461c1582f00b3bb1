//! Shared fixtures: an in-process release server and archive builders

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use flate2::Compression;
use flate2::write::GzEncoder;
use piper_bootstrap::config::InstallerConfig;
use tar::{EntryType, Header};

pub const TAG: &str = "2023.11.14-2";
pub const ENGINE_PATH: &str =
    "/rhasspy/piper/releases/download/2023.11.14-2/piper_linux_x86_64.tar.gz";

#[derive(Clone)]
struct Fixture {
    files: Arc<HashMap<String, Vec<u8>>>,
    latest: Option<String>,
    hits: Arc<Mutex<Vec<String>>>,
}

async fn latest(State(fixture): State<Fixture>) -> Response {
    fixture.hits.lock().unwrap().push("/rhasspy/piper/releases/latest".to_string());
    match fixture.latest {
        Some(target) => Redirect::temporary(&target).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn serve_file(State(fixture): State<Fixture>, uri: Uri) -> Response {
    fixture.hits.lock().unwrap().push(uri.path().to_string());
    match fixture.files.get(uri.path()) {
        Some(bytes) => (StatusCode::OK, bytes.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// A running fixture server
pub struct ReleaseServer {
    pub base: String,
    hits: Arc<Mutex<Vec<String>>>,
}

impl ReleaseServer {
    /// Serve `files` by exact path; `/rhasspy/piper/releases/latest` redirects to `latest`
    pub async fn start(files: HashMap<String, Vec<u8>>, latest_redirect: Option<&str>) -> Self {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let fixture = Fixture {
            files: Arc::new(files),
            latest: latest_redirect.map(str::to_string),
            hits: hits.clone(),
        };
        let app = Router::new()
            .route("/rhasspy/piper/releases/latest", get(latest))
            .fallback(serve_file)
            .with_state(fixture);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{addr}"),
            hits,
        }
    }

    /// Paths requested so far, in order
    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }

    pub fn config(&self, root: &Path) -> InstallerConfig {
        InstallerConfig {
            install_root: root.to_path_buf(),
            engine_repo_url: format!("{}/rhasspy/piper", self.base),
            voices_base_url: format!("{}/voices", self.base),
            connect_timeout_secs: 5,
            inactivity_timeout_secs: 10,
            ..Default::default()
        }
    }
}

/// Gzip-compressed tarball of regular files
pub fn tar_gz(files: &[(String, Vec<u8>, u32)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (name, data, mode) in files {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(data.len() as u64);
        header.set_mode(*mode);
        builder.append_data(&mut header, name, data.as_slice()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Voice archive as published: `{base}.onnx` and `{base}.onnx.json` at the top level
pub fn voice_archive(base: &str) -> Vec<u8> {
    tar_gz(&[
        (format!("{base}.onnx"), format!("model {base}").into_bytes(), 0o644),
        (format!("{base}.onnx.json"), b"{\"audio\":{\"sample_rate\":16000}}".to_vec(), 0o644),
    ])
}

/// Engine archive with a `piper/` top-level directory
pub fn engine_archive() -> Vec<u8> {
    tar_gz(&[
        ("piper/piper".to_string(), b"\x7fELF engine".to_vec(), 0o755),
        ("piper/espeak-ng-data/phontab".to_string(), b"phonemes".to_vec(), 0o644),
    ])
}

/// `(path, body)` entries for the release redirect target and the engine archive
pub fn engine_files() -> Vec<(String, Vec<u8>)> {
    vec![
        (format!("/rhasspy/piper/releases/tag/{TAG}"), b"release page".to_vec()),
        (ENGINE_PATH.to_string(), engine_archive()),
    ]
}

pub fn voice_path(name: &str) -> String {
    format!("/voices/{name}.tar.gz")
}

/// `(path, body)` for a voice archive named `name`
pub fn voice_file(name: &str) -> (String, Vec<u8>) {
    let base = name.strip_prefix("voice-").unwrap_or(name);
    (voice_path(name), voice_archive(base))
}

pub fn latest_redirect() -> String {
    format!("/rhasspy/piper/releases/tag/{TAG}")
}
