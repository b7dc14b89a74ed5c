use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Decoded-enough image payload: the raw encoded bytes plus their MIME type.
/// Surfaces embed or decode it themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageAsset {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageAsset {
    pub fn new(mime_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            bytes,
        }
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }

    /// Parse a `data:<mime>;base64,<payload>` URI.
    pub fn from_data_uri(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix("data:")?;
        let (meta, payload) = rest.split_once(',')?;
        let mime_type = meta.strip_suffix(";base64")?;
        let bytes = STANDARD.decode(payload.trim()).ok()?;
        Some(Self::new(mime_type, bytes))
    }
}

/// Proof of a load request. Only the ticket carrying the latest generation for
/// its key can complete the entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub key: String,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssetState {
    Pending,
    Ready(ImageAsset),
    Failed(String),
}

#[derive(Debug, Clone)]
struct AssetEntry {
    generation: u64,
    state: AssetState,
}

#[derive(Debug, Clone, Default)]
pub struct AssetCache {
    entries: BTreeMap<String, AssetEntry>,
    next_generation: u64,
    revision: u64,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as pending under a fresh generation. Any ticket handed out
    /// earlier for the same key becomes stale.
    pub fn request(&mut self, key: &str) -> LoadTicket {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.entries.insert(
            key.to_string(),
            AssetEntry {
                generation,
                state: AssetState::Pending,
            },
        );
        self.revision += 1;
        LoadTicket {
            key: key.to_string(),
            generation,
        }
    }

    /// Apply a finished load. Returns `false` when the ticket is stale.
    pub fn complete(&mut self, ticket: &LoadTicket, result: Result<ImageAsset, String>) -> bool {
        let Some(entry) = self.entries.get_mut(&ticket.key) else {
            tracing::warn!(key = %ticket.key, "asset completion for unknown key ignored");
            return false;
        };
        if entry.generation != ticket.generation {
            tracing::warn!(
                key = %ticket.key,
                ticket = ticket.generation,
                current = entry.generation,
                "stale asset completion ignored"
            );
            return false;
        }
        entry.state = match result {
            Ok(image) => AssetState::Ready(image),
            Err(reason) => AssetState::Failed(reason),
        };
        self.revision += 1;
        true
    }

    pub fn get(&self, key: &str) -> Option<&ImageAsset> {
        match &self.entries.get(key)?.state {
            AssetState::Ready(image) => Some(image),
            _ => None,
        }
    }

    /// Ticket of the load currently awaited for `key`, if any.
    pub fn pending_ticket(&self, key: &str) -> Option<LoadTicket> {
        let entry = self.entries.get(key)?;
        matches!(entry.state, AssetState::Pending).then(|| LoadTicket {
            key: key.to_string(),
            generation: entry.generation,
        })
    }

    pub fn state(&self, key: &str) -> Option<&AssetState> {
        self.entries.get(key).map(|entry| &entry.state)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Synchronous loader used by the command-line harness. Keys are either
/// `data:` URIs or paths relative to `base_dir`.
#[derive(Debug, Clone)]
pub struct FileAssetLoader {
    base_dir: PathBuf,
}

impl FileAssetLoader {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
        }
    }

    pub fn load(&self, key: &str) -> Result<ImageAsset, String> {
        if key.starts_with("data:") {
            return ImageAsset::from_data_uri(key).ok_or_else(|| "malformed data URI".to_string());
        }
        let path = self.base_dir.join(key);
        let bytes = std::fs::read(&path).map_err(|err| format!("{}: {err}", path.display()))?;
        Ok(ImageAsset::new(mime_for_path(&path), bytes))
    }
}

fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}
