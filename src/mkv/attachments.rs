//! Attachment options and their per-index values.
//!
//! By default every generated command reuses the attachments of the command
//! line. When the attachments were picked from one episode directory among a
//! set of sibling directories, one per batch file, each index attaches the
//! files of its own directory instead.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::paths;

/// One `--attach-file` with the options describing it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Attachment {
    pub name: Option<String>,
    pub mime_type: Option<String>,
    pub description: Option<String>,
    pub file: PathBuf,
    /// Written with `--attach-file-once`.
    pub once: bool,
}

impl Attachment {
    /// Attachment for a file found in an episode directory.
    pub fn from_file(file: &Path) -> Self {
        Self {
            name: file.file_name().map(|n| n.to_string_lossy().to_string()),
            mime_type: Some(mime_type(file).to_string()),
            description: None,
            file: file.to_path_buf(),
            once: false,
        }
    }

    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(description) = &self.description {
            args.extend(["--attachment-description".to_string(), description.clone()]);
        }
        if let Some(name) = &self.name {
            args.extend(["--attachment-name".to_string(), name.clone()]);
        }
        if let Some(mime_type) = &self.mime_type {
            args.extend(["--attachment-mime-type".to_string(), mime_type.clone()]);
        }
        let flag = if self.once { "--attach-file-once" } else { "--attach-file" };
        args.extend([flag.to_string(), self.file.to_string_lossy().to_string()]);
        args
    }
}

/// Mime type mkvtoolnix-gui uses for a font or other attachment.
pub fn mime_type(file: &Path) -> &'static str {
    let suffix = file
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match suffix.as_str() {
        "ttf" | "ttc" => "application/x-truetype-font",
        "otf" => "application/vnd.ms-opentype",
        _ => "application/octet-stream",
    }
}

/// True for the options that make up the attachments block.
pub fn is_attachment_option(flag: &str) -> bool {
    matches!(
        flag,
        "--attachment-name"
            | "--attachment-mime-type"
            | "--attachment-description"
            | "--attach-file"
            | "--attach-file-once"
    )
}

/// Every attachment of a command line.
#[derive(Debug, Clone, Default)]
pub struct Attachments {
    items: Vec<Attachment>,
    pending: Attachment,
    episode_dirs: Vec<PathBuf>,
}

impl Attachments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects attachments from the arguments of an attachments block.
    ///
    /// Returns `None` if an option is missing its value.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Option<Self> {
        let mut attachments = Self::new();
        let mut iter = args.iter().map(AsRef::<str>::as_ref);
        while let Some(flag) = iter.next() {
            attachments.add(flag, iter.next()?);
        }
        Some(attachments)
    }

    /// Adds one attachment option. Name, mime type and description apply to
    /// the next attached file.
    pub fn add(&mut self, flag: &str, value: &str) {
        match flag {
            "--attachment-name" => self.pending.name = Some(value.to_string()),
            "--attachment-mime-type" => self.pending.mime_type = Some(value.to_string()),
            "--attachment-description" => self.pending.description = Some(value.to_string()),
            "--attach-file" | "--attach-file-once" => {
                let mut attachment = std::mem::take(&mut self.pending);
                attachment.file = PathBuf::from(value);
                attachment.once = flag == "--attach-file-once";
                self.items.push(attachment);
            }
            _ => warn!(option = flag, "Not an attachment option"),
        }
    }

    pub fn items(&self) -> &[Attachment] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Attached files that do not exist.
    pub fn missing(&self) -> Vec<&Path> {
        self.items
            .iter()
            .map(|a| a.file.as_path())
            .filter(|f| !f.is_file())
            .collect()
    }

    /// Distinct directories holding the command line attachments.
    pub fn directories(&self) -> Vec<PathBuf> {
        let dirs: BTreeSet<PathBuf> = self
            .items
            .iter()
            .map(|a| a.file.parent().map(Path::to_path_buf).unwrap_or_default())
            .collect();
        dirs.into_iter().collect()
    }

    /// Switches to per-episode attachments when the layout allows it.
    ///
    /// The command line attachments must all live in one directory holding
    /// exactly those files, and that directory's parent must hold exactly
    /// `batch_size` directories. Returns true when per-episode mode is on.
    pub fn resolve_episodes(&mut self, batch_size: usize) -> bool {
        self.episode_dirs.clear();

        let dirs = self.directories();
        let [dir] = dirs.as_slice() else {
            return false;
        };
        if files_in(dir).len() != self.items.len() {
            return false;
        }
        let Some(parent) = dir.parent() else {
            return false;
        };

        let episode_dirs = subdirectories(parent);
        if episode_dirs.len() != batch_size {
            return false;
        }

        debug!(
            parent = %parent.display(),
            directories = episode_dirs.len(),
            "Attachments by episode"
        );
        self.episode_dirs = episode_dirs;
        true
    }

    pub fn is_per_episode(&self) -> bool {
        !self.episode_dirs.is_empty()
    }

    /// Episode directories, one per batch index, in batch order.
    pub fn episode_dirs(&self) -> &[PathBuf] {
        &self.episode_dirs
    }

    /// Attachments for batch index `index`.
    pub fn for_index(&self, index: usize) -> Vec<Attachment> {
        match self.episode_dirs.get(index) {
            Some(dir) => files_in(dir).iter().map(|f| Attachment::from_file(f)).collect(),
            None => self.items.clone(),
        }
    }

    /// Arguments of the attachments block for batch index `index`.
    pub fn args_for(&self, index: usize) -> Vec<String> {
        self.for_index(index).iter().flat_map(Attachment::args).collect()
    }
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    paths::directory_entries(dir)
        .into_iter()
        .filter(|p| p.is_file())
        .collect()
}

fn subdirectories(dir: &Path) -> Vec<PathBuf> {
    paths::directory_entries(dir)
        .into_iter()
        .filter(|p| p.is_dir())
        .collect()
}
