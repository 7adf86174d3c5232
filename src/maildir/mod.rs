//! Maildir delivery: one mailbox directory per feed, messages made visible
//! by renaming a fully written file from `tmp/` into `new/`.

use std::fs::{self, DirBuilder, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::validate_feed_name;

/// Access-control marker written into every mailbox.
pub const ACL_FILE: &str = "dovecot-acl";
pub const ACL_CONTENT: &str = "authenticated lrs\n";

const SUBDIRS: [&str; 3] = ["tmp", "new", "cur"];

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("invalid mailbox name {name:?}: {reason}")]
    InvalidMailbox { name: String, reason: String },

    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to move {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to change owner of {path}: {source}")]
    Chown {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Numeric owner applied to created mailbox directories and files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

#[derive(Debug, Clone)]
pub struct Maildir {
    root: PathBuf,
    owner: Option<Owner>,
}

impl Maildir {
    pub fn new<P: AsRef<Path>>(root: P, owner: Option<Owner>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            owner,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mailbox_path(&self, mailbox: &str) -> Result<PathBuf, DeliveryError> {
        validate_feed_name(mailbox).map_err(|reason| DeliveryError::InvalidMailbox {
            name: mailbox.to_string(),
            reason,
        })?;
        Ok(self.root.join(mailbox))
    }

    /// Creates the mailbox tree and its ACL marker when missing.
    pub fn ensure_mailbox(&self, mailbox: &str) -> Result<PathBuf, DeliveryError> {
        let path = self.mailbox_path(mailbox)?;

        self.create_dir(&self.root)?;
        self.create_dir(&path)?;
        for sub in SUBDIRS {
            self.create_dir(&path.join(sub))?;
        }

        let acl = path.join(ACL_FILE);
        if !acl.exists() {
            fs::write(&acl, ACL_CONTENT).map_err(|source| DeliveryError::WriteFile {
                path: acl.clone(),
                source,
            })?;
            self.apply_owner(&acl)?;
        }

        Ok(path)
    }

    /// Writes `message` into `mailbox` and returns the delivered file path.
    pub fn deliver(&self, mailbox: &str, message: &[u8]) -> Result<PathBuf, DeliveryError> {
        let path = self.ensure_mailbox(mailbox)?;
        let (tmp, name) = self.write_tmp(&path.join("tmp"), message)?;

        let dest = path.join("new").join(&name);
        fs::rename(&tmp, &dest).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            DeliveryError::Rename {
                from: tmp.clone(),
                to: dest.clone(),
                source,
            }
        })?;

        debug!(mailbox, file = %dest.display(), bytes = message.len(), "Delivered message");
        Ok(dest)
    }

    fn write_tmp(&self, dir: &Path, message: &[u8]) -> Result<(PathBuf, String), DeliveryError> {
        loop {
            let name = unique_name();
            let path = dir.join(&name);

            let mut options = OpenOptions::new();
            options.write(true).create_new(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(0o600);
            }

            let mut file = match options.open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(DeliveryError::WriteFile { path, source }),
            };

            let written = file.write_all(message).and_then(|()| file.sync_all());
            if let Err(source) = written {
                let _ = fs::remove_file(&path);
                return Err(DeliveryError::WriteFile { path, source });
            }
            drop(file);

            self.apply_owner(&path)?;
            return Ok((path, name));
        }
    }

    fn create_dir(&self, path: &Path) -> Result<(), DeliveryError> {
        if path.is_dir() {
            return Ok(());
        }

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }
        builder
            .create(path)
            .map_err(|source| DeliveryError::CreateDir {
                path: path.to_path_buf(),
                source,
            })?;

        self.apply_owner(path)
    }

    #[cfg(unix)]
    fn apply_owner(&self, path: &Path) -> Result<(), DeliveryError> {
        let Some(owner) = self.owner else {
            return Ok(());
        };
        match std::os::unix::fs::chown(path, Some(owner.uid), Some(owner.gid)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                warn!(path = %path.display(), uid = owner.uid, gid = owner.gid, "Not permitted to change owner");
                Ok(())
            }
            Err(source) => Err(DeliveryError::Chown {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    #[cfg(not(unix))]
    fn apply_owner(&self, _path: &Path) -> Result<(), DeliveryError> {
        Ok(())
    }
}

/// `<secs>.<micros>_<uuid>.<pid>`, unique across processes and threads.
fn unique_name() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!(
        "{}.M{}_{}.{}",
        now.as_secs(),
        now.subsec_micros(),
        Uuid::new_v4().simple(),
        std::process::id()
    )
}
