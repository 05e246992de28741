//! Error taxonomy of the engine facade.
//!
//! Every failure maps onto one of three [`Status`] codes. Out-of-memory and
//! I/O failures can only happen while constructing a [`KeywordSpotter`];
//! afterwards the only possible failure is caller misuse.
//!
//! [`KeywordSpotter`]: crate::KeywordSpotter

use std::{collections::TryReserveError, path::PathBuf};

use strum::{Display, IntoStaticStr};
use thiserror::Error;

/// Coarse status code reported for every [`SpotterError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Status {
    /// Contract violation detectable without I/O.
    InvalidArgument,
    /// Allocation of model or rolling state failed.
    OutOfMemory,
    /// A resource was unreadable, corrupt or incompatible.
    IoError,
}

/// Errors surfaced by [`KeywordSpotter`](crate::KeywordSpotter).
#[derive(Debug, Error)]
pub enum SpotterError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid data in {}: {reason}", path.display())]
    InvalidData { path: PathBuf, reason: String },
}

impl SpotterError {
    /// Map onto the three-way status taxonomy.
    pub fn status(&self) -> Status {
        match self {
            Self::InvalidArgument(_) => Status::InvalidArgument,
            Self::OutOfMemory(_) => Status::OutOfMemory,
            Self::Io { .. } | Self::InvalidData { .. } => Status::IoError,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
