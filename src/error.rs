use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::mods::ApiError;
use crate::storage::StorageError;
use crate::util::quote_list;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(
        "couldn't find the following server mods (try using \"search\" to find their slugs): {}",
        quote_list(.0)
    )]
    UnknownSlugs(Vec<String>),

    #[error(
        "some of those server mods have no plain JAR files, so they can't be installed: {}",
        quote_list(.0)
    )]
    LackingJars(Vec<String>),

    #[error("these server mods are not installed here: {}", quote_list(.0))]
    NotInstalled(Vec<String>),

    #[error("you don't have anything to update yet")]
    NothingInstalled,

    #[error(
        "no API key configured; pass --api-key (get yours from https://dev.bukkit.org/home/servermods-apikey/)"
    )]
    MissingApiKey,

    #[error(
        "the folder {} doesn't exist or is not a folder; tell me where your plugins folder is with --plugins-dir",
        .0.display()
    )]
    NotADirectory(PathBuf),

    #[error("failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read confirmation: {0}")]
    Prompt(#[source] io::Error),
}

impl Error {
    /// Exit status for the process: 2 for problems with what was asked,
    /// 1 for failures while doing it.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::UnknownSlugs(_)
            | Error::LackingJars(_)
            | Error::NotInstalled(_)
            | Error::NothingInstalled
            | Error::MissingApiKey
            | Error::NotADirectory(_) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_errors_list_every_slug() {
        let err = Error::UnknownSlugs(vec!["missing-one".into(), "other".into()]);
        assert_eq!(
            err.to_string(),
            "couldn't find the following server mods (try using \"search\" to find their slugs): \"missing-one\", \"other\""
        );
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn remote_errors_are_surfaced_verbatim() {
        let err = Error::from(ApiError::Remote {
            code: "-1".into(),
            message: "Invalid API key".into(),
        });
        assert_eq!(err.to_string(), "ServerMods API error -1: Invalid API key");
        assert_eq!(err.exit_code(), 1);
    }
}
