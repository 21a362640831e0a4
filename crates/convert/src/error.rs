use std::path::PathBuf;

/// Why container metadata could not be obtained for a file
#[derive(thiserror::Error, Debug)]
pub enum ProbeError {
    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("unreadable media file {}: {reason}", .path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("failed to run probe tool {}: {source}", .bin.display())]
    Tool {
        bin: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProbeError {
    /// Skippable errors concern the file itself; anything else is an environment problem
    pub fn is_skippable(&self) -> bool {
        matches!(self, ProbeError::NotAFile(_) | ProbeError::Unreadable { .. })
    }
}

/// Failure of a single encoder invocation
#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    #[error("failed to launch encoder {}: {source}", .bin.display())]
    Launch {
        bin: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encoder exited with {} for {}", exit_label(.code), .input.display())]
    Failed {
        input: PathBuf,
        code: Option<i32>,
        stderr: String,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "a signal".to_string(),
    }
}
