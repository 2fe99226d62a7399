use std::io;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can stop a run. All of them are fatal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid cache geometry: {0}")]
    Geometry(String),

    #[error("unable to allocate a {bytes} byte buffer")]
    Allocation {
        bytes: usize,
        #[source]
        source: io::Error,
    },

    #[error("unable to read the monotonic clock")]
    Clock(#[source] io::Error),

    #[error("traversal chain broken at entry {entry}: {reason}")]
    BrokenChain { entry: usize, reason: &'static str },
}

impl Error {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Geometry(_) => 1,
            // A chain that fails verification means the buffer is unusable
            Error::Allocation { .. } | Error::BrokenChain { .. } => 2,
            Error::Clock(_) => 3,
        }
    }
}
