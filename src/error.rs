use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy of the driver layer.
///
/// Transient reaction-force query failures are deliberately absent: an
/// untracked boundary yields `None` from the query API and the run loop
/// keeps going, so no error value exists for that case.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad CLI arity or an unparsable/invalid parameter file. Raised before
    /// any simulation state is created.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Invalid handle, index, or state-machine misuse. Programmer error.
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// A mesh file listed in a soup could not be resolved on disk.
    #[error("mesh file could not be resolved: {path}")]
    MeshLoad { path: PathBuf },

    /// Output directory or snapshot write failures. Never retried.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// CSV-level write failure while emitting a snapshot or layout file.
    #[error("csv write error: {0}")]
    Csv(#[from] csv::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_context() {
        let e = Error::Configuration("sphere_radius must be > 0".to_string());
        let msg = format!("{e}");
        assert!(msg.contains("configuration error"));
        assert!(msg.contains("sphere_radius"));
    }

    #[test]
    fn mesh_load_names_the_path() {
        let e = Error::MeshLoad {
            path: PathBuf::from("meshes/gran_zcone.obj"),
        };
        assert!(format!("{e}").contains("gran_zcone.obj"));
    }
}
