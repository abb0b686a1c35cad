//! Process exit codes.
//!
//! - `0`: success, including "nothing to do"
//! - `1`: general error (I/O, unreadable root, metadata persistence)
//! - `2`: invalid command-line usage (reported by clap)
//! - `3`: invalid project graph; no project was built
//! - `4`: one or more projects ended `Failed` or `Skipped`
//! - `130`: the run was cancelled

use crate::error::Error;

pub const SUCCESS: u8 = 0;
pub const GENERAL_ERROR: u8 = 1;
pub const USAGE_ERROR: u8 = 2;
pub const INVALID_GRAPH: u8 = 3;
pub const BUILD_FAILURE: u8 = 4;
pub const CANCELLED: u8 = 130;

/// Exit code for a run aborted by `error`.
pub fn for_error(error: &Error) -> u8 {
    if error.is_structural() {
        INVALID_GRAPH
    } else if matches!(error, Error::Cancelled) {
        CANCELLED
    } else {
        GENERAL_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_for_error() {
        assert_eq!(
            for_error(&Error::CircularReference {
                cycle: vec![PathBuf::from("/a"), PathBuf::from("/a")]
            }),
            INVALID_GRAPH
        );
        assert_eq!(for_error(&Error::Cancelled), CANCELLED);
        assert_eq!(
            for_error(&Error::Metadata {
                path: PathBuf::from("/a"),
                message: "disk full".to_string()
            }),
            GENERAL_ERROR
        );
    }
}
