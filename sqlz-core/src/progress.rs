use serde::Serialize;
use std::fmt;

/// Per-file status while a compression pass runs. Display only; nothing in
/// the pipeline branches on it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "percent", rename_all = "kebab-case")]
pub enum ProgressStatus {
    #[default]
    NotStarted,
    InProgress(u8),
    Complete,
    Failed,
}

impl ProgressStatus {
    pub fn percent(&self) -> Option<u8> {
        match self {
            ProgressStatus::NotStarted | ProgressStatus::Failed => None,
            ProgressStatus::InProgress(p) => Some((*p).min(100)),
            ProgressStatus::Complete => Some(100),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ProgressStatus::Failed)
    }
}

impl fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressStatus::NotStarted => f.write_str("pending"),
            ProgressStatus::InProgress(p) => write!(f, "{}%", (*p).min(100)),
            ProgressStatus::Complete => f.write_str("done"),
            ProgressStatus::Failed => f.write_str("failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_reflects_state() {
        assert_eq!(ProgressStatus::NotStarted.percent(), None);
        assert_eq!(ProgressStatus::InProgress(50).percent(), Some(50));
        assert_eq!(ProgressStatus::InProgress(250).percent(), Some(100));
        assert_eq!(ProgressStatus::Complete.percent(), Some(100));
        assert_eq!(ProgressStatus::Failed.percent(), None);
    }

    #[test]
    fn display_is_short() {
        assert_eq!(ProgressStatus::InProgress(0).to_string(), "0%");
        assert_eq!(ProgressStatus::Complete.to_string(), "done");
        assert_eq!(ProgressStatus::Failed.to_string(), "failed");
    }
}
