use std::fmt;

use serde::{Deserialize, Serialize};

/// The stages of the application wizard.
///
/// ```text
/// CapturingUrl → CapturingResume → CapturingProfile → Reviewing
///                                                       │  ↑
///                                                       ↓  │ (submission failed)
///                                                    Submitting → Tracking → Completed
///                                                                    └─────→ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    CapturingUrl,
    CapturingResume,
    CapturingProfile,
    Reviewing,
    Submitting,
    Tracking,
    Completed,
    Failed,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::CapturingUrl,
        Stage::CapturingResume,
        Stage::CapturingProfile,
        Stage::Reviewing,
        Stage::Submitting,
        Stage::Tracking,
        Stage::Completed,
        Stage::Failed,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Completed | Stage::Failed)
    }

    /// The single transition table of the wizard. `None` means the action is
    /// not allowed from this stage.
    pub fn next(self, action: Action) -> Option<Stage> {
        use Action as A;
        use Stage as S;

        match (self, action) {
            (_, A::Restart) => Some(S::CapturingUrl),

            (S::CapturingUrl, A::UrlAccepted) => Some(S::CapturingResume),
            (S::CapturingResume, A::ResumeParsed) => Some(S::CapturingProfile),
            (S::CapturingProfile, A::ProfileAccepted) => Some(S::Reviewing),
            (S::Reviewing, A::Confirm) => Some(S::Submitting),
            (S::Submitting, A::SubmissionAccepted) => Some(S::Tracking),
            (S::Submitting, A::SubmissionFailed) => Some(S::Reviewing),
            (S::Tracking, A::JobCompleted) => Some(S::Completed),
            (S::Tracking, A::JobFailed) => Some(S::Failed),

            (S::CapturingResume, A::Back) => Some(S::CapturingUrl),
            (S::CapturingProfile, A::Back) => Some(S::CapturingResume),
            (S::Reviewing, A::Back) => Some(S::CapturingProfile),

            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::CapturingUrl => write!(f, "CAPTURING_URL"),
            Stage::CapturingResume => write!(f, "CAPTURING_RESUME"),
            Stage::CapturingProfile => write!(f, "CAPTURING_PROFILE"),
            Stage::Reviewing => write!(f, "REVIEWING"),
            Stage::Submitting => write!(f, "SUBMITTING"),
            Stage::Tracking => write!(f, "TRACKING"),
            Stage::Completed => write!(f, "COMPLETED"),
            Stage::Failed => write!(f, "FAILED"),
        }
    }
}

/// Inputs that drive the wizard, from the user or from async results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    UrlAccepted,
    ResumeParsed,
    ProfileAccepted,
    Confirm,
    SubmissionAccepted,
    SubmissionFailed,
    JobCompleted,
    JobFailed,
    Back,
    Restart,
}

impl Action {
    pub const ALL: [Action; 10] = [
        Action::UrlAccepted,
        Action::ResumeParsed,
        Action::ProfileAccepted,
        Action::Confirm,
        Action::SubmissionAccepted,
        Action::SubmissionFailed,
        Action::JobCompleted,
        Action::JobFailed,
        Action::Back,
        Action::Restart,
    ];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::UrlAccepted => "URL_ACCEPTED",
            Action::ResumeParsed => "RESUME_PARSED",
            Action::ProfileAccepted => "PROFILE_ACCEPTED",
            Action::Confirm => "CONFIRM",
            Action::SubmissionAccepted => "SUBMISSION_ACCEPTED",
            Action::SubmissionFailed => "SUBMISSION_FAILED",
            Action::JobCompleted => "JOB_COMPLETED",
            Action::JobFailed => "JOB_FAILED",
            Action::Back => "BACK",
            Action::Restart => "RESTART",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_walks_all_stages() {
        let path = [
            (Action::UrlAccepted, Stage::CapturingResume),
            (Action::ResumeParsed, Stage::CapturingProfile),
            (Action::ProfileAccepted, Stage::Reviewing),
            (Action::Confirm, Stage::Submitting),
            (Action::SubmissionAccepted, Stage::Tracking),
            (Action::JobCompleted, Stage::Completed),
        ];
        let mut stage = Stage::CapturingUrl;
        for (action, expected) in path {
            stage = stage.next(action).unwrap();
            assert_eq!(stage, expected);
        }
        assert!(stage.is_terminal());
    }

    #[test]
    fn restart_is_always_available() {
        for stage in Stage::ALL {
            assert_eq!(stage.next(Action::Restart), Some(Stage::CapturingUrl));
        }
    }

    #[test]
    fn back_only_from_capture_and_review() {
        let allowed: Vec<Stage> = Stage::ALL
            .into_iter()
            .filter(|s| s.next(Action::Back).is_some())
            .collect();
        assert_eq!(
            allowed,
            vec![
                Stage::CapturingResume,
                Stage::CapturingProfile,
                Stage::Reviewing
            ]
        );
        assert_eq!(
            Stage::Reviewing.next(Action::Back),
            Some(Stage::CapturingProfile)
        );
    }

    #[test]
    fn terminal_stages_only_accept_restart() {
        for stage in [Stage::Completed, Stage::Failed] {
            for action in Action::ALL {
                let expected = (action == Action::Restart).then_some(Stage::CapturingUrl);
                assert_eq!(stage.next(action), expected, "{stage} + {action}");
            }
        }
    }

    #[test]
    fn failed_submission_returns_to_review() {
        assert_eq!(
            Stage::Submitting.next(Action::SubmissionFailed),
            Some(Stage::Reviewing)
        );
        assert_eq!(Stage::Submitting.next(Action::Back), None);
        assert_eq!(Stage::Tracking.next(Action::Confirm), None);
    }

    #[test]
    fn transition_table_size() {
        let legal = Stage::ALL
            .into_iter()
            .flat_map(|s| Action::ALL.into_iter().map(move |a| s.next(a)))
            .filter(Option::is_some)
            .count();
        // 8 restarts + 8 forward/result edges + 3 back edges.
        assert_eq!(legal, 19);
    }

    #[test]
    fn stage_display() {
        assert_eq!(Stage::CapturingUrl.to_string(), "CAPTURING_URL");
        assert_eq!(Stage::Tracking.to_string(), "TRACKING");
        assert_eq!(Stage::Failed.to_string(), "FAILED");
    }
}
