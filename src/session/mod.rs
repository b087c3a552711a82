mod state;

pub use state::{Applied, ApplicationId, JobStatus, SessionState, StatusSnapshot};
