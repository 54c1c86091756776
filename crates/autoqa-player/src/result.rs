/// Terminal outcome of one playback run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackResult {
    pub success: bool,
    pub steps_completed: usize,
    pub total_steps: usize,
    pub failure_reason: Option<String>,
}

impl PlaybackResult {
    pub fn success(total_steps: usize) -> Self {
        Self {
            success: true,
            steps_completed: total_steps,
            total_steps,
            failure_reason: None,
        }
    }

    pub fn failure(steps_completed: usize, total_steps: usize, reason: String) -> Self {
        Self {
            success: false,
            steps_completed,
            total_steps,
            failure_reason: Some(reason),
        }
    }
}
