use serde::Deserialize;

/// One status object from the local server's pull stream.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PullProgress {
    pub status: String,
    pub digest: String,
    pub total: u64,
    pub completed: u64,
}

/// Classification of a pull status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullState {
    Pulling,
    Verifying,
    Success,
    Other,
}

impl PullProgress {
    pub fn state(&self) -> PullState {
        if self.status == "success" {
            PullState::Success
        } else if self.status.starts_with("pulling") {
            PullState::Pulling
        } else if self.status.starts_with("verifying") {
            PullState::Verifying
        } else {
            PullState::Other
        }
    }

    /// Download percentage, undefined while the total is still unknown.
    pub fn percentage(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.completed as f64 * 100.0 / self.total as f64)
        }
    }
}

/// What the progress renderer should do with one status object.
///
/// Completion is only ever signaled by the `success` status; the pulling
/// branch suppresses 0% and 100% so a full-looking bar never masquerades as
/// done, and an unknown total skips the render entirely.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressRender {
    Percent(f64),
    Status(String),
    Done,
    Skip,
}

pub fn render_decision(progress: &PullProgress) -> ProgressRender {
    match progress.state() {
        PullState::Success => ProgressRender::Done,
        PullState::Pulling => match progress.percentage() {
            Some(pct) if pct > 0.0 && pct < 100.0 => ProgressRender::Percent(pct),
            _ => ProgressRender::Skip,
        },
        PullState::Verifying | PullState::Other => ProgressRender::Status(progress.status.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulling(completed: u64, total: u64) -> PullProgress {
        PullProgress {
            status: "pulling 8daa9615cce3".to_string(),
            digest: String::new(),
            total,
            completed,
        }
    }

    #[test]
    fn zero_total_never_computes_a_percentage() {
        assert_eq!(pulling(0, 0).percentage(), None);
        assert_eq!(render_decision(&pulling(500, 0)), ProgressRender::Skip);
    }

    #[test]
    fn boundary_percentages_are_suppressed() {
        assert_eq!(render_decision(&pulling(0, 1000)), ProgressRender::Skip);
        assert_eq!(render_decision(&pulling(1000, 1000)), ProgressRender::Skip);
        assert_eq!(
            render_decision(&pulling(500, 1000)),
            ProgressRender::Percent(50.0)
        );
    }

    #[test]
    fn non_pulling_statuses_render_verbatim() {
        let verifying = PullProgress {
            status: "verifying sha256 digest".to_string(),
            ..Default::default()
        };
        assert_eq!(verifying.state(), PullState::Verifying);
        assert_eq!(
            render_decision(&verifying),
            ProgressRender::Status("verifying sha256 digest".to_string())
        );

        let writing = PullProgress {
            status: "writing manifest".to_string(),
            ..Default::default()
        };
        assert_eq!(writing.state(), PullState::Other);
        assert_eq!(
            render_decision(&writing),
            ProgressRender::Status("writing manifest".to_string())
        );
    }

    #[test]
    fn pull_stream_scenario_renders_expected_sequence() {
        let frames = [
            r#"{"status":"pulling","total":1000,"completed":0}"#,
            r#"{"status":"pulling","total":1000,"completed":500}"#,
            r#"{"status":"success"}"#,
        ];
        let decisions: Vec<ProgressRender> = frames
            .iter()
            .map(|f| render_decision(&serde_json::from_str(f).unwrap()))
            .collect();
        assert_eq!(
            decisions,
            vec![
                ProgressRender::Skip,
                ProgressRender::Percent(50.0),
                ProgressRender::Done,
            ]
        );
    }
}
