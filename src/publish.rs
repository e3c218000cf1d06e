//! Transactional publishing over git.
//!
//! Both variants rewrite the tip of the current branch and force-push it:
//!
//! - **sync**: stage everything, amend the tip commit keeping its message,
//!   force-push.
//! - **snapshot**: stage everything, amend the tip commit with a new message
//!   (default `snapshot:YYYY-MM-DD`), add an empty `latest` commit on top,
//!   force-push.
//!
//! Before the first mutating step the current `HEAD` is captured as a restore
//! point. If any later step fails, the branch is reset to the restore point
//! with `git reset --mixed`, which moves the branch pointer and index but
//! leaves working-tree files alone. The original failure is always returned;
//! a failed rollback is reported next to it, never instead of it.
//!
//! A push that fails after partially updating the remote is only undone
//! locally. There is no locking: two publishers on one project are not
//! supported.

use crate::config::PublishSection;
use crate::error::ParkiveError;
use crate::git::VersionControl;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// Message of the sentinel commit placed on top of every snapshot.
pub const LATEST_MARKER: &str = "latest";

/// Source of the current date for default snapshot messages.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        chrono::Local::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishKind {
    Sync,
    Snapshot,
}

impl fmt::Display for PublishKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishKind::Sync => f.write_str("sync"),
            PublishKind::Snapshot => f.write_str("snapshot"),
        }
    }
}

/// One command of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    CaptureRestorePoint,
    Stage,
    Amend,
    MarkLatest,
    Push,
    Rollback,
}

impl Step {
    /// State reached once this step succeeds.
    fn reached(self) -> PublishState {
        match self {
            Step::CaptureRestorePoint => PublishState::RestoreCaptured,
            Step::Stage => PublishState::Staged,
            Step::Amend => PublishState::Amended,
            Step::MarkLatest => PublishState::Marked,
            Step::Push => PublishState::Pushed,
            Step::Rollback => PublishState::RolledBack,
        }
    }
}

/// Progress of a protocol run. `Pushed` and `RolledBack` are terminal; a run
/// that could not capture its restore point stays at `Start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishState {
    Start,
    RestoreCaptured,
    Staged,
    Amended,
    Marked,
    Pushed,
    RollingBack,
    RolledBack,
}

/// A command that was run, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    pub step: Step,
    pub command: String,
    pub succeeded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishReport {
    pub kind: PublishKind,
    /// `HEAD` before the run started, once captured.
    pub restore_point: Option<String>,
    pub trace: Vec<TraceEntry>,
    pub state: PublishState,
}

#[derive(Debug)]
pub enum RollbackStatus {
    /// Nothing had been changed yet.
    NotAttempted,
    Restored,
    Failed(ParkiveError),
}

/// A publish run that did not reach `Pushed`.
#[derive(Debug, thiserror::Error)]
#[error("{}", failure_summary(.report, .rollback))]
pub struct PublishFailure {
    pub report: PublishReport,
    /// The step failure that stopped the run.
    #[source]
    pub cause: ParkiveError,
    pub rollback: RollbackStatus,
}

fn failure_summary(report: &PublishReport, rollback: &RollbackStatus) -> String {
    let restore_point = report.restore_point.as_deref().unwrap_or("HEAD");
    match rollback {
        RollbackStatus::NotAttempted => format!("{} failed before changing anything", report.kind),
        RollbackStatus::Restored => format!(
            "{} failed and the local branch has been rolled back to {restore_point}",
            report.kind
        ),
        RollbackStatus::Failed(err) => format!(
            "{} failed and rolling back to {restore_point} also failed: {err}",
            report.kind
        ),
    }
}

struct PlannedStep {
    step: Step,
    args: Vec<String>,
}

impl PlannedStep {
    fn new(step: Step, args: &[&str]) -> Self {
        Self {
            step,
            args: args.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Runs the publish protocol against a version-control backend.
pub struct Publisher<V, C = SystemClock> {
    vcs: V,
    clock: C,
    remote: String,
    branch: String,
}

impl<V: VersionControl> Publisher<V> {
    pub fn new(vcs: V, publish: &PublishSection) -> Self {
        Self {
            vcs,
            clock: SystemClock,
            remote: publish.remote.clone(),
            branch: publish.branch.clone(),
        }
    }
}

impl<V: VersionControl, C: Clock> Publisher<V, C> {
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Publisher<V, C2> {
        Publisher {
            vcs: self.vcs,
            clock,
            remote: self.remote,
            branch: self.branch,
        }
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    /// Amends the tip commit with all current changes and force-pushes it.
    pub fn sync(&self) -> Result<PublishReport, PublishFailure> {
        let plan = vec![
            PlannedStep::new(Step::Stage, &["add", "."]),
            PlannedStep::new(Step::Amend, &["commit", "--amend", "--no-edit"]),
            self.push_step(),
        ];
        self.execute(PublishKind::Sync, plan)
    }

    /// Amends the tip commit with `message` (or `snapshot:<today>`), stacks a
    /// `latest` marker commit on top and force-pushes.
    pub fn snapshot(&self, message: Option<&str>) -> Result<PublishReport, PublishFailure> {
        let message = match message {
            Some(message) => message.to_string(),
            None => format!("snapshot:{}", self.clock.today().format("%Y-%m-%d")),
        };
        let plan = vec![
            PlannedStep::new(Step::Stage, &["add", "."]),
            PlannedStep::new(Step::Amend, &["commit", "--amend", "--allow-empty", "-m", message.as_str()]),
            PlannedStep::new(Step::MarkLatest, &["commit", "--allow-empty", "-m", LATEST_MARKER]),
            self.push_step(),
        ];
        self.execute(PublishKind::Snapshot, plan)
    }

    fn push_step(&self) -> PlannedStep {
        PlannedStep::new(Step::Push, &["push", self.remote.as_str(), self.branch.as_str(), "--force"])
    }

    fn execute(&self, kind: PublishKind, plan: Vec<PlannedStep>) -> Result<PublishReport, PublishFailure> {
        let mut report = PublishReport {
            kind,
            restore_point: None,
            trace: Vec::new(),
            state: PublishState::Start,
        };

        let restore_point = match self.invoke(Step::CaptureRestorePoint, &["rev-parse", "HEAD"], &mut report) {
            Ok(stdout) => stdout.trim().to_string(),
            Err(cause) => {
                return Err(PublishFailure {
                    report,
                    cause,
                    rollback: RollbackStatus::NotAttempted,
                });
            }
        };
        info!(%kind, restore_point = %restore_point, "captured restore point");
        report.restore_point = Some(restore_point.clone());

        for planned in &plan {
            let args: Vec<&str> = planned.args.iter().map(String::as_str).collect();
            if let Err(cause) = self.invoke(planned.step, &args, &mut report) {
                warn!(%kind, step = ?planned.step, error = %cause, "step failed, rolling back");
                let rollback = self.rollback(&restore_point, &mut report);
                return Err(PublishFailure {
                    report,
                    cause,
                    rollback,
                });
            }
        }

        info!(%kind, "published");
        Ok(report)
    }

    /// Runs one step, records it in the trace and advances the state on success.
    fn invoke(&self, step: Step, args: &[&str], report: &mut PublishReport) -> Result<String, ParkiveError> {
        let command = self.vcs.display(args);
        let outcome = self.vcs.run(args).and_then(|outcome| outcome.check(&command));
        report.trace.push(TraceEntry {
            step,
            command: command.clone(),
            succeeded: outcome.is_ok(),
        });
        let outcome = outcome?;
        info!(?step, %command, "step succeeded");
        report.state = step.reached();
        Ok(outcome.stdout)
    }

    fn rollback(&self, restore_point: &str, report: &mut PublishReport) -> RollbackStatus {
        report.state = PublishState::RollingBack;
        let result = self.invoke(Step::Rollback, &["reset", "--mixed", restore_point], report);
        report.state = PublishState::RolledBack;
        match result {
            Ok(_) => RollbackStatus::Restored,
            Err(err) => {
                warn!(restore_point, error = %err, "rollback failed");
                RollbackStatus::Failed(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::git::CommandOutcome;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct FixedClock(NaiveDate);

    impl Clock for FixedClock {
        fn today(&self) -> NaiveDate {
            self.0
        }
    }

    #[derive(Debug, Clone)]
    struct Commit {
        parent: Option<String>,
        message: String,
    }

    /// In-memory git: a commit graph, a movable `HEAD` and a call log.
    struct ScriptedGit {
        commits: RefCell<HashMap<String, Commit>>,
        head: RefCell<String>,
        calls: RefCell<Vec<String>>,
        fail_when: fn(&[&str]) -> bool,
    }

    impl ScriptedGit {
        fn new(fail_when: fn(&[&str]) -> bool) -> Self {
            let mut commits = HashMap::new();
            commits.insert(
                "c0".to_string(),
                Commit {
                    parent: None,
                    message: "notes".to_string(),
                },
            );
            Self {
                commits: RefCell::new(commits),
                head: RefCell::new("c0".to_string()),
                calls: RefCell::new(Vec::new()),
                fail_when,
            }
        }

        fn head(&self) -> String {
            self.head.borrow().clone()
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        /// Commit messages from `HEAD` down to the root.
        fn log(&self) -> Vec<String> {
            let commits = self.commits.borrow();
            let mut messages = Vec::new();
            let mut current = Some(self.head());
            while let Some(id) = current {
                let commit = &commits[&id];
                messages.push(commit.message.clone());
                current = commit.parent.clone();
            }
            messages
        }

        fn commit(&self, args: &[&str]) {
            let mut commits = self.commits.borrow_mut();
            let head = self.head();
            let amend = args.contains(&"--amend");
            let message = args
                .iter()
                .position(|a| *a == "-m")
                .map(|i| args[i + 1].to_string())
                .unwrap_or_else(|| commits[&head].message.clone());
            let parent = if amend {
                commits[&head].parent.clone()
            } else {
                Some(head)
            };
            let id = format!("c{}", commits.len());
            commits.insert(id.clone(), Commit { parent, message });
            *self.head.borrow_mut() = id;
        }
    }

    impl VersionControl for ScriptedGit {
        fn run(&self, args: &[&str]) -> Result<CommandOutcome> {
            self.calls.borrow_mut().push(args.join(" "));
            if (self.fail_when)(args) {
                return Ok(CommandOutcome::failure(1, format!("error: {} rejected\n", args[0])));
            }
            match args[0] {
                "rev-parse" => return Ok(CommandOutcome::success(format!("{}\n", self.head()))),
                "commit" => self.commit(args),
                "reset" => *self.head.borrow_mut() = args[2].to_string(),
                _ => {}
            }
            Ok(CommandOutcome::success(""))
        }

        fn display(&self, args: &[&str]) -> String {
            format!("git {}", args.join(" "))
        }
    }

    fn never(_: &[&str]) -> bool {
        false
    }

    fn publisher(fail_when: fn(&[&str]) -> bool) -> Publisher<ScriptedGit, FixedClock> {
        Publisher::new(ScriptedGit::new(fail_when), &PublishSection::default())
            .with_clock(FixedClock(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()))
    }

    #[test]
    fn sync_runs_steps_in_order() {
        let publisher = publisher(never);
        let report = publisher.sync().unwrap();

        assert_eq!(
            publisher.vcs().calls(),
            vec![
                "rev-parse HEAD",
                "add .",
                "commit --amend --no-edit",
                "push origin main --force",
            ]
        );
        assert_eq!(report.state, PublishState::Pushed);
        assert_eq!(report.restore_point.as_deref(), Some("c0"));
        assert!(report.trace.iter().all(|entry| entry.succeeded));
        assert_eq!(publisher.vcs().log(), vec!["notes"]);
        assert_ne!(publisher.vcs().head(), "c0");
    }

    #[test]
    fn sync_push_failure_rolls_back_to_restore_point() {
        let publisher = publisher(|args| args[0] == "push");
        let failure = publisher.sync().unwrap_err();

        assert_eq!(publisher.vcs().head(), "c0");
        assert_eq!(failure.report.state, PublishState::RolledBack);
        assert!(matches!(failure.rollback, RollbackStatus::Restored));
        assert!(matches!(
            failure.cause,
            ParkiveError::CommandFailed { ref command, .. } if command == "git push origin main --force"
        ));
        assert_eq!(
            publisher.vcs().calls().last().map(String::as_str),
            Some("reset --mixed c0")
        );
        assert_eq!(
            failure.to_string(),
            "sync failed and the local branch has been rolled back to c0"
        );
    }

    #[test]
    fn snapshot_uses_dated_default_message_and_latest_marker() {
        let publisher = publisher(never);
        let report = publisher.snapshot(None).unwrap();

        assert_eq!(report.state, PublishState::Pushed);
        assert_eq!(publisher.vcs().log(), vec!["latest", "snapshot:2024-01-02"]);
        assert_eq!(
            publisher.vcs().calls(),
            vec![
                "rev-parse HEAD",
                "add .",
                "commit --amend --allow-empty -m snapshot:2024-01-02",
                "commit --allow-empty -m latest",
                "push origin main --force",
            ]
        );
        let steps: Vec<Step> = report.trace.iter().map(|entry| entry.step).collect();
        assert_eq!(
            steps,
            vec![
                Step::CaptureRestorePoint,
                Step::Stage,
                Step::Amend,
                Step::MarkLatest,
                Step::Push,
            ]
        );
    }

    #[test]
    fn snapshot_accepts_custom_message() {
        let publisher = publisher(never);
        publisher.snapshot(Some("before reorganizing")).unwrap();
        assert_eq!(publisher.vcs().log(), vec!["latest", "before reorganizing"]);
    }

    #[test]
    fn snapshot_marker_failure_rolls_back() {
        let publisher = publisher(|args| args == ["commit", "--allow-empty", "-m", "latest"]);
        let failure = publisher.snapshot(None).unwrap_err();

        assert_eq!(publisher.vcs().head(), "c0");
        assert_eq!(publisher.vcs().log(), vec!["notes"]);
        assert!(!publisher.vcs().calls().iter().any(|c| c.starts_with("push")));
        assert_eq!(failure.report.state, PublishState::RolledBack);
    }

    #[test]
    fn failed_stage_skips_later_steps() {
        let publisher = publisher(|args| args[0] == "add");
        publisher.sync().unwrap_err();
        assert_eq!(
            publisher.vcs().calls(),
            vec!["rev-parse HEAD", "add .", "reset --mixed c0"]
        );
    }

    #[test]
    fn capture_failure_changes_nothing() {
        let publisher = publisher(|args| args[0] == "rev-parse");
        let failure = publisher.snapshot(None).unwrap_err();

        assert_eq!(publisher.vcs().calls(), vec!["rev-parse HEAD"]);
        assert!(matches!(failure.rollback, RollbackStatus::NotAttempted));
        assert_eq!(failure.report.state, PublishState::Start);
        assert_eq!(failure.report.restore_point, None);
        assert_eq!(failure.to_string(), "snapshot failed before changing anything");
    }

    #[test]
    fn rollback_failure_keeps_original_cause() {
        let publisher = publisher(|args| matches!(args[0], "push" | "reset"));
        let failure = publisher.sync().unwrap_err();

        assert!(matches!(
            failure.cause,
            ParkiveError::CommandFailed { ref command, .. } if command.starts_with("git push")
        ));
        assert!(matches!(failure.rollback, RollbackStatus::Failed(_)));
        let last = failure.report.trace.last().unwrap();
        assert_eq!(last.step, Step::Rollback);
        assert!(!last.succeeded);
        assert!(failure.to_string().contains("rolling back to c0 also failed"));
    }

    #[test]
    fn failure_report_serializes_for_json_output() {
        let publisher = publisher(|args| args[0] == "push");
        let failure = publisher.sync().unwrap_err();

        let value = serde_json::to_value(&failure.report).unwrap();
        assert_eq!(value["kind"], "sync");
        assert_eq!(value["state"], "rolled_back");
        assert_eq!(value["restore_point"], "c0");
        assert_eq!(
            value["trace"][3],
            serde_json::json!({
                "step": "push",
                "command": "git push origin main --force",
                "succeeded": false,
            })
        );
        assert_eq!(value["trace"][4]["step"], "rollback");
    }

    #[test]
    fn push_target_follows_config() {
        let publish = PublishSection {
            remote: "backup".to_string(),
            branch: "trunk".to_string(),
        };
        let publisher = Publisher::new(ScriptedGit::new(never), &publish);
        publisher.sync().unwrap();
        assert_eq!(
            publisher.vcs().calls().last().map(String::as_str),
            Some("push backup trunk --force")
        );
    }
}
