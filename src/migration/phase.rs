use std::fmt;

/// Workflow phases, in the order a run can visit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Preparing,
    CheckingAvailability,
    SavingSyncState,
    PausingSync,
    AwaitingSyncIdle,
    Copying,
    UpdatingIndex,
    CleaningUp,
    RollingBack,
    RestoringSyncState,
    Done,
    Failed,
}

impl Phase {
    /// Stable snake_case name used in log fields and JSON output.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Preparing => "preparing",
            Phase::CheckingAvailability => "checking_availability",
            Phase::SavingSyncState => "saving_sync_state",
            Phase::PausingSync => "pausing_sync",
            Phase::AwaitingSyncIdle => "awaiting_sync_idle",
            Phase::Copying => "copying",
            Phase::UpdatingIndex => "updating_index",
            Phase::CleaningUp => "cleaning_up",
            Phase::RollingBack => "rolling_back",
            Phase::RestoringSyncState => "restoring_sync_state",
            Phase::Done => "done",
            Phase::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Done | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Phase::Preparing => "Preparing",
            Phase::CheckingAvailability => "Checking destination",
            Phase::SavingSyncState => "Saving sync configuration",
            Phase::PausingSync => "Pausing sync",
            Phase::AwaitingSyncIdle => "Waiting for running syncs to finish",
            Phase::Copying => "Copying data",
            Phase::UpdatingIndex => "Updating file index",
            Phase::CleaningUp => "Removing old data",
            Phase::RollingBack => "Rolling back",
            Phase::RestoringSyncState => "Restoring sync configuration",
            Phase::Done => "Done",
            Phase::Failed => "Failed",
        };
        f.write_str(text)
    }
}
