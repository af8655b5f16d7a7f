/// The scripts the dashboard can start, by the name used in `/api/run/{name}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Workflow {
    InitInventory,
    CheckJobs,
    Delete,
    DeleteDryRun,
    DeleteVaultsOnly,
}

impl Workflow {
    pub const ALL: [Workflow; 5] = [
        Workflow::InitInventory,
        Workflow::CheckJobs,
        Workflow::Delete,
        Workflow::DeleteDryRun,
        Workflow::DeleteVaultsOnly,
    ];

    pub fn from_route(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|w| w.route() == name)
    }

    pub fn route(self) -> &'static str {
        match self {
            Workflow::InitInventory => "init",
            Workflow::CheckJobs => "check",
            Workflow::Delete => "delete",
            Workflow::DeleteDryRun => "delete-dry-run",
            Workflow::DeleteVaultsOnly => "delete-vaults-only",
        }
    }

    /// Script file name; also the registry key, so the delete variants share a slot.
    pub fn script(self) -> &'static str {
        match self {
            Workflow::InitInventory => "init_glacier_inventory.sh",
            Workflow::CheckJobs => "check_glacier_jobs.sh",
            Workflow::Delete | Workflow::DeleteDryRun | Workflow::DeleteVaultsOnly => {
                "delete_glacier_auto.sh"
            }
        }
    }

    pub fn args(self) -> &'static [&'static str] {
        match self {
            Workflow::DeleteDryRun => &["--dry-run"],
            Workflow::DeleteVaultsOnly => &["--vaults-only"],
            _ => &[],
        }
    }
}
