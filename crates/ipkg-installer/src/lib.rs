mod activation;
mod error;
mod extract;
mod fs_utils;
mod layout;
mod lifecycle;
mod orphans;
mod registry;
mod scripts;
mod types;
mod uninstall;

pub use activation::{
    parse_activation_log, read_activation_log, write_activation_log, ActivationLog,
    ActivationLogEntry, LinkFailure, ReplayPolicy, ReplayReport,
};
pub use error::{Error, Result};
pub use extract::{extract_archive, prepare_bundle};
pub use layout::{
    default_temp_dir, RootLayout, ACTIVATION_LOG_FILE, DATABASE_FILE, DEACTIVATED_MARKER_FILE,
};
pub use lifecycle::{Lifecycle, LifecycleConfig};
pub use registry::{DependencyCheck, PackageRoot, RegistryRecord};
pub use scripts::{
    BuildRunner, ProcessBuildRunner, ProcessInterpreter, ScriptInterpreter, ScriptInvocation,
    ScriptMode,
};
pub use types::{
    ActivationOutcome, InstallOutcome, InstallReason, Orphan, RemoveOutcome, SiblingFailure,
};
