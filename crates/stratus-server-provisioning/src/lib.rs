// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Provisioning orchestration for Stratus.
//!
//! Turns a VM lifecycle request into one audited infrastructure-tool
//! run:
//!
//! - [`WorkspaceManager`]: per-VM template directories and variables
//!   files
//! - [`ToolRunner`]: child-process execution with timeout and
//!   cancellation
//! - [`parser`]: best-effort fact extraction from tool stdout
//! - [`Provisioner`]: the apply/destroy protocol, wrapped by the
//!   operation tracker so every attempt leaves an audit event

pub mod error;
pub mod executor;
pub mod orchestrator;
pub mod parser;
pub mod types;
pub mod workspace;

pub use error::{ProvisioningError, ProvisioningResult};
pub use executor::{ExecOutput, ToolCommand, ToolRunner, ENV_VAR_PREFIX};
pub use orchestrator::{ApplyRequest, DestroyRequest, Provisioner};
pub use parser::{parse_apply, parse_destroy, ApplyReport, DestroyReport};
pub use types::{Ack, InstanceFacts, Provider};
pub use workspace::{Workspace, WorkspaceManager, VARIABLES_FILE};
