//! Per-device workspace provisioning
//!
//! A workspace is `<data root>/Workspace/<device identifier>/`. It is created
//! on first selection and re-seeded from the template tree on every later
//! selection through the newest-wins merge, so local edits that are newer
//! than the template survive. Workspaces are never pruned or deleted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use tweakstage_merge::{MergeError, MergeOptions, MergeReport};

use crate::device::{validate_identifier, DeviceError};
use crate::layout::AppLayout;

/// Errors for workspace provisioning
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error(transparent)]
    InvalidIdentifier(#[from] DeviceError),

    #[error("Failed to create {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Template tree not found at {0}")]
    TemplateNotFound(PathBuf),

    #[error("Failed to seed workspace: {0}")]
    Merge(#[from] MergeError),
}

/// Outcome of a successful provisioning
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub workspace: PathBuf,
    pub report: MergeReport,
}

/// Creates and seeds device workspaces from a template tree
#[derive(Debug, Clone)]
pub struct Provisioner {
    layout: AppLayout,
    template: PathBuf,
    options: MergeOptions,
}

impl Provisioner {
    pub fn new(layout: AppLayout, template: PathBuf) -> Self {
        Self {
            layout,
            template,
            options: MergeOptions::default(),
        }
    }

    pub fn with_merge_options(mut self, options: MergeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn layout(&self) -> &AppLayout {
        &self.layout
    }

    pub fn template(&self) -> &Path {
        &self.template
    }

    /// Ensure the workspace root and the device directory exist.
    pub fn ensure_workspace(&self, device_identifier: &str) -> Result<PathBuf, ProvisionError> {
        validate_identifier(device_identifier)?;

        let root = self.layout.workspace_root();
        if !root.is_dir() {
            fs::create_dir_all(&root).map_err(|e| ProvisionError::CreateDirectory {
                path: root.clone(),
                source: e,
            })?;
            info!(path = %root.display(), "workspace root created");
        }

        let workspace = self.layout.workspace_for(device_identifier);
        if !workspace.is_dir() {
            match fs::create_dir(&workspace) {
                Ok(()) => info!(path = %workspace.display(), "device workspace created"),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && workspace.is_dir() => {}
                Err(e) => {
                    return Err(ProvisionError::CreateDirectory {
                        path: workspace,
                        source: e,
                    })
                }
            }
        }

        Ok(workspace)
    }

    /// Merge the template tree into an existing workspace.
    ///
    /// A missing template leaves the workspace as it is.
    pub fn seed(&self, workspace: &Path) -> Result<MergeReport, ProvisionError> {
        if !self.template.is_dir() {
            return Err(ProvisionError::TemplateNotFound(self.template.clone()));
        }

        let report = tweakstage_merge::merge_with(&self.template, workspace, &self.options)?;
        debug!(workspace = %workspace.display(), %report, "workspace seeded");
        Ok(report)
    }

    /// Ensure and seed the workspace for a device.
    pub fn provision(&self, device_identifier: &str) -> Result<Provisioned, ProvisionError> {
        let workspace = self.ensure_workspace(device_identifier)?;
        let report = self.seed(&workspace)?;
        Ok(Provisioned { workspace, report })
    }
}
