//! Idempotent resource primitives (check + apply pattern).
pub mod artifact;
pub mod fs;

use anyhow::Result;

/// Minimal interface for resources that can be described, applied, and removed.
pub trait Applicable {
    /// Human-readable description of this resource.
    fn description(&self) -> String;

    /// Bring the resource to its desired state.
    ///
    /// Creates parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be fetched, merged, or written.
    fn apply(&self) -> Result<ResourceChange>;

    /// Remove the resource, undoing a previous `apply()`.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource exists but cannot be removed.
    fn remove(&self) -> Result<ResourceChange>;
}

/// State of a resource on disk.
///
/// # Examples
///
/// ```
/// use sage_installer::resources::ResourceState;
///
/// assert_ne!(ResourceState::Missing, ResourceState::Present);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// Nothing exists at the destination.
    Missing,
    /// Something exists at the destination.
    Present,
}

/// Result of applying or removing a resource.
///
/// # Examples
///
/// ```
/// use sage_installer::resources::ResourceChange;
///
/// assert_ne!(ResourceChange::Applied, ResourceChange::AlreadyCorrect);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceChange {
    /// Content was written or deleted.
    Applied,
    /// Nothing needed to change.
    AlreadyCorrect,
}

/// Resources that can report their own state.
pub trait Resource: Applicable {
    /// Check the current state of the resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be determined.
    fn current_state(&self) -> Result<ResourceState>;
}
