//! Transaction Savepoints
//!
//! Provides savepoint management for nested transactions and partial
//! rollbacks. Savepoint names are a pure function of nesting depth, so one
//! connection never produces colliding names: the depth counter resets to
//! zero whenever the outermost transaction ends.

use tracing::debug;

use crate::backends::Driver;
use crate::error::{ConnectionError, DbalResult};

/// Prefix for savepoint names derived from nesting depth
const SAVEPOINT_PREFIX: &str = "VIREO_SAVEPOINT";

/// Savepoint manager for handling nested transactions
///
/// Active savepoint names live in an explicit stack indexed by depth; the
/// top of the stack is always the savepoint of the innermost open level.
#[derive(Debug, Default)]
pub struct SavepointManager {
    stack: Vec<String>,
}

impl SavepointManager {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    /// Derive the savepoint name for a nesting depth
    pub fn savepoint_name(depth: u32) -> String {
        format!("{}_{}", SAVEPOINT_PREFIX, depth)
    }

    /// Name of the innermost active savepoint, if any
    pub fn last_savepoint_name(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }

    /// Number of active savepoints
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Create a savepoint with the given name
    pub async fn create(&self, driver: &mut dyn Driver, name: &str) -> DbalResult<()> {
        ensure_supported(driver)?;
        driver
            .execute_statement(&format!("SAVEPOINT {}", name))
            .await?;
        debug!("Created savepoint {}", name);
        Ok(())
    }

    /// Release a savepoint with the given name
    pub async fn release(&self, driver: &mut dyn Driver, name: &str) -> DbalResult<()> {
        ensure_supported(driver)?;
        driver
            .execute_statement(&format!("RELEASE SAVEPOINT {}", name))
            .await?;
        debug!("Released savepoint {}", name);
        Ok(())
    }

    /// Roll back to a savepoint with the given name
    pub async fn rollback_to(&self, driver: &mut dyn Driver, name: &str) -> DbalResult<()> {
        ensure_supported(driver)?;
        driver
            .execute_statement(&format!("ROLLBACK TO SAVEPOINT {}", name))
            .await?;
        debug!("Rolled back to savepoint {}", name);
        Ok(())
    }

    /// Create and track the savepoint for a new nesting depth
    pub(crate) async fn push_for_depth(
        &mut self,
        driver: &mut dyn Driver,
        depth: u32,
    ) -> DbalResult<()> {
        let name = Self::savepoint_name(depth);
        self.create(driver, &name).await?;
        self.stack.push(name);
        Ok(())
    }

    /// Release the innermost tracked savepoint (nested commit)
    pub(crate) async fn release_top(&mut self, driver: &mut dyn Driver) -> DbalResult<()> {
        let name = self
            .stack
            .last()
            .cloned()
            .ok_or(ConnectionError::NoActiveTransaction)?;
        self.release(driver, &name).await?;
        self.stack.pop();
        Ok(())
    }

    /// Roll back to and release the innermost tracked savepoint (nested rollback)
    pub(crate) async fn rollback_top(&mut self, driver: &mut dyn Driver) -> DbalResult<()> {
        let name = self
            .stack
            .last()
            .cloned()
            .ok_or(ConnectionError::NoActiveTransaction)?;
        self.rollback_to(driver, &name).await?;
        self.release(driver, &name).await?;
        self.stack.pop();
        Ok(())
    }

    /// Forget all tracked savepoints
    pub(crate) fn clear(&mut self) {
        self.stack.clear();
    }
}

fn ensure_supported(driver: &dyn Driver) -> DbalResult<()> {
    if !driver.supports_savepoints() {
        return Err(ConnectionError::SavepointsNotSupported);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_savepoint_names_are_depth_derived() {
        assert_eq!(SavepointManager::savepoint_name(2), "VIREO_SAVEPOINT_2");
        assert_eq!(SavepointManager::savepoint_name(3), "VIREO_SAVEPOINT_3");
        // Same depth always maps to the same name
        assert_eq!(
            SavepointManager::savepoint_name(2),
            SavepointManager::savepoint_name(2)
        );
    }

    #[test]
    fn test_new_manager_tracks_nothing() {
        let manager = SavepointManager::new();
        assert_eq!(manager.depth(), 0);
        assert!(manager.last_savepoint_name().is_none());
    }
}
