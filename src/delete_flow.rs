use crate::error::{CatalogError, Result};

/// Where a category row's delete action currently stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteState {
    #[default]
    Idle,
    /// Confirmation prompt is showing for `id`.
    Confirming { id: i64 },
    /// The delete request for `id` is in flight.
    Deleting { id: i64 },
}

impl DeleteState {
    fn label(self) -> &'static str {
        match self {
            DeleteState::Idle => "idle",
            DeleteState::Confirming { .. } => "confirming",
            DeleteState::Deleting { .. } => "deleting",
        }
    }
}

/// What the screen should do once a delete request settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The category is gone upstream; reload the list.
    Refetch,
    /// The request failed; show the message and keep the list as it is.
    Notify(String),
}

/// `idle -> confirming -> deleting -> idle`, with `cancel` leading back from
/// `confirming`. Transitions that do not apply to the current state are
/// rejected and leave it untouched.
#[derive(Debug, Clone, Default)]
pub struct DeleteFlow {
    state: DeleteState,
}

impl DeleteFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DeleteState {
        self.state
    }

    /// True while a request is in flight; the delete button is disabled.
    pub fn is_busy(&self) -> bool {
        matches!(self.state, DeleteState::Deleting { .. })
    }

    pub fn request(&mut self, id: i64) -> Result<()> {
        match self.state {
            DeleteState::Idle => {
                self.state = DeleteState::Confirming { id };
                Ok(())
            }
            other => Err(invalid("request a delete", other)),
        }
    }

    pub fn cancel(&mut self) -> Result<()> {
        match self.state {
            DeleteState::Confirming { .. } => {
                self.state = DeleteState::Idle;
                Ok(())
            }
            other => Err(invalid("cancel", other)),
        }
    }

    /// Moves to `deleting` and hands back the id the request should target.
    pub fn confirm(&mut self) -> Result<i64> {
        match self.state {
            DeleteState::Confirming { id } => {
                self.state = DeleteState::Deleting { id };
                Ok(id)
            }
            other => Err(invalid("confirm", other)),
        }
    }

    pub fn finish<E: std::fmt::Display>(
        &mut self,
        result: std::result::Result<(), E>,
    ) -> Result<DeleteOutcome> {
        match self.state {
            DeleteState::Deleting { id } => {
                self.state = DeleteState::Idle;
                Ok(match result {
                    Ok(()) => DeleteOutcome::Refetch,
                    Err(e) => {
                        log::warn!("deleting category {} failed: {}", id, e);
                        DeleteOutcome::Notify(format!("Failed to delete category: {}", e))
                    }
                })
            }
            other => Err(invalid("finish a delete", other)),
        }
    }
}

fn invalid(action: &'static str, state: DeleteState) -> CatalogError {
    CatalogError::InvalidTransition {
        action,
        state: state.label(),
    }
}
