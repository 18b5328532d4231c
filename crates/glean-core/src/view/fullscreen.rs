use tracing::debug;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FullscreenState {
    active: bool,
}

impl FullscreenState {
    pub fn is_fullscreen(&self) -> bool {
        self.active
    }

    /// Returns whether the state changed.
    pub fn enter(&mut self) -> bool {
        self.set(true)
    }

    /// Returns whether the state changed.
    pub fn exit(&mut self) -> bool {
        self.set(false)
    }

    /// Returns the new state.
    pub fn toggle(&mut self) -> bool {
        self.set(!self.active);
        self.active
    }

    fn set(&mut self, active: bool) -> bool {
        if self.active == active {
            return false;
        }
        self.active = active;
        debug!(fullscreen = active, "Fullscreen changed");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_exit_toggle_report_changes() {
        let mut state = FullscreenState::default();
        assert!(state.enter());
        assert!(!state.enter());
        assert!(state.is_fullscreen());
        assert!(!state.toggle());
        assert!(!state.exit());
        assert!(state.toggle());
    }
}
