use crate::error::SyncError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorPresentation {
    message: Option<String>,
    expanded: bool,
}

impl ErrorPresentation {
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// Every new error starts collapsed.
    pub fn show(&mut self, err: &SyncError) {
        self.message = Some(err.message.clone());
        self.expanded = false;
    }

    pub fn clear(&mut self) {
        self.message = None;
    }

    pub fn toggle(&mut self) -> bool {
        self.expanded = !self.expanded;
        self.expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_twice_restores() {
        let mut view = ErrorPresentation::default();
        view.show(&SyncError::new("Temperatures error (502): bad gateway"));

        assert!(view.toggle());
        assert!(!view.toggle());
        assert!(!view.is_expanded());
    }

    #[test]
    fn new_error_collapses() {
        let mut view = ErrorPresentation::default();
        view.show(&SyncError::new("first"));
        view.toggle();
        assert!(view.is_expanded());

        view.show(&SyncError::new("second"));
        assert_eq!(view.message(), Some("second"));
        assert!(!view.is_expanded());
    }

    #[test]
    fn clear_drops_message() {
        let mut view = ErrorPresentation::default();
        view.show(&SyncError::new("first"));
        view.clear();
        assert_eq!(view.message(), None);
    }
}
