//! Navigation-related state types.
//!
//! This module contains the showcase views and the text-entry modes that
//! capture key presses.

/// Specifying the different views.
///
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum View {
    Steps,
    Upload,
    Otp,
    Table,
    Notifications,
}

impl View {
    pub const ALL: [View; 5] = [
        View::Steps,
        View::Upload,
        View::Otp,
        View::Table,
        View::Notifications,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            View::Steps => "Onboarding",
            View::Upload => "Upload",
            View::Otp => "Verify",
            View::Table => "Customers",
            View::Notifications => "Notifications",
        }
    }

    pub fn index(&self) -> usize {
        View::ALL.iter().position(|v| v == self).unwrap_or(0)
    }

    pub fn next(&self) -> View {
        View::ALL[(self.index() + 1) % View::ALL.len()]
    }

    pub fn previous(&self) -> View {
        View::ALL[(self.index() + View::ALL.len() - 1) % View::ALL.len()]
    }
}

/// Specifies which text field on the customers table is being edited.
///
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TableInput {
    Search,
    ColumnFilter(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_cycles_forward() {
        assert_eq!(View::Steps.next(), View::Upload);
        assert_eq!(View::Notifications.next(), View::Steps);
    }

    #[test]
    fn test_view_cycles_backward() {
        assert_eq!(View::Steps.previous(), View::Notifications);
        assert_eq!(View::Otp.previous(), View::Upload);
    }

    #[test]
    fn test_view_index_matches_tabs() {
        for (i, view) in View::ALL.iter().enumerate() {
            assert_eq!(view.index(), i);
        }
    }

    #[test]
    fn test_table_input() {
        assert_eq!(TableInput::Search, TableInput::Search);
        assert_ne!(
            TableInput::ColumnFilter("plan".to_string()),
            TableInput::ColumnFilter("name".to_string())
        );
    }
}
