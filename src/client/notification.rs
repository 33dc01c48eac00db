use crate::core::DeskError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Info,
    Error,
}

/// Transient user-facing message produced at the call site of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    /// Session is no longer valid and the user must sign in again.
    pub requires_login: bool,
}

impl Notification {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            title: title.into(),
            message: message.into(),
            requires_login: false,
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            ..Self::success(title, message)
        }
    }

    pub fn from_error(err: &DeskError) -> Self {
        let (title, message, requires_login) = match err {
            DeskError::Validation(_) | DeskError::TypeMismatch(_) => {
                ("Invalid input", err.user_message(), false)
            }
            DeskError::NotFound(_) => ("Not found", err.user_message(), false),
            DeskError::Unauthorized(_) => (
                "Session expired",
                "Please sign in again.".to_string(),
                true,
            ),
            DeskError::Forbidden(_) => (
                "Access restricted",
                "You do not have permission to perform this action.".to_string(),
                true,
            ),
            DeskError::Transport(_) => (
                "Network error",
                "The server could not be reached. Please try again.".to_string(),
                false,
            ),
            other => ("Request failed", other.user_message(), false),
        };

        Self {
            level: NotificationLevel::Error,
            title: title.to_string(),
            message,
            requires_login,
        }
    }
}

impl From<&DeskError> for Notification {
    fn from(err: &DeskError) -> Self {
        Self::from_error(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_is_verbatim() {
        let err = DeskError::Validation("Application end must be after start".into());
        let notification = Notification::from_error(&err);
        assert_eq!(notification.level, NotificationLevel::Error);
        assert_eq!(notification.message, "Application end must be after start");
        assert!(!notification.requires_login);
    }

    #[test]
    fn authorization_failures_require_login() {
        assert!(Notification::from_error(&DeskError::Unauthorized("expired".into())).requires_login);
        assert!(Notification::from_error(&DeskError::Forbidden("no".into())).requires_login);
    }

    #[test]
    fn remote_errors_keep_server_message() {
        let err = DeskError::Remote {
            status: 500,
            message: "database unavailable".into(),
        };
        assert_eq!(Notification::from_error(&err).message, "database unavailable");
    }
}
