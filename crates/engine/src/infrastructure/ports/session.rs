//! Session ports: who is acting, and how to tell them things.

/// Whether the current user may override deletion vetoes.
#[cfg_attr(test, mockall::automock)]
pub trait AuthorityPort: Send + Sync {
    fn has_elevated_authority(&self) -> bool;
}

/// User-visible notifications.
#[cfg_attr(test, mockall::automock)]
pub trait NotificationPort: Send + Sync {
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}
