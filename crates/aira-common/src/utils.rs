//! Utility functions for Aira
//!
//! Process identity helpers used for observability of cluster roles.

/// Name of the machine this process runs on
///
/// Falls back to "localhost" when the hostname cannot be read.
pub fn machine_name() -> String {
    hostname::get()
        .ok()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

/// Identity of this process, unique for its lifetime
///
/// Formatted as `<machine>_<pid>`.
///
/// # Examples
///
/// ```
/// use aira_common::run_identity;
///
/// let id = run_identity();
/// assert!(id.ends_with(&format!("_{}", std::process::id())));
/// ```
pub fn run_identity() -> String {
    format!("{}_{}", machine_name(), std::process::id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_name_not_empty() {
        assert!(!machine_name().is_empty());
    }

    #[test]
    fn test_run_identity_is_stable() {
        let first = run_identity();
        let second = run_identity();
        assert_eq!(first, second);
        assert!(first.starts_with(&machine_name()));
    }
}
