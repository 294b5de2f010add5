//! Linker configuration, read from `CLASSLINK_*` environment variables.
use std::env;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkerConfig {
    /// Run access and loader-constraint checks when a caller is known.
    pub check_access: bool,
    /// When set, callers without the super marker bind invokespecial
    /// targets exactly as resolved instead of re-selecting from their superclass.
    pub allow_non_virtual_calls: bool,
    /// Signature-polymorphic handle calls and dynamic call sites.
    pub enable_invoke_dynamic: bool,
    pub trace_method_handles: bool,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            check_access: true,
            allow_non_virtual_calls: false,
            enable_invoke_dynamic: true,
            trace_method_handles: false,
        }
    }
}

impl LinkerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            check_access: env_flag("CLASSLINK_CHECK_ACCESS", defaults.check_access),
            allow_non_virtual_calls: env_flag(
                "CLASSLINK_ALLOW_NON_VIRTUAL_CALLS",
                defaults.allow_non_virtual_calls,
            ),
            enable_invoke_dynamic: env_flag(
                "CLASSLINK_ENABLE_INVOKE_DYNAMIC",
                defaults.enable_invoke_dynamic,
            ),
            trace_method_handles: env_flag(
                "CLASSLINK_TRACE_METHOD_HANDLES",
                defaults.trace_method_handles,
            ),
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| parse_flag(&v))
        .unwrap_or(default)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag(" TRUE "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_defaults() {
        let config = LinkerConfig::default();
        assert!(config.check_access);
        assert!(!config.allow_non_virtual_calls);
        assert!(config.enable_invoke_dynamic);
        assert!(!config.trace_method_handles);
    }
}
