//! Migration engine configuration.

/// Environment variable enabling confirmed execution.
pub const CONFIRM_ENV: &str = "LITEORM_CONFIRM_MIGRATIONS";

/// Environment variable controlling transactional recreation.
pub const ATOMIC_ENV: &str = "LITEORM_ATOMIC_RECREATION";

/// Whether planned statements are sent to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MigrationMode {
    /// Render plans without executing anything.
    #[default]
    DryRun,
    /// Execute plans after operator confirmation.
    Execute,
}

/// Migration engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationConfig {
    /// Dry-run or confirmed execution.
    pub mode: MigrationMode,
    /// Wrap a fully confirmed recreation in a single transaction.
    pub atomic_recreation: bool,
    /// How many random temporary table names to try before giving up.
    pub temp_name_attempts: usize,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            mode: MigrationMode::DryRun,
            atomic_recreation: true,
            temp_name_attempts: 8,
        }
    }
}

impl MigrationConfig {
    /// Dry-run configuration.
    pub fn dry_run() -> Self {
        Self::default()
    }

    /// Confirmed-execution configuration.
    pub fn execute() -> Self {
        Self::default().with_mode(MigrationMode::Execute)
    }

    /// Set the mode.
    pub fn with_mode(mut self, mode: MigrationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable or disable transactional recreation.
    pub fn with_atomic_recreation(mut self, atomic: bool) -> Self {
        self.atomic_recreation = atomic;
        self
    }

    /// Set the number of temporary name attempts.
    pub fn with_temp_name_attempts(mut self, attempts: usize) -> Self {
        self.temp_name_attempts = attempts.max(1);
        self
    }

    /// Check if this configuration never touches the database.
    pub fn is_dry_run(&self) -> bool {
        self.mode == MigrationMode::DryRun
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through a variable lookup function.
    ///
    /// Unset or unrecognised values keep the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(confirm) = lookup(CONFIRM_ENV).as_deref().and_then(parse_flag) {
            config.mode = if confirm {
                MigrationMode::Execute
            } else {
                MigrationMode::DryRun
            };
        }
        if let Some(atomic) = lookup(ATOMIC_ENV).as_deref().and_then(parse_flag) {
            config.atomic_recreation = atomic;
        }
        config
    }
}

/// Parse a boolean environment value.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_is_dry_run() {
        let config = MigrationConfig::from_lookup(lookup(&[]));
        assert!(config.is_dry_run());
        assert!(config.atomic_recreation);
        assert_eq!(config, MigrationConfig::default());
    }

    #[test]
    fn test_confirm_flag() {
        let config = MigrationConfig::from_lookup(lookup(&[(CONFIRM_ENV, "Yes")]));
        assert_eq!(config.mode, MigrationMode::Execute);

        let config = MigrationConfig::from_lookup(lookup(&[(CONFIRM_ENV, "off")]));
        assert!(config.is_dry_run());
    }

    #[test]
    fn test_unrecognised_values_keep_defaults() {
        let config = MigrationConfig::from_lookup(lookup(&[
            (CONFIRM_ENV, "sometimes"),
            (ATOMIC_ENV, "0"),
        ]));
        assert!(config.is_dry_run());
        assert!(!config.atomic_recreation);
    }

    #[test]
    fn test_builders() {
        let config = MigrationConfig::execute()
            .with_atomic_recreation(false)
            .with_temp_name_attempts(0);
        assert!(!config.is_dry_run());
        assert!(!config.atomic_recreation);
        assert_eq!(config.temp_name_attempts, 1);
    }
}
