//! Resolve an environment of dbconf.yml into a validated [`Configuration`]

use crate::config::DbConf;
use crate::dsn;
use crate::env::expand_with;
use crate::error::ResolveError;
use crate::model::{Configuration, ConnectionSpec};
use crate::registry::DriverRegistry;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Directory holding migration scripts, relative to the base path
pub const MIGRATIONS_DIR: &str = "migrations";

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Turns a base directory and environment name into a [`Configuration`]
///
/// Resolution is a pure function of the file contents, the environment
/// variables visible through the lookup and the arguments. Nothing is
/// cached between calls.
#[derive(Clone)]
pub struct ConfigResolver {
    registry: DriverRegistry,
    env: EnvLookup,
}

impl ConfigResolver {
    /// Resolver reading the process environment
    pub fn new(registry: DriverRegistry) -> Self {
        Self {
            registry,
            env: Arc::new(|name| std::env::var(name).ok()),
        }
    }

    /// Replace the environment variable lookup
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(lookup);
        self
    }

    /// Resolve `environment` from `<base>/dbconf.yml`
    ///
    /// `schema_override` comes from the caller, never from the file; an
    /// empty string counts as no override.
    pub fn resolve(
        &self,
        base: impl AsRef<Path>,
        environment: &str,
        schema_override: Option<&str>,
    ) -> Result<Configuration, ResolveError> {
        let base = base.as_ref();
        let conf = DbConf::load(base)?;
        let entry = conf.environment(environment)?;

        let driver_name = self.expand(entry.require_driver(environment)?);
        let mut open = self.expand(entry.require_open(environment)?);

        let descriptor = self.registry.describe(&driver_name);

        // best effort: keep the string as written if it is not a URL we understand
        if let Some(normalized) = descriptor
            .dialect
            .as_ref()
            .and_then(|dialect| dialect.normalize_open_string(&open))
        {
            open = normalized;
        }

        let mut spec = ConnectionSpec::from_descriptor(descriptor, open);

        if let Some(import) = &entry.import {
            spec.import_path = import.clone();
        }

        if let Some(dialect_name) = &entry.dialect {
            spec.dialect = self.registry.dialect(dialect_name);
            if spec.dialect.is_none() {
                warn!(
                    environment = %environment,
                    dialect = %dialect_name,
                    "unknown dialect override"
                );
            }
        }

        let driver = spec.validate()?;

        debug!(
            environment = %environment,
            driver = %driver.name(),
            dialect = %driver.dialect().name(),
            open = %dsn::redact(driver.open_string()),
            "resolved database configuration"
        );

        Ok(Configuration {
            migrations_directory: base.join(MIGRATIONS_DIR),
            environment: environment.to_string(),
            driver,
            schema_override: schema_override
                .filter(|schema| !schema.is_empty())
                .map(str::to_string),
        })
    }

    fn expand(&self, value: &str) -> String {
        expand_with(value, |name| (self.env)(name))
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new(DriverRegistry::default())
    }
}

impl fmt::Debug for ConfigResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigResolver")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Resolve with the built-in registry and the process environment
pub fn resolve(
    base: impl AsRef<Path>,
    environment: &str,
    schema_override: Option<&str>,
) -> Result<Configuration, ResolveError> {
    ConfigResolver::default().resolve(base, environment, schema_override)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CONFIG_FILE;
    use crate::dialect::Dialect;
    use crate::error::ConfigError;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn write_conf(contents: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), contents).unwrap();
        dir
    }

    fn resolver_with(vars: &[(&str, &str)]) -> ConfigResolver {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConfigResolver::default().with_env_lookup(move |name| vars.get(name).cloned())
    }

    #[test]
    fn expands_variables_in_driver_and_open() {
        let dir = write_conf(
            "test:\n  driver: $DRIVER\n  open: host=${PGHOST} dbname=$PGDATABASE user=$UNSET_USER\n",
        );
        let resolver = resolver_with(&[("DRIVER", "postgres"), ("PGHOST", "db"), ("PGDATABASE", "app")]);

        let config = resolver.resolve(dir.path(), "test", None).unwrap();
        assert_eq!(config.driver.name(), "postgres");
        assert_eq!(config.driver.open_string(), "host=db dbname=app user=");
    }

    #[test]
    fn normalizes_postgres_urls() {
        let dir = write_conf("dev:\n  driver: postgres\n  open: postgres://u:p@host:5432/mydb\n");
        let config = resolver_with(&[]).resolve(dir.path(), "dev", None).unwrap();
        assert_eq!(
            config.driver.open_string(),
            "dbname=mydb host=host password=p port=5432 user=u"
        );
    }

    #[test]
    fn keeps_unparsable_urls() {
        let dir = write_conf("dev:\n  driver: postgres\n  open: postgres://host:notaport/mydb\n");
        let config = resolver_with(&[]).resolve(dir.path(), "dev", None).unwrap();
        assert_eq!(config.driver.open_string(), "postgres://host:notaport/mydb");
    }

    #[test]
    fn missing_environment_and_keys() {
        let dir = write_conf("dev:\n  driver: postgres\n");
        let resolver = resolver_with(&[]);

        let err = resolver.resolve(dir.path(), "nonexistent-env", Some("")).unwrap_err();
        assert!(matches!(err, ResolveError::Config(ConfigError::MissingEnvironment { .. })));

        let err = resolver.resolve(dir.path(), "dev", None).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Config(ConfigError::MissingKey { ref key, ref environment })
                if key == "open" && environment == "dev"
        ));
    }

    #[test]
    fn unknown_driver_needs_both_overrides() {
        let dir = write_conf(concat!(
            "bare:\n  driver: fakedb\n  open: fake://x\n",
            "import_only:\n  driver: fakedb\n  open: fake://x\n  import: fake-driver\n",
            "both:\n  driver: fakedb\n  open: fake://x\n  import: fake-driver\n  dialect: sqlite3\n",
        ));
        let resolver = resolver_with(&[]);

        for env in ["bare", "import_only"] {
            let err = resolver.resolve(dir.path(), env, None).unwrap_err();
            assert!(matches!(err, ResolveError::Validation(_)), "{env} should fail validation");
        }

        let config = resolver.resolve(dir.path(), "both", None).unwrap();
        assert_eq!(config.driver.import_path(), "fake-driver");
        assert_eq!(config.driver.dialect().name(), "sqlite3");
        assert_eq!(config.driver.open_string(), "fake://x");
    }

    #[test]
    fn unknown_dialect_override_fails_validation() {
        let dir = write_conf("dev:\n  driver: postgres\n  open: host=db\n  dialect: oracle\n");
        let err = resolver_with(&[]).resolve(dir.path(), "dev", None).unwrap_err();
        assert!(matches!(err, ResolveError::Validation(ref e) if e.reason == "no dialect"));
    }

    #[test]
    fn overrides_replace_registry_values() {
        let dir = write_conf(
            "dev:\n  driver: postgres\n  open: host=db dbname=app\n  import: custom-pg\n  dialect: redshift\n",
        );
        let config = resolver_with(&[]).resolve(dir.path(), "dev", None).unwrap();
        assert_eq!(config.driver.import_path(), "custom-pg");
        assert_eq!(config.driver.dialect().name(), "redshift");
    }

    #[test]
    fn derived_fields() {
        let dir = write_conf("dev:\n  driver: postgres\n  open: host=db dbname=app\n");
        let resolver = resolver_with(&[]);

        let config = resolver.resolve(dir.path(), "dev", Some("tenant_a")).unwrap();
        assert_eq!(config.migrations_directory, dir.path().join("migrations"));
        assert_eq!(config.environment, "dev");
        assert_eq!(config.schema_override.as_deref(), Some("tenant_a"));

        let config = resolver.resolve(dir.path(), "dev", Some("")).unwrap();
        assert_eq!(config.schema_override, None);
    }

    #[test]
    fn resolution_is_repeatable() {
        let dir = write_conf("dev:\n  driver: postgres\n  open: postgres://u:p@host/app?sslmode=disable\n");
        let resolver = resolver_with(&[]);

        let first = resolver.resolve(dir.path(), "dev", Some("s")).unwrap();
        let second = resolver.resolve(dir.path(), "dev", Some("s")).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn injected_registry_dialect() {
        #[derive(Debug)]
        struct Custom;
        impl Dialect for Custom {
            fn name(&self) -> &str {
                "custom"
            }
        }

        let registry = DriverRegistry::new()
            .with_dialect(Arc::new(Custom))
            .with_driver("customdb", "custom-driver", "custom");
        let dir = write_conf("dev:\n  driver: customdb\n  open: anything\n");

        let config = ConfigResolver::new(registry).resolve(dir.path(), "dev", None).unwrap();
        assert_eq!(config.driver.dialect().name(), "custom");
        assert_eq!(config.driver.import_path(), "custom-driver");
    }

    #[test]
    fn default_lookup_reads_process_environment() {
        std::env::set_var("DBCONF_RESOLVER_PROCESS_HOST", "db.from.env");
        let dir = write_conf(
            "dev:\n  driver: postgres\n  open: host=$DBCONF_RESOLVER_PROCESS_HOST dbname=${DBCONF_RESOLVER_UNSET_NAME}app\n",
        );

        let config = ConfigResolver::default().resolve(dir.path(), "dev", None).unwrap();
        assert_eq!(config.driver.open_string(), "host=db.from.env dbname=app");

        let config = resolve(dir.path(), "dev", None).unwrap();
        assert_eq!(config.driver.open_string(), "host=db.from.env dbname=app");
    }
}
