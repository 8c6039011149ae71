//! Tracing filter construction.

/// Build filter directives string from LoggingConfig
///
/// Combines the base level with per-component levels, each scoped to the
/// `conduit::<component>` target.
///
/// # Examples
///
/// ```
/// use conduit::config::{LogFormat, LoggingConfig};
/// use conduit::logging::build_filter_directives;
/// use std::collections::BTreeMap;
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Pretty,
///     component_levels: Some(BTreeMap::from([
///         ("scoring".to_string(), "debug".to_string()),
///         ("weights".to_string(), "trace".to_string()),
///     ])),
/// };
///
/// let filter_str = build_filter_directives(&config);
/// assert_eq!(filter_str, "info,conduit::scoring=debug,conduit::weights=trace");
/// ```
pub fn build_filter_directives(config: &crate::config::LoggingConfig) -> String {
    let mut filter_str = config.level.clone();

    if let Some(component_levels) = &config.component_levels {
        for (component, level) in component_levels {
            filter_str.push_str(&format!(",conduit::{}={}", component, level));
        }
    }

    filter_str
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoggingConfig;

    #[test]
    fn base_level_only() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            ..Default::default()
        };
        assert_eq!(build_filter_directives(&config), "warn");
    }

    #[test]
    fn directives_parse_as_env_filter() {
        let config: LoggingConfig = toml::from_str(
            r#"
            level = "info"
            [component_levels]
            streaming = "debug"
            "#,
        )
        .unwrap();
        let filter_str = build_filter_directives(&config);
        assert!(tracing_subscriber::EnvFilter::try_new(&filter_str).is_ok());
    }
}
