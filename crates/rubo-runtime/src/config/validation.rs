//! Configuration validation.

use super::error::{ConfigError, ConfigResult};
use super::schema::{LogOutput, LoggingConfig, RobotConfig, RuboConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &RuboConfig) -> ConfigResult<()> {
    validate_robot_config(&config.robot)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

fn validate_robot_config(robot: &RobotConfig) -> ConfigResult<()> {
    if robot.name.trim().is_empty() {
        return Err(ConfigError::missing_field("robot.name"));
    }

    if let Some(alias) = &robot.alias {
        if alias.trim().is_empty() {
            return Err(ConfigError::validation("robot.alias cannot be blank"));
        }
        if alias == &robot.name {
            return Err(ConfigError::validation(format!(
                "robot.alias '{alias}' is the same as robot.name"
            )));
        }
    }

    if robot.adapter.trim().is_empty() {
        return Err(ConfigError::missing_field("robot.adapter"));
    }

    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    if logging.max_files == 0 {
        return Err(ConfigError::validation("logging.max_files must be at least 1"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(validate_config(&RuboConfig::default()).is_ok());
    }

    #[test]
    fn test_blank_name() {
        let mut config = RuboConfig::default();
        config.robot.name = "  ".into();
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { field }) if field == "robot.name"
        ));
    }

    #[test]
    fn test_alias_equal_to_name() {
        let mut config = RuboConfig::default();
        config.robot.alias = Some("Rubo".into());
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_file_output_needs_path() {
        let mut config = RuboConfig::default();
        config.logging.output = LogOutput::File;
        assert!(validate_config(&config).is_err());

        config.logging.file_path = Some("logs/rubo.log".into());
        assert!(validate_config(&config).is_ok());
    }
}
