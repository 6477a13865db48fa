use super::Config;
use anyhow::Result;
use tracing::warn;

/// Validation errors for configuration.
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Validate a configuration object.
pub fn validate_config(config: &Config) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();

    if config.gateway.port == 0 {
        errors.push(ConfigValidationError {
            path: "gateway.port".to_string(),
            message: "Port must be greater than 0".to_string(),
        });
    }

    if let Err(e) = url::Url::parse(&config.upstream.base_url) {
        errors.push(ConfigValidationError {
            path: "upstream.baseUrl".to_string(),
            message: format!("Invalid URL: {e}"),
        });
    }

    if config.upstream.api_key.is_none() {
        warn!("No upstream API key configured; set XAI_API_KEY before serving");
    }

    if let Some(ref proxy) = config.client.proxy_url {
        if let Err(e) = url::Url::parse(proxy) {
            errors.push(ConfigValidationError {
                path: "client.proxyUrl".to_string(),
                message: format!("Invalid URL: {e}"),
            });
        }
    }

    let deployment = &config.deployment;
    if deployment.text_model.trim().is_empty() {
        errors.push(ConfigValidationError {
            path: "deployment.textModel".to_string(),
            message: "Model name is required".to_string(),
        });
    }
    if deployment.supports_images && deployment.vision_model.trim().is_empty() {
        errors.push(ConfigValidationError {
            path: "deployment.visionModel".to_string(),
            message: "Image support requires a vision model".to_string(),
        });
    }
    for (path, temperature) in [
        ("deployment.textTemperature", deployment.text_temperature),
        ("deployment.visionTemperature", deployment.vision_temperature),
    ] {
        if !(0.0..=2.0).contains(&temperature) {
            errors.push(ConfigValidationError {
                path: path.to_string(),
                message: format!("Temperature {temperature} is outside 0.0..=2.0"),
            });
        }
    }
    if deployment.max_outbound_image_chars == 0 {
        errors.push(ConfigValidationError {
            path: "deployment.maxOutboundImageChars".to_string(),
            message: "Must be greater than 0".to_string(),
        });
    }

    if config.gateway.bind == super::GatewayBindMode::Custom
        && config.gateway.custom_bind_host.is_none()
    {
        errors.push(ConfigValidationError {
            path: "gateway.customBindHost".to_string(),
            message: "Custom bind mode requires a host".to_string(),
        });
    }

    errors
}

/// Validate configuration and return Result.
pub fn validate_config_object(config: &Config) -> Result<()> {
    let errors = validate_config(config);
    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        anyhow::bail!("Configuration validation failed:\n{}", messages.join("\n"));
    }
}
