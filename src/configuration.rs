use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub api_keys: ApiKeySettings,
    #[serde(default)]
    pub analysis: AnalysisSettings,
}

#[derive(Deserialize, Clone)]
pub struct ApiKeySettings {
    pub openai: String,
}

#[derive(Deserialize, Clone)]
pub struct AnalysisSettings {
    #[serde(
        default = "default_max_batch_size",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub max_batch_size: usize,
    #[serde(default = "default_model")]
    pub model: String,
    /// Overall budget for one batch invocation. None means no budget.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        AnalysisSettings {
            max_batch_size: default_max_batch_size(),
            model: default_model(),
            timeout_seconds: None,
            output_dir: default_output_dir(),
        }
    }
}

fn default_max_batch_size() -> usize {
    10
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_output_dir() -> String {
    "reports".to_string()
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("RIVAL")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
