use serde::Deserialize;
use std::path::PathBuf;

/// Raw contents of the TOML settings file. Every key is optional; missing
/// keys fall back to built-in defaults during resolution.
#[derive(Debug, Default, Deserialize, PartialEq, Clone)]
#[serde(default)]
pub struct FileConfig {
    pub trace32: Trace32Section,
    pub runner: RunnerSection,
}

#[derive(Debug, Default, Deserialize, PartialEq, Clone)]
#[serde(default)]
pub struct Trace32Section {
    pub node: Option<String>,
    pub port: Option<PortValue>,
    pub api_dll_path: Option<String>,
    pub max_retries: Option<i64>,
    pub retry_delay: Option<f64>,
}

/// The port may be written as `port = 20000` or `port = "20000"`.
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(untagged)]
pub enum PortValue {
    Number(i64),
    Text(String),
}

impl PortValue {
    pub fn into_text(self) -> String {
        match self {
            PortValue::Number(n) => n.to_string(),
            PortValue::Text(s) => s,
        }
    }
}

#[derive(Debug, Default, Deserialize, PartialEq, Clone)]
#[serde(default)]
pub struct RunnerSection {
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
    pub verbose_flag: Option<String>,
    pub test_paths: Option<Vec<String>>,
    pub report_dir: Option<PathBuf>,
}
