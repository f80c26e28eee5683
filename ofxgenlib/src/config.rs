//! Настройки конвертера: реквизиты брокера, параметры OFX, раскладка входного файла.
//!
//! Все поля имеют значения по умолчанию, поэтому TOML-файл может содержать
//! только то, что нужно переопределить:
//!
//! ```toml
//! broker_id = "fidelity.com"
//! currency = "USD"
//! ofx_version = 102
//! error_policy = "skip"
//!
//! [institution]
//! org = "Fidelity Investments"
//! fid = "07776"
//!
//! [layout]
//! marker_row = 3
//! marker = "Brokerage"
//! header_row = 5
//! ```

use crate::{
    classify::ErrorPolicy,
    error::{OfxGenError, Result},
    model::Institution,
    schema::InputLayout,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BROKER_ID: &str = "fidelity.com";
pub const DEFAULT_ORG: &str = "Fidelity Investments";
pub const DEFAULT_FID: &str = "07776";
pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_LANGUAGE: &str = "ENG";
pub const DEFAULT_OFX_VERSION: u16 = 102;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConverterConfig {
    pub broker_id: String,
    pub institution: Institution,
    pub currency: String,
    pub language: String,
    pub ofx_version: u16,
    pub error_policy: ErrorPolicy,
    /// Если не задан — берётся из имени входного файла.
    pub account_id: Option<String>,
    /// None — stdin.
    pub input: Option<PathBuf>,
    /// None — stdout.
    pub output: Option<PathBuf>,
    pub layout: InputLayout,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            broker_id: DEFAULT_BROKER_ID.into(),
            institution: Institution {
                org: DEFAULT_ORG.into(),
                fid: DEFAULT_FID.into(),
            },
            currency: DEFAULT_CURRENCY.into(),
            language: DEFAULT_LANGUAGE.into(),
            ofx_version: DEFAULT_OFX_VERSION,
            error_policy: ErrorPolicy::default(),
            account_id: None,
            input: None,
            output: None,
            layout: InputLayout::default(),
        }
    }
}

impl ConverterConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| OfxGenError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
            .map_err(|e| OfxGenError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| OfxGenError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = ConverterConfig::from_toml_str("").expect("parse");
        assert_eq!(cfg, ConverterConfig::default());
        assert_eq!(cfg.broker_id, "fidelity.com");
        assert_eq!(cfg.institution.fid, "07776");
        assert_eq!(cfg.ofx_version, 102);
        assert_eq!(cfg.error_policy, ErrorPolicy::Abort);
        assert_eq!(cfg.layout.header_row, 5);
    }

    #[test]
    fn partial_override() {
        let cfg = ConverterConfig::from_toml_str(
            r#"
currency = "CAD"
error_policy = "skip"
account_id = "X123"

[layout]
header_row = 7
"#,
        )
        .expect("parse");
        assert_eq!(cfg.currency, "CAD");
        assert_eq!(cfg.error_policy, ErrorPolicy::Skip);
        assert_eq!(cfg.account_id.as_deref(), Some("X123"));
        assert_eq!(cfg.layout.header_row, 7);
        assert_eq!(cfg.layout.marker_row, 3);
        assert_eq!(cfg.broker_id, DEFAULT_BROKER_ID);
    }

    #[test]
    fn bad_toml_is_config_error() {
        let err = ConverterConfig::from_toml_str("ofx_version = \"abc\"").unwrap_err();
        assert!(matches!(err, OfxGenError::Config(_)));
    }
}
