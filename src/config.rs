use anyhow::Context;
use catalog_types::price_list::DEFAULT_PRICE_LIST;
use catalog_types::product::StoreContext;
use catalog_types::DEFAULT_CURRENCY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "import.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub database: PathBuf,
    pub price_list: String,
    pub currency: String,
    pub batch_size: usize,
    pub delimiter: char,
    pub store_id: String,
    pub product_type: String,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("storage/catalog.db"),
            price_list: DEFAULT_PRICE_LIST.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            batch_size: 50,
            delimiter: ',',
            store_id: "1".to_string(),
            product_type: "default".to_string(),
        }
    }
}

impl ImportConfig {
    /// Reads `path`, or `import.yaml` when present, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, anyhow::Error> {
        let config = match path {
            Some(path) => Self::read(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::read(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        config.with_env().validate()
    }

    fn read(path: &Path) -> Result<Self, anyhow::Error> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read config {}", path.display()))?;
        Self::from_yaml(&raw).with_context(|| format!("Unable to parse config {}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> Result<Self, anyhow::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn with_env(mut self) -> Self {
        if let Ok(v) = envmnt::get_parse("CATALOG_DB") {
            self.database = v;
        }
        if let Ok(v) = envmnt::get_parse("PRICE_LIST_NAME") {
            self.price_list = v;
        }
        if let Ok(v) = envmnt::get_parse("CATALOG_CURRENCY") {
            self.currency = v;
        }
        match envmnt::get_parse("IMPORT_BATCH_SIZE") {
            Ok(v) => self.batch_size = v,
            Err(envmnt::errors::EnvmntError::Missing(_)) => (),
            Err(err) => log::warn!("Ignoring IMPORT_BATCH_SIZE: {err}"),
        }
        if let Ok(v) = envmnt::get_parse("CSV_DELIMITER") {
            self.delimiter = v;
        }
        if let Ok(v) = envmnt::get_parse("DEFAULT_STORE_ID") {
            self.store_id = v;
        }
        if let Ok(v) = envmnt::get_parse("PRODUCT_TYPE") {
            self.product_type = v;
        }
        self
    }

    pub fn validate(self) -> Result<Self, anyhow::Error> {
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be positive");
        }
        if !self.delimiter.is_ascii() {
            anyhow::bail!("delimiter {:?} is not a single-byte character", self.delimiter);
        }
        if self.price_list.trim().is_empty() {
            anyhow::bail!("price_list must not be empty");
        }
        Ok(self)
    }

    pub fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.delimiter).unwrap_or(b',')
    }

    pub fn store_context(&self) -> StoreContext {
        StoreContext {
            store_id: self.store_id.clone(),
            product_type: self.product_type.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_catalog_conventions() {
        let config = ImportConfig::default();
        assert_eq!(config.price_list, "Price table");
        assert_eq!(config.currency, "EUR");
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.delimiter_byte(), b',');
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = ImportConfig::from_yaml("batch_size: 10\ndelimiter: ';'\n").unwrap();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.delimiter_byte(), b';');
        assert_eq!(config.currency, "EUR");
        assert_eq!(ImportConfig::from_yaml("").unwrap(), ImportConfig::default());
    }

    #[test]
    fn validate_rejects_unusable_values() {
        let config = ImportConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = ImportConfig {
            delimiter: '§',
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(ImportConfig::default().validate().is_ok());
    }

    #[test]
    fn load_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("import.yaml");
        std::fs::write(&path, "price_list: Wholesale\nstore_id: '7'\n").unwrap();
        let config = ImportConfig::load(Some(&path)).unwrap();
        assert_eq!(config.price_list, "Wholesale");
        assert_eq!(config.store_context().store_id, "7");
        assert!(ImportConfig::load(Some(&dir.path().join("missing.yaml"))).is_err());
    }

    #[test]
    fn environment_overrides_file_values() {
        envmnt::set("CATALOG_DB", "/tmp/override/catalog.db");
        envmnt::set("CATALOG_CURRENCY", "CHF");
        envmnt::set("IMPORT_BATCH_SIZE", "25");
        envmnt::set("CSV_DELIMITER", ";");
        let config = ImportConfig::default().with_env();
        assert_eq!(config.database, PathBuf::from("/tmp/override/catalog.db"));
        assert_eq!(config.currency, "CHF");
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.delimiter_byte(), b';');

        envmnt::set("IMPORT_BATCH_SIZE", "lots");
        assert_eq!(ImportConfig::default().with_env().batch_size, 50);
        for key in ["CATALOG_DB", "CATALOG_CURRENCY", "IMPORT_BATCH_SIZE", "CSV_DELIMITER"] {
            envmnt::remove(key);
        }
    }
}
