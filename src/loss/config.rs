use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::loss::class_nll::ClassNllCriterion;

fn default_classprob_axis() -> usize {
    1
}

/// Serializable construction parameters for [`ClassNllCriterion`].
///
/// Both fields are optional in JSON: `clip` defaults to no clipping and
/// `classprob_axis` to 1. Validation happens in [`ClassNllConfig::build`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassNllConfig {
    #[serde(default)]
    pub clip: Option<f64>,
    #[serde(default = "default_classprob_axis")]
    pub classprob_axis: usize,
}

impl Default for ClassNllConfig {
    fn default() -> Self {
        ClassNllConfig { clip: None, classprob_axis: default_classprob_axis() }
    }
}

impl From<ClassNllCriterion> for ClassNllConfig {
    fn from(criterion: ClassNllCriterion) -> Self {
        ClassNllConfig { clip: criterion.clip(), classprob_axis: criterion.classprob_axis() }
    }
}

impl ClassNllConfig {
    pub fn build(&self) -> Result<ClassNllCriterion> {
        ClassNllCriterion::new(self.clip, self.classprob_axis)
    }

    /// Serializes the config to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    /// Deserializes a config from a JSON file previously written by `save_json`.
    pub fn load_json(path: &str) -> std::io::Result<ClassNllConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }
}
