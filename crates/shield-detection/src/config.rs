use serde::{Deserialize, Serialize};

/// Well-known npm packages that typosquats imitate.
pub const DEFAULT_REFERENCE_PACKAGES: &[&str] = &[
    "lodash",
    "express",
    "react",
    "axios",
    "moment",
    "underscore",
    "jquery",
    "async",
    "request",
    "chalk",
    "commander",
    "debug",
    "uuid",
    "dotenv",
    "webpack",
    "babel",
    "typescript",
    "eslint",
    "prettier",
    "jest",
    "mocha",
    "chai",
    "sinon",
    "nodemon",
    "mongoose",
    "sequelize",
    "passport",
    "socket.io",
    "redis",
    "pg",
];

/// Configuration for the detection engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Name similarity at or above which a typosquat is flagged
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Confidence assigned to a decorated-name pattern match
    #[serde(default = "default_pattern_confidence")]
    pub pattern_confidence: f64,

    /// Names compared against every release
    #[serde(default = "default_reference_packages")]
    pub reference_packages: Vec<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            pattern_confidence: default_pattern_confidence(),
            reference_packages: default_reference_packages(),
        }
    }
}

fn default_similarity_threshold() -> f64 {
    0.85
}

fn default_pattern_confidence() -> f64 {
    0.9
}

fn default_reference_packages() -> Vec<String> {
    DEFAULT_REFERENCE_PACKAGES
        .iter()
        .map(|name| name.to_string())
        .collect()
}
