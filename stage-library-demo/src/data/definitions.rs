use serde::{de::IgnoredAny, Deserialize};

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StageDefinition {
    pub library: String,
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

/// The part of `rest/v1/definitions` the chain relies on.
#[derive(Deserialize, Debug)]
pub struct Definitions {
    pub pipeline: Vec<IgnoredAny>,
    pub stages: Vec<StageDefinition>,
}
