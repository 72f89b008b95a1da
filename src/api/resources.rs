use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Buildpack,
    App,
}

impl ResourceKind {
    pub fn collection(self) -> &'static str {
        match self {
            Self::Buildpack => "buildpacks",
            Self::App => "apps",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Buildpack => "buildpack",
            Self::App => "app",
        }
    }

    pub fn query_path(self, name: &str) -> String {
        let filter: String =
            url::form_urlencoded::byte_serialize(format!("name:{name}").as_bytes()).collect();
        format!("/v2/{}?q={filter}", self.collection())
    }

    pub fn item_path(self, guid: &str) -> String {
        format!("/v2/{}/{guid}", self.collection())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryResponse<E> {
    #[serde(default)]
    pub total_results: Option<u64>,
    pub resources: Vec<Resource<E>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Resource<E> {
    pub metadata: Metadata,
    pub entity: E,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Metadata {
    pub guid: String,
    #[serde(default)]
    pub url: Option<String>,
}

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuildpackEntity {
    pub name: String,
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppEntity {
    pub name: String,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub detected_start_command: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub memory: Option<u64>,
    #[serde(default)]
    pub buildpack: Option<String>,
    #[serde(default)]
    pub detected_buildpack: Option<String>,
    #[serde(default)]
    pub diego: Option<bool>,
}
