use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub const HAZARDS: &str = "hazards";
pub const HAZARDS_SEARCH: &str = "hazards_search";
pub const SCENE: &str = "scene";
pub const FIND_OBJECT: &str = "find_object";

const REQUIRED: [&str; 4] = [HAZARDS, HAZARDS_SEARCH, SCENE, FIND_OBJECT];
const SEARCH_QUERY_PLACEHOLDER: &str = "{search_query}";

/// Reads every `*.md` file in `dir_path`, keyed by file stem.
pub fn load_prompts(dir_path: &Path) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();

    for entry in fs::read_dir(dir_path)
        .with_context(|| format!("Failed to read prompts directory: {}", dir_path.display()))?
    {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("md") {
            continue;
        }
        let key = path
            .file_stem()
            .and_then(|s| s.to_str())
            .context("Could not get file stem for prompt file")?
            .to_string();
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;
        prompts.insert(key, content.trim().to_string());
    }

    Ok(prompts)
}

/// The vision prompts, checked for completeness at startup.
#[derive(Debug, Clone)]
pub struct Prompts {
    templates: HashMap<String, String>,
}

impl Prompts {
    pub fn load(dir_path: &Path) -> Result<Self> {
        Self::from_map(load_prompts(dir_path)?)
    }

    pub fn from_map(templates: HashMap<String, String>) -> Result<Self> {
        let missing: Vec<&str> = REQUIRED
            .into_iter()
            .filter(|key| !templates.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            bail!("Missing required prompts: {}", missing.join(", "));
        }
        Ok(Self { templates })
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn hazards(&self, search_query: Option<&str>) -> String {
        match search_query {
            Some(query) => self.render(HAZARDS_SEARCH, query),
            None => self.render(HAZARDS, ""),
        }
    }

    pub fn scene(&self) -> String {
        self.render(SCENE, "")
    }

    pub fn find_object(&self, search_query: &str) -> String {
        self.render(FIND_OBJECT, search_query)
    }

    fn render(&self, key: &str, search_query: &str) -> String {
        self.templates
            .get(key)
            .map(|template| template.replace(SEARCH_QUERY_PLACEHOLDER, search_query))
            .unwrap_or_default()
    }
}
