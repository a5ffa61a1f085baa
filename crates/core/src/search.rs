/// An object the user asked to find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTarget {
    pub query: String,
    pub active: bool,
}

/// Tracks the optional search target layered on top of hazard monitoring.
/// While a target is active, hazard cycles ask the analyzer for guidance
/// toward it instead of generic obstacle warnings.
#[derive(Debug, Default)]
pub struct SearchTargetTracker {
    target: Option<SearchTarget>,
}

impl SearchTargetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activates `query`, replacing any previous target. Blank queries are ignored.
    pub fn set(&mut self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return false;
        }
        tracing::info!("Search target set: {}", query);
        self.target = Some(SearchTarget {
            query: query.to_string(),
            active: true,
        });
        true
    }

    /// Clears the target and returns what was being searched for.
    pub fn clear(&mut self) -> Option<String> {
        self.target
            .take()
            .filter(|target| target.active)
            .map(|target| target.query)
    }

    pub fn active_query(&self) -> Option<&str> {
        self.target
            .as_ref()
            .filter(|target| target.active)
            .map(|target| target.query.as_str())
    }

    pub fn is_active(&self) -> bool {
        self.active_query().is_some()
    }
}
