/// One niche+location query executed as a unit of pagination and
/// extraction work. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub niche: String,
    pub location: String,
}

impl Task {
    pub fn new(niche: &str, location: &str) -> Self {
        Task {
            niche: niche.trim().to_string(),
            location: location.trim().to_string(),
        }
    }

    pub fn query(&self) -> String {
        format!("{} in {}", self.niche, self.location)
    }

    /// One task per neighborhood, scoped to the city; the bare city when no
    /// neighborhoods were given.
    pub fn expand(niche: &str, city: &str, neighborhoods: &[String]) -> Vec<Task> {
        if neighborhoods.is_empty() {
            return vec![Task::new(niche, city)];
        }
        neighborhoods
            .iter()
            .map(|n| Task::new(niche, &format!("{}, {}", n.trim(), city.trim())))
            .collect()
    }
}
