use std::io::{self, Write};

use crate::domain::Task;

/// One run's worth of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub niche: String,
    pub city: String,
    pub neighborhoods: Vec<String>,
}

impl RunRequest {
    pub fn tasks(&self) -> Vec<Task> {
        Task::expand(&self.niche, &self.city, &self.neighborhoods)
    }
}

/// Interactive prompts for niche, city and neighborhoods. Returns None
/// when a required answer is empty.
pub fn read_run_request() -> io::Result<Option<RunRequest>> {
    let niche = prompt("Enter niche (e.g. 'Dentists', 'Restaurants'): ")?;
    let city = prompt("Enter city (e.g. 'Asuncion'): ")?;
    let raw = prompt("Enter neighborhoods (comma separated, empty to search the whole city): ")?;

    if niche.is_empty() || city.is_empty() {
        return Ok(None);
    }

    Ok(Some(RunRequest {
        niche,
        city,
        neighborhoods: parse_neighborhoods(&raw),
    }))
}

fn prompt(label: &str) -> io::Result<String> {
    print!("{label}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

pub fn parse_neighborhoods(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
