use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use moka::future::Cache;
use once_cell::sync::Lazy;

use crate::model::camper::{RosterEntry, RosterFile};

/// Read-through cache of the enrollment roster, keyed by file path. The
/// roster is exported from the camp-management system; attendance always
/// needs it, so it is loaded wholesale and refreshed on TTL expiry, never
/// merged incrementally.
static ROSTER_CACHE: Lazy<Cache<String, Arc<RosterFile>>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(8)
        .time_to_live(Duration::from_secs(600)) // 10 min TTL
        .build()
});

fn load_file(path: &str) -> Result<Arc<RosterFile>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read roster file {}", path))?;
    let file: RosterFile =
        serde_json::from_str(&raw).with_context(|| format!("Malformed roster file {}", path))?;
    Ok(Arc::new(file))
}

async fn roster_file(path: &str) -> Result<Arc<RosterFile>> {
    if let Some(file) = ROSTER_CACHE.get(path).await {
        return Ok(file);
    }
    let file = load_file(path)?;
    ROSTER_CACHE.insert(path.to_string(), file.clone()).await;
    Ok(file)
}

/// Campers enrolled in a program for a camp week, sorted by last name.
pub async fn roster_for(path: &str, program: &str, week: u32) -> Result<Vec<RosterEntry>> {
    let file = roster_file(path).await?;
    let mut campers = file
        .programs
        .get(program)
        .and_then(|weeks| weeks.get(&week.to_string()))
        .cloned()
        .unwrap_or_default();
    campers.sort_by(|a, b| a.last_name().cmp(b.last_name()));
    Ok(campers)
}

/// Programs running in a week with their enrollment counts, for the admin
/// summary view.
pub async fn programs_for_week(path: &str, week: u32) -> Result<Vec<(String, usize)>> {
    let file = roster_file(path).await?;
    let week_key = week.to_string();
    let mut programs: Vec<(String, usize)> = file
        .programs
        .iter()
        .filter_map(|(name, weeks)| {
            weeks
                .get(&week_key)
                .filter(|campers| !campers.is_empty())
                .map(|campers| (name.clone(), campers.len()))
        })
        .collect();
    programs.sort();
    Ok(programs)
}

/// Force-load the roster at startup so the first attendance page render does
/// not pay the file parse.
pub async fn warmup_roster_cache(path: &str) -> Result<usize> {
    let file = load_file(path)?;
    let total: usize = file
        .programs
        .values()
        .flat_map(|weeks| weeks.values())
        .map(|campers| campers.len())
        .sum();
    ROSTER_CACHE.insert(path.to_string(), file).await;

    log::info!("Roster cache warmup complete: {} enrollments loaded", total);
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn roster_json() -> &'static str {
        r#"{
            "programs": {
                "Trailblazers": {
                    "2": [
                        {"person_id": "p1", "name": "Ada Lovelace", "has_kc": true},
                        {"person_id": "p2", "name": "Grace Hopper", "has_kc": false},
                        {"person_id": "p3", "name": "Alan Kay"}
                    ]
                },
                "Pathfinders": {
                    "2": [
                        {"person_id": "p9", "name": "Barbara Liskov", "has_kc": false}
                    ],
                    "3": []
                }
            }
        }"#
    }

    #[actix_web::test]
    async fn loads_and_sorts_by_last_name() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(roster_json().as_bytes()).unwrap();
        let path = file.path().to_str().unwrap();

        let campers = roster_for(path, "Trailblazers", 2).await.unwrap();
        let names: Vec<&str> = campers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Grace Hopper", "Alan Kay", "Ada Lovelace"]);
        assert!(campers.iter().find(|c| c.person_id == "p3").is_some());
        assert!(!campers[1].has_kc); // has_kc defaults to false when omitted

        // Unknown program/week is an empty roster, not an error
        assert!(roster_for(path, "Voyagers", 2).await.unwrap().is_empty());
        assert!(roster_for(path, "Trailblazers", 5).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn week_programs_skip_empty_enrollments() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(roster_json().as_bytes()).unwrap();
        let path = file.path().to_str().unwrap();

        let programs = programs_for_week(path, 2).await.unwrap();
        assert_eq!(
            programs,
            vec![("Pathfinders".to_string(), 1), ("Trailblazers".to_string(), 3)]
        );
        assert!(programs_for_week(path, 3).await.unwrap().is_empty());
    }
}
