use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

/// A camper as supplied by the roster provider. Enrollment owns campers;
/// attendance only attaches records to them.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RosterEntry {
    #[schema(example = "12345")]
    pub person_id: String,
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    /// Enrolled in Kid Connection (before/after care) this week.
    #[serde(default)]
    pub has_kc: bool,
}

impl RosterEntry {
    /// Sort key: last name, matching the paper sign-in sheets.
    pub fn last_name(&self) -> &str {
        self.name.rsplit(' ').next().unwrap_or(&self.name)
    }
}

/// On-disk roster file: program -> week -> campers.
#[derive(Debug, Deserialize)]
pub struct RosterFile {
    pub programs: HashMap<String, HashMap<String, Vec<RosterEntry>>>,
}
