//! Named entities offered to the model for reuse.

use chrono::Utc;
use rusqlite::params;

use super::DocumentRepository;
use crate::models::{EntityKind, KnownEntities};
use crate::repository::Result;

impl DocumentRepository {
    /// Register an entity name. Duplicates are ignored.
    pub fn add_entity(&self, kind: EntityKind, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(());
        }
        let conn = self.connect()?;
        conn.execute(
            "INSERT OR IGNORE INTO entities (kind, name, created_at) VALUES (?1, ?2, ?3)",
            params![kind.as_str(), name, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Names of one kind, alphabetically.
    pub fn entity_names(&self, kind: EntityKind) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT name FROM entities WHERE kind = ? ORDER BY name COLLATE NOCASE")?;
        let names = stmt
            .query_map(params![kind.as_str()], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Vendor, project, and appliance names.
    pub fn known_entity_names(&self) -> Result<KnownEntities> {
        Ok(KnownEntities {
            vendors: self.entity_names(EntityKind::Vendor)?,
            projects: self.entity_names(EntityKind::Project)?,
            appliances: self.entity_names(EntityKind::Appliance)?,
        })
    }
}
