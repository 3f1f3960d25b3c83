//! Result export.
//!
//! Process numbers go out as a JSON array of formatted numbers; party
//! details go out as CSV with one row per case.

use std::path::Path;

use tracing::info;

use crate::errors::AutomationError;
use crate::record::{PartyDetails, ProcessRecord};

/// Write collected process numbers as a pretty-printed JSON array of their
/// CNJ display forms.
pub fn save_json(records: &[ProcessRecord], path: &Path) -> Result<(), AutomationError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let formatted: Vec<String> = records.iter().map(ProcessRecord::formatted).collect();
    let json = serde_json::to_string_pretty(&formatted)
        .map_err(|e| AutomationError::InvalidArgument(e.to_string()))?;
    std::fs::write(path, json)?;
    info!(count = records.len(), path = %path.display(), "wrote JSON export");
    Ok(())
}

/// Write party details as CSV, header row first.
pub fn save_csv(details: &[PartyDetails], path: &Path) -> Result<(), AutomationError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = String::from("process,cpf,civil_name,birth_date,father,mother\n");
    for d in details {
        let fields = [
            d.process.formatted(),
            d.cpf.clone().unwrap_or_default(),
            d.civil_name.clone().unwrap_or_default(),
            d.birth_date.clone().unwrap_or_default(),
            d.father.clone().unwrap_or_default(),
            d.mother.clone().unwrap_or_default(),
        ];
        let row: Vec<String> = fields.iter().map(|f| csv_escape(f)).collect();
        out.push_str(&row.join(","));
        out.push('\n');
    }
    std::fs::write(path, out)?;
    info!(count = details.len(), path = %path.display(), "wrote CSV export");
    Ok(())
}

fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
