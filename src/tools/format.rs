//! Rendering helpers for entity tool results.

use crate::entity::UserEntity;

/// Render a single entity lookup result: the serialized entity, or a
/// fixed marker when nothing matched.
pub fn format_user_entity(entity: Option<&UserEntity>) -> String {
    match entity {
        None => "No entity found".to_string(),
        Some(entity) => serde_json::to_string(entity)
            .unwrap_or_else(|e| format!("failed to serialize entity: {e}")),
    }
}

/// Render a list of entities as a GitHub-style markdown table.
pub fn format_user_entities(entities: &[UserEntity]) -> String {
    if entities.is_empty() {
        return String::new();
    }

    const HEADERS: [&str; 9] = [
        "id",
        "user_id",
        "slug",
        "collection",
        "type",
        "data",
        "created_at",
        "updated_at",
        "archived_at",
    ];

    let rows: Vec<[String; 9]> = entities
        .iter()
        .map(|e| {
            [
                e.id.clone(),
                e.user_id.clone(),
                e.slug.clone(),
                e.collection.to_string(),
                e.entity_type.clone(),
                serde_json::to_string(&e.data).unwrap_or_default(),
                e.created_at.clone(),
                e.updated_at.clone(),
                e.archived_at.clone().unwrap_or_default(),
            ]
        })
        .collect();

    // Column widths sized to the longest cell, markdown pipe-escaped
    let mut widths: Vec<usize> = HEADERS.iter().map(|h| h.len()).collect();
    let escaped: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|cell| cell.replace('|', "\\|")).collect())
        .collect();
    for row in &escaped {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let mut lines = Vec::with_capacity(escaped.len() + 2);
    lines.push(format_row(
        &HEADERS.iter().map(|h| h.to_string()).collect::<Vec<_>>(),
        &widths,
    ));
    lines.push(format!(
        "|{}|",
        widths
            .iter()
            .map(|w| format!("-{}-", "-".repeat(*w)))
            .collect::<Vec<_>>()
            .join("|")
    ));
    for row in &escaped {
        lines.push(format_row(row, &widths));
    }

    lines.join("\n")
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!(" {cell:<width$} "))
        .collect();
    format!("|{}|", padded.join("|"))
}
