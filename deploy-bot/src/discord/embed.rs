use deploy_bot_core::error::SyncError;
use deploy_bot_core::synchronise::SyncReport;
use serde::Serialize;

pub const SUCCESS_COLOR: u32 = 0x00ff00;
pub const FAILURE_COLOR: u32 = 0xff0000;

/// Discord rejects embeds whose description exceeds this many characters.
pub const DESCRIPTION_LIMIT: usize = 4096;
const FIELD_VALUE_LIMIT: usize = 1024;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Embed {
    pub title: String,
    pub description: String,
    pub color: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl EmbedField {
    fn new(name: &str, value: String) -> Self {
        Self {
            name: name.to_string(),
            value: truncate(value, FIELD_VALUE_LIMIT),
            inline: false,
        }
    }
}

pub fn success_embed(report: &SyncReport) -> Embed {
    let steps = report
        .steps
        .iter()
        .map(|step| format!("• {}", step.completed_label()))
        .collect::<Vec<_>>()
        .join("\n");

    let mut fields = vec![
        EmbedField::new("Steps Completed", steps),
        EmbedField::new(
            "Data Files",
            format!("{} file(s) from `{}`", report.files_extracted.len(), report.branch),
        ),
    ];
    if let Some(place) = &report.place {
        fields.push(EmbedField::new(
            "Place",
            format!("{} (universe {})", place.name, place.id),
        ));
    }

    Embed {
        title: "✅ Sync Completed Successfully!".to_string(),
        description: truncate(
            format!(
                "**Commit:** `{}`\n**Message:** {}",
                report.commit.short_sha(),
                report.commit.message
            ),
            DESCRIPTION_LIMIT,
        ),
        color: SUCCESS_COLOR,
        fields,
    }
}

pub fn failure_embed(error: &SyncError) -> Embed {
    Embed {
        title: "❌ Sync Failed".to_string(),
        description: truncate(
            format!("An error occurred during sync: {error}"),
            DESCRIPTION_LIMIT,
        ),
        color: FAILURE_COLOR,
        fields: Vec::new(),
    }
}

/// Cuts `text` to at most `limit` characters, marking the cut with an ellipsis.
fn truncate(text: String, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text;
    }
    let mut cut: String = text.chars().take(limit - 1).collect();
    cut.push('…');
    cut
}
