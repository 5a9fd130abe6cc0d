use serde::{Serialize, Deserialize};

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum TemplateCategory {
    Classic,
    Modern,
    Business,
}

impl TemplateCategory {
    pub const ALL: [TemplateCategory; 3] = [
        TemplateCategory::Classic, TemplateCategory::Modern, TemplateCategory::Business,
    ];

    /// `"all"` and blank input mean no category filter.
    pub fn parse_filter(s: &str) -> Result<Option<TemplateCategory>, String> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(None),
            "classic" => Ok(Some(TemplateCategory::Classic)),
            "modern" => Ok(Some(TemplateCategory::Modern)),
            "business" => Ok(Some(TemplateCategory::Business)),
            other => Err(format!("unknown template category: {}", other)),
        }
    }
}

/// A ready-made background. The host fetches `image_url` and feeds the bytes to a background load.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MemeTemplate {
    pub id: String,
    pub name: String,
    pub image_url: String,
    pub thumbnail: String,
    pub category: TemplateCategory,
    pub keywords: Vec<String>,
}

impl MemeTemplate {
    /// Case-insensitive substring match on the name or any keyword.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&query)
            || self.keywords.iter().any(|k| k.to_lowercase().contains(&query))
    }
}

use TemplateCategory::{Business, Classic, Modern};

const BUILTIN: &[(&str, &str, &str, TemplateCategory, &[&str])] = &[
    ("drake", "Drake Hotline Bling", "30b1gx", Classic, &["drake", "choice", "preference", "yes no", "entscheidung", "auswahl"]),
    ("distracted-boyfriend", "Distracted Boyfriend", "1ur9b0", Classic, &["boyfriend", "girlfriend", "distraction", "cheating", "ablenkung", "freund"]),
    ("two-buttons", "Two Buttons", "1g8my4", Classic, &["choice", "decision", "buttons", "difficult", "entscheidung", "schwierig"]),
    ("change-my-mind", "Change My Mind", "24y43o", Modern, &["opinion", "debate", "crowder", "convince", "meinung", "diskussion"]),
    ("expanding-brain", "Expanding Brain", "1jwhww", Classic, &["intelligence", "smart", "levels", "evolution", "intelligent", "schlau"]),
    ("success-kid", "Success Kid", "1bhk", Classic, &["success", "victory", "win", "kid", "erfolg", "sieg"]),
    ("is-this", "Is This A Pigeon", "1o00in", Modern, &["confused", "misunderstanding", "butterfly", "anime", "verwirrt"]),
    ("exit-12", "Left Exit 12 Off Ramp", "22bdq6", Modern, &["choice", "highway", "decision", "direction", "richtung", "entscheidung"]),
    ("mocking-spongebob", "Mocking SpongeBob", "1otk96", Classic, &["spongebob", "mocking", "sarcasm", "irony", "spott", "sarkasmus"]),
    ("uno-reverse", "UNO Reverse Card", "26u2vx", Modern, &["uno", "reverse", "comeback", "counter", "zurück", "konter"]),
    ("woman-yelling-cat", "Woman Yelling at Cat", "345v97", Modern, &["cat", "yelling", "argument", "confused", "katze", "streit"]),
    ("always-has-been", "Always Has Been", "3gvdkx", Modern, &["astronaut", "space", "revelation", "truth", "wahrheit", "offenbarung"]),
    ("disaster-girl", "Disaster Girl", "23ls", Classic, &["fire", "evil", "chaos", "disaster", "feuer", "böse"]),
    ("hide-the-pain-harold", "Hide the Pain Harold", "gk5el", Classic, &["harold", "pain", "fake smile", "uncomfortable", "schmerz", "lächeln"]),
    ("this-is-fine", "This Is Fine", "wxica", Modern, &["dog", "fire", "crisis", "everything is fine", "krise", "hund"]),
    ("surprised-pikachu", "Surprised Pikachu", "1pjh6v", Modern, &["pikachu", "surprise", "shock", "unexpected", "überrascht", "schock"]),
    ("roll-safe", "Roll Safe Think About It", "1h7in3", Modern, &["smart", "thinking", "clever", "logic", "denken"]),
    ("bernie-sanders", "Bernie Sanders Mittens", "4guvj4", Modern, &["bernie", "mittens", "cold", "sitting", "politics", "politik"]),
    ("they-the-same-picture", "Corporate Needs You", "1c1uej", Business, &["same", "difference", "corporate", "office", "gleich", "büro"]),
    ("meeting-suggestion", "Boardroom Meeting Suggestion", "m78d", Business, &["meeting", "idea", "suggestion", "boardroom", "präsentation", "idee"]),
];

pub fn catalog() -> Vec<MemeTemplate> {
    BUILTIN.iter().map(|&(id, name, image, category, keywords)| {
        let url = format!("https://i.imgflip.com/{}.jpg", image);
        MemeTemplate {
            id: id.to_string(),
            name: name.to_string(),
            image_url: url.clone(),
            thumbnail: url,
            category,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }).collect()
}

pub fn find(id: &str) -> Option<MemeTemplate> {
    catalog().into_iter().find(|t| t.id == id)
}

/// Category filter first, then the search query. Catalog order is kept.
pub fn filter_templates(templates: &[MemeTemplate], category: Option<TemplateCategory>, query: &str) -> Vec<MemeTemplate> {
    templates.iter()
        .filter(|t| category.map_or(true, |c| t.category == c))
        .filter(|t| t.matches_query(query))
        .cloned()
        .collect()
}
