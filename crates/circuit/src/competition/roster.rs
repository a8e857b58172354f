use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::path::Path;

use super::domain::{Penya, PenyaId};

/// Team to be added to a season's roster.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewPenya {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_secret: bool,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl NewPenya {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            is_secret: false,
            image_url: None,
        }
    }

    pub(crate) fn into_penya(self) -> Penya {
        let name = self.name.trim().to_string();
        Penya {
            id: PenyaId(slugify(&name)),
            name,
            is_secret: self.is_secret,
            image_url: self.image_url,
            description: self.description,
        }
    }
}

/// Lowercase ASCII identifier derived from a display name.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for ch in name.trim().chars() {
        let folded = fold_accent(ch.to_lowercase().next().unwrap_or(ch));
        if folded.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(folded);
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Index-based id (`{prefix}-1`, `{prefix}-2`, ...) for names that leave
/// nothing after slugging.
pub(crate) fn fallback_id(prefix: &str, is_taken: impl Fn(&str) -> bool) -> String {
    (1u32..)
        .map(|index| format!("{prefix}-{index}"))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| prefix.to_string())
}

fn fold_accent(ch: char) -> char {
    match ch {
        'à' | 'á' | 'â' | 'ä' => 'a',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ò' | 'ó' | 'ô' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

#[derive(Debug)]
pub enum RosterImportError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for RosterImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterImportError::Io(err) => write!(f, "failed to read roster file: {err}"),
            RosterImportError::Csv(err) => write!(f, "invalid roster CSV data: {err}"),
        }
    }
}

impl std::error::Error for RosterImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RosterImportError::Io(err) => Some(err),
            RosterImportError::Csv(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for RosterImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RosterImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Reads a roster export with a `Name` column and optional `Description`
/// and `Secret` columns. Rows with a blank name are skipped.
pub fn parse_roster<R: Read>(reader: R) -> Result<Vec<NewPenya>, RosterImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut penyes = Vec::new();

    for record in csv_reader.deserialize::<RosterRow>() {
        let row = record?;
        if row.name.is_empty() {
            continue;
        }
        penyes.push(NewPenya {
            name: row.name,
            description: row.description,
            is_secret: row.secret.as_deref().map_or(false, is_truthy),
            image_url: None,
        });
    }

    Ok(penyes)
}

pub fn parse_roster_file<P: AsRef<Path>>(path: P) -> Result<Vec<NewPenya>, RosterImportError> {
    let file = std::fs::File::open(path)?;
    parse_roster(file)
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(
        rename = "Description",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    description: Option<String>,
    #[serde(rename = "Secret", default, deserialize_with = "empty_string_as_none")]
    secret: Option<String>,
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "x" | "si" | "sí"
    )
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
