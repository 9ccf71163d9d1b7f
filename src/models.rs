use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Branch {
    #[serde(rename = "Computer Science")]
    Cse,
    #[serde(rename = "Electronics")]
    Ece,
    #[serde(rename = "Mechanical")]
    Mech,
    #[serde(rename = "Civil")]
    Civil,
    #[serde(rename = "Information Technology")]
    It,
    #[serde(rename = "Other")]
    Other,
}

impl Branch {
    pub const ALL: [Branch; 6] = [
        Branch::Cse,
        Branch::Ece,
        Branch::Mech,
        Branch::Civil,
        Branch::It,
        Branch::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Branch::Cse => "Computer Science",
            Branch::Ece => "Electronics",
            Branch::Mech => "Mechanical",
            Branch::Civil => "Civil",
            Branch::It => "Information Technology",
            Branch::Other => "Other",
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Branch::Cse => "cse",
            Branch::Ece => "ece",
            Branch::Mech => "mech",
            Branch::Civil => "civil",
            Branch::It => "it",
            Branch::Other => "other",
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Branch {
    type Err = String;

    /// Accepts either the display label ("Computer Science") or the short code ("CSE").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Branch::ALL
            .into_iter()
            .find(|b| b.code() == wanted || b.label().to_lowercase() == wanted)
            .ok_or_else(|| {
                format!(
                    "Unknown branch '{}'. Use one of: CSE, ECE, MECH, CIVIL, IT, OTHER",
                    s
                )
            })
    }
}

/// Academic term, serialized as "Semester N".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Semester {
    #[serde(rename = "Semester 1")]
    Sem1,
    #[serde(rename = "Semester 2")]
    Sem2,
    #[serde(rename = "Semester 3")]
    Sem3,
    #[serde(rename = "Semester 4")]
    Sem4,
    #[serde(rename = "Semester 5")]
    Sem5,
    #[serde(rename = "Semester 6")]
    Sem6,
    #[serde(rename = "Semester 7")]
    Sem7,
    #[serde(rename = "Semester 8")]
    Sem8,
}

impl Semester {
    pub const ALL: [Semester; 8] = [
        Semester::Sem1,
        Semester::Sem2,
        Semester::Sem3,
        Semester::Sem4,
        Semester::Sem5,
        Semester::Sem6,
        Semester::Sem7,
        Semester::Sem8,
    ];

    pub fn from_number(n: u8) -> Option<Self> {
        Semester::ALL.get(usize::from(n).checked_sub(1)?).copied()
    }

    pub fn number(&self) -> u8 {
        *self as u8 + 1
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Semester {}", self.number())
    }
}

impl FromStr for Semester {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("Semester")
            .or_else(|| trimmed.strip_prefix("semester"))
            .unwrap_or(trimmed)
            .trim();

        digits
            .parse::<u8>()
            .ok()
            .and_then(Semester::from_number)
            .ok_or_else(|| format!("Unknown semester '{}'. Use a number from 1 to 8", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub branch: Branch,
    pub year: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, password: Option<String>, branch: Branch, year: u8) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            password,
            branch,
            year,
            avatar: None,
            created_at: Utc::now(),
        }
    }

    /// The form of this user that is allowed into the session slot.
    pub fn without_password(&self) -> User {
        User {
            password: None,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub subject: String,
    pub description: String,
    pub branch: Branch,
    pub semester: Semester,
    pub uploader_id: String,
    pub uploader_name: String,
    pub file_name: String,
    pub file_size: u64,
    pub file_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<String>,
    pub download_count: u64,
    pub created_at: DateTime<Utc>,
}

/// A broadcast asking peers to share notes on a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRequest {
    pub subject: String,
    pub timestamp: DateTime<Utc>,
}

impl NoteRequest {
    pub fn new(subject: String) -> Self {
        Self {
            subject,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn branch_serializes_as_label() {
        let json = serde_json::to_string(&Branch::It).unwrap();
        assert_eq!(json, "\"Information Technology\"");
        let back: Branch = serde_json::from_str("\"Electronics\"").unwrap();
        assert_eq!(back, Branch::Ece);
    }

    #[test]
    fn branch_parses_codes_and_labels() {
        assert_eq!("cse".parse::<Branch>().unwrap(), Branch::Cse);
        assert_eq!("Mechanical".parse::<Branch>().unwrap(), Branch::Mech);
        assert!("Biology".parse::<Branch>().is_err());
    }

    #[test]
    fn semester_numbers() {
        assert_eq!(Semester::from_number(1), Some(Semester::Sem1));
        assert_eq!(Semester::from_number(8), Some(Semester::Sem8));
        assert_eq!(Semester::from_number(0), None);
        assert_eq!(Semester::from_number(9), None);
        assert_eq!("Semester 5".parse::<Semester>().unwrap(), Semester::Sem5);
        assert_eq!("3".parse::<Semester>().unwrap().to_string(), "Semester 3");
    }

    #[test]
    fn user_uses_camel_case_and_strips_password() {
        let user = User::new(
            "Ada".into(),
            "ada@uni.edu".into(),
            Some("secret".into()),
            Branch::Cse,
            2,
        );
        let value = serde_json::to_value(user.without_password()).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("password").is_none());
        assert_eq!(value["branch"], "Computer Science");
    }

    const STORED_NOTE: &str = r#"{
        "id": "n1",
        "title": "Data Structures Unit 1",
        "subject": "Data Structures",
        "description": "Arrays, linked lists and stacks",
        "branch": "Computer Science",
        "semester": "Semester 3",
        "uploaderId": "u1",
        "uploaderName": "Rahul",
        "fileName": "ds_unit1.pdf",
        "fileSize": 2048000,
        "fileType": "application/pdf",
        "downloadCount": 45,
        "createdAt": "2025-01-31T12:00:00.123Z"
    }"#;

    const STORED_USER: &str = r#"{
        "id": "lx3k9a",
        "name": "Ada",
        "email": "ada@uni.edu",
        "password": "secret",
        "branch": "Information Technology",
        "year": 2,
        "createdAt": "2025-01-31T12:00:00.123Z"
    }"#;

    fn keys(value: &serde_json::Value) -> Vec<String> {
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    #[test]
    fn reads_and_rewrites_stored_note_shape() {
        let note: Note = serde_json::from_str(STORED_NOTE).unwrap();
        assert_eq!(note.branch, Branch::Cse);
        assert_eq!(note.semester, Semester::Sem3);
        assert_eq!(note.uploader_id, "u1");
        assert_eq!(note.file_size, 2_048_000);
        assert_eq!(note.download_count, 45);
        assert_eq!(note.file_data, None);

        let original: serde_json::Value = serde_json::from_str(STORED_NOTE).unwrap();
        let written = serde_json::to_value(&note).unwrap();
        assert_eq!(keys(&written), keys(&original));
        assert!(written.get("fileData").is_none());
        assert_eq!(written["createdAt"], "2025-01-31T12:00:00.123Z");
        assert_eq!(serde_json::from_value::<Note>(written).unwrap(), note);
    }

    #[test]
    fn reads_and_rewrites_stored_user_shape() {
        let user: User = serde_json::from_str(STORED_USER).unwrap();
        assert_eq!(user.id, "lx3k9a");
        assert_eq!(user.password.as_deref(), Some("secret"));
        assert_eq!(user.branch, Branch::It);
        assert_eq!(user.avatar, None);

        let original: serde_json::Value = serde_json::from_str(STORED_USER).unwrap();
        let written = serde_json::to_value(&user).unwrap();
        assert_eq!(keys(&written), keys(&original));
        assert_eq!(written["createdAt"], "2025-01-31T12:00:00.123Z");
        assert_eq!(serde_json::from_value::<User>(written).unwrap(), user);
    }
}
