//! Roster (students collection) types

use serde::{Deserialize, Serialize};

/// A registered student
///
/// Wire field names follow the store's `students` collection layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    /// Roll number as entered on the keypad
    #[serde(rename = "roll_number")]
    pub roll: String,
    /// Display name
    pub name: String,
    /// Whether face samples were captured for this student
    ///
    /// False when registration fell back to a roster-only write during a
    /// verification-service outage.
    #[serde(rename = "face_registered", default = "default_true")]
    pub face_enrolled: bool,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let student = Student {
            roll: "101".to_string(),
            name: "Asha Rahman".to_string(),
            face_enrolled: false,
        };

        let json = serde_json::to_value(&student).unwrap();
        assert_eq!(json["roll_number"], "101");
        assert_eq!(json["face_registered"], false);
    }

    #[test]
    fn test_face_enrollment_defaults_true() {
        let json = r#"{"roll_number": "042", "name": "Borhan Uddin"}"#;
        let student: Student = serde_json::from_str(json).unwrap();
        assert!(student.face_enrolled);
    }
}
