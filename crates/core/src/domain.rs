//! Student snapshot as served by the backend.

use serde::{Deserialize, Serialize};

use crate::cache::fingerprint;

/// A student record fetched from the backend.
///
/// Every field is optional on the wire; absent values deserialize to empty
/// strings, zero or false.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub system_access: bool,
    pub phone: String,
    pub gender: String,
    pub dob: String,
    pub class: String,
    pub section: String,
    pub roll: i64,
    pub current_address: String,
    pub permanent_address: String,
    pub father_name: String,
    pub father_phone: String,
    pub mother_name: String,
    pub mother_phone: String,
    pub guardian_name: String,
    pub guardian_phone: String,
    pub relation_of_guardian: String,
    pub admission_date: String,
    pub reporter_name: String,
    pub last_updated: String,
}

impl Student {
    /// Fingerprint of the fields that decide whether a cached report is
    /// still current.
    ///
    /// Field order: name, class, section, last updated, admission date.
    pub fn fingerprint(&self) -> String {
        fingerprint([
            self.name.as_str(),
            self.class.as_str(),
            self.section.as_str(),
            self.last_updated.as_str(),
            self.admission_date.as_str(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FINGERPRINT_LEN;

    fn sample() -> Student {
        Student {
            id: 12345,
            name: "John Doe".into(),
            class: "10".into(),
            section: "A".into(),
            last_updated: "2024-01-01T10:00:00Z".into(),
            admission_date: "2015-06-01T00:00:00Z".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_fingerprint_consistent() {
        let student = sample();
        let fp = student.fingerprint();
        assert_eq!(fp.len(), FINGERPRINT_LEN);
        assert_eq!(fp, student.clone().fingerprint());
    }

    #[test]
    fn test_fingerprint_changes_with_relevant_fields() {
        let base = sample().fingerprint();
        let renamed = Student { name: "Jane Doe".into(), ..sample() };
        let updated = Student { last_updated: "2024-02-01T10:00:00Z".into(), ..sample() };
        assert_ne!(renamed.fingerprint(), base);
        assert_ne!(updated.fingerprint(), base);
    }

    #[test]
    fn test_fingerprint_ignores_other_fields() {
        let base = sample().fingerprint();
        let other = Student { email: "john@example.com".into(), phone: "123".into(), roll: 15, ..sample() };
        assert_eq!(other.fingerprint(), base);
    }

    #[test]
    fn test_fingerprint_empty_student() {
        let fp = Student::default().fingerprint();
        assert_eq!(fp.len(), FINGERPRINT_LEN);
    }

    #[test]
    fn test_deserialize_camel_case_with_missing_fields() {
        let json = r#"{"id": 7, "name": "Ada", "relationOfGuardian": "Aunt", "systemAccess": true}"#;
        let student: Student = serde_json::from_str(json).unwrap();
        assert_eq!(student.id, 7);
        assert_eq!(student.name, "Ada");
        assert_eq!(student.relation_of_guardian, "Aunt");
        assert!(student.system_access);
        assert!(student.class.is_empty());
        assert_eq!(student.roll, 0);
    }
}
