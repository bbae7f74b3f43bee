use serde::{Deserialize, Serialize};

/// The four tracked fields of an employee row, without identity
///
/// Missing JSON fields deserialize to the sentinel values: an empty string
/// for the text columns and `None` for `age`. Equality is field-wise, so two
/// `RecordFields` compare equal exactly when every tracked column matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordFields {
    /// Employee name
    #[serde(default)]
    pub name: String,

    /// Employee age; nullable in the table
    #[serde(default)]
    pub age: Option<i64>,

    /// Contact email address
    #[serde(default)]
    pub email: String,

    /// Department the employee belongs to
    #[serde(default)]
    pub department: String,
}

/// A single row of the employee table
///
/// `id` is `None` for rows the store has not assigned an identity yet
/// (pending inserts); once assigned, the id is the row's identity for
/// matching during reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Row identity, assigned by the store; absent for unsaved new rows
    #[serde(default)]
    pub id: Option<i64>,

    /// The tracked field values
    #[serde(flatten)]
    pub fields: RecordFields,
}

impl RecordFields {
    /// Return a copy with surrounding whitespace stripped from the text
    /// columns, the form both the store and the diff compare and persist.
    pub fn normalized(&self) -> Self {
        RecordFields {
            name: self.name.trim().to_string(),
            age: self.age,
            email: self.email.trim().to_string(),
            department: self.department.trim().to_string(),
        }
    }

    /// True when every tracked column holds its sentinel value
    ///
    /// The store refuses to create such rows; the grid also filters them out
    /// before diffing, since the spare trailing row of the editor is empty.
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty()
            && self.age.is_none()
            && self.email.trim().is_empty()
            && self.department.trim().is_empty()
    }
}

impl Record {
    pub fn new(id: i64, fields: RecordFields) -> Self {
        Record {
            id: Some(id),
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_deserialize_to_sentinels() {
        let record: Record = serde_json::from_str(r#"{"name":"Ada"}"#).unwrap();
        assert_eq!(record.id, None);
        assert_eq!(record.fields.name, "Ada");
        assert_eq!(record.fields.age, None);
        assert_eq!(record.fields.email, "");
        assert_eq!(record.fields.department, "");
    }

    #[test]
    fn normalization_trims_text_columns() {
        let fields = RecordFields {
            name: "  Ada ".to_string(),
            age: Some(36),
            email: " ada@example.com".to_string(),
            department: "Engineering".to_string(),
        };
        let norm = fields.normalized();
        assert_eq!(norm.name, "Ada");
        assert_eq!(norm.email, "ada@example.com");
        assert_eq!(norm.age, Some(36));
    }

    #[test]
    fn whitespace_only_row_is_empty() {
        let fields = RecordFields {
            name: "   ".to_string(),
            ..Default::default()
        };
        assert!(fields.is_empty());

        let fields = RecordFields {
            age: Some(1),
            ..Default::default()
        };
        assert!(!fields.is_empty());
    }

    #[test]
    fn id_round_trips_through_flattened_json() {
        let record = Record::new(
            7,
            RecordFields {
                name: "Tom Chen".to_string(),
                age: Some(45),
                email: "tom@example.com".to_string(),
                department: "Management".to_string(),
            },
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["department"], "Management");
        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
