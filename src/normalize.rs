//! Record → document text.

use crate::dataset::Record;

/// Render a record as `"field: value"` lines in field order, skipping missing values.
///
/// An all-missing record yields an empty string; callers drop those since they
/// carry nothing to retrieve.
pub fn normalize(record: &Record) -> String {
    record
        .fields()
        .filter_map(|(name, value)| value.map(|v| format!("{name}: {v}")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether a normalized text is worth indexing.
pub fn is_indexable(text: &str) -> bool {
    !text.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_present_fields_in_order() {
        let record = Record::new()
            .with("name", "Ada")
            .with_missing("age")
            .with("city", "London");
        assert_eq!(normalize(&record), "name: Ada\ncity: London");
    }

    #[test]
    fn each_present_field_appears_once() {
        let record = Record::new()
            .with("symptom", "cough")
            .with("severity", "mild")
            .with("duration", "3 days");
        let text = normalize(&record);
        for (name, value) in record.fields() {
            let line = format!("{name}: {}", value.unwrap());
            assert_eq!(text.matches(&line).count(), 1, "{line} should appear once");
        }
        let sev = text.find("severity").unwrap();
        assert!(text.find("symptom").unwrap() < sev);
        assert!(sev < text.find("duration").unwrap());
    }

    #[test]
    fn all_missing_record_is_empty() {
        let record = Record::new().with_missing("a").with_missing("b");
        let text = normalize(&record);
        assert_eq!(text, "");
        assert!(!is_indexable(&text));
    }

    #[test]
    fn whitespace_only_text_is_not_indexable() {
        // A blank value still contributes its field name.
        let record = Record::new().with("a", " ");
        assert!(is_indexable(&normalize(&record)));
        assert!(!is_indexable("  \n\t"));
    }

    #[test]
    fn deterministic() {
        let record = Record::new().with("x", "1").with("y", "2");
        assert_eq!(normalize(&record), normalize(&record));
    }
}
