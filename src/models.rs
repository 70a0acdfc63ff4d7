use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::classifier::Intent;
use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = emails)]
pub struct Email {
    pub id: Uuid,
    pub case_number: String,
    pub sender: String,
    pub subject: String,
    pub content: String,
    pub intent: Option<String>,
    pub confidence: Option<f64>,
    pub folder: Option<String>,
    pub needs_review: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Email {
    /// The stored intent, when it names one of the known categories.
    pub fn resolved_intent(&self) -> Option<Intent> {
        self.intent.as_deref().and_then(|value| value.parse().ok())
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = emails)]
pub struct NewEmail {
    pub id: Uuid,
    pub case_number: String,
    pub sender: String,
    pub subject: String,
    pub content: String,
    pub intent: Option<String>,
    pub confidence: Option<f64>,
    pub folder: Option<String>,
    pub needs_review: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = drafts)]
#[diesel(belongs_to(Email))]
pub struct Draft {
    pub id: Uuid,
    pub email_id: Uuid,
    pub subject: String,
    pub content: String,
    pub approved: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = drafts)]
pub struct NewDraft {
    pub id: Uuid,
    pub email_id: Uuid,
    pub subject: String,
    pub content: String,
    pub approved: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = templates)]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    pub intent_type: String,
    pub subject_template: String,
    pub body_template: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = templates)]
pub struct NewTemplate {
    pub id: Uuid,
    pub name: String,
    pub intent_type: String,
    pub subject_template: String,
    pub body_template: String,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn email_with_intent(intent: Option<&str>) -> Email {
        let now = Utc::now().naive_utc();
        Email {
            id: Uuid::new_v4(),
            case_number: "CASE-0123456789AB".into(),
            sender: "pat@example.com".into(),
            subject: "Refund".into(),
            content: "Please refund me".into(),
            intent: intent.map(str::to_string),
            confidence: None,
            folder: None,
            needs_review: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn resolves_known_intents() {
        assert_eq!(
            email_with_intent(Some("billing")).resolved_intent(),
            Some(Intent::Billing)
        );
    }

    #[test]
    fn unknown_or_missing_intents_are_unresolved() {
        assert_eq!(email_with_intent(Some("spam")).resolved_intent(), None);
        assert_eq!(email_with_intent(None).resolved_intent(), None);
    }
}
