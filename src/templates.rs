use diesel::pg::PgConnection;
use diesel::prelude::*;

use crate::classifier::Intent;
use crate::drafting::{ReplyTemplate, TemplateLookup};
use crate::error::ReplyError;
use crate::models::Template;
use crate::schema::templates;

/// Template lookup over the `templates` table.
///
/// Picks the newest active template for an intent; the id breaks ties between
/// rows created in the same instant.
pub struct TemplateRepository<'a> {
    conn: &'a mut PgConnection,
}

impl<'a> TemplateRepository<'a> {
    pub fn new(conn: &'a mut PgConnection) -> Self {
        Self { conn }
    }

    pub fn latest_active(&mut self, intent: Intent) -> QueryResult<Option<Template>> {
        templates::table
            .filter(templates::intent_type.eq(intent.as_str()))
            .filter(templates::is_active.eq(true))
            .order((templates::created_at.desc(), templates::id.desc()))
            .first(self.conn)
            .optional()
    }
}

impl TemplateLookup for TemplateRepository<'_> {
    fn find_template(&mut self, intent: Intent) -> Result<ReplyTemplate, ReplyError> {
        match self.latest_active(intent) {
            Ok(Some(template)) => Ok(ReplyTemplate {
                id: Some(template.id),
                subject: template.subject_template,
                body: template.body_template,
            }),
            Ok(None) => Err(ReplyError::NoTemplateAvailable(intent)),
            Err(err) => Err(ReplyError::TemplateStore(err.to_string())),
        }
    }
}
