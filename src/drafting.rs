//! Auto-reply draft generation.
//!
//! A draft is produced from three inputs: the email itself, the template
//! chosen for its intent, and the placeholders extracted from its body.
//! Template storage is reached only through [`TemplateLookup`], so the
//! generator stays a pure function of what the caller hands it.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::classifier::{self, Intent, FALLBACK_INTENT};
use crate::error::ReplyError;
use crate::models::Email;

pub const CASE_NUMBER_PREFIX: &str = "CASE-";
const CASE_TOKEN_LEN: usize = 12;

const FALLBACK_GREETING: &str = "Hello,";
const FALLBACK_CUSTOMER_NAME: &str = "Customer";
const FALLBACK_ORDER_ID: &str = "your order";
const FALLBACK_SUBJECT: &str = "your message";

/// Subject and body patterns with `{token}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTemplate {
    pub id: Option<Uuid>,
    pub subject: String,
    pub body: String,
}

/// Read access to stored templates.
pub trait TemplateLookup {
    /// Returns the template to use for `intent`, or
    /// [`ReplyError::NoTemplateAvailable`] when none is stored.
    fn find_template(&mut self, intent: Intent) -> Result<ReplyTemplate, ReplyError>;
}

/// A lookup with nothing stored; every intent resolves to its built-in.
pub struct BuiltinTemplates;

impl TemplateLookup for BuiltinTemplates {
    fn find_template(&mut self, intent: Intent) -> Result<ReplyTemplate, ReplyError> {
        Err(ReplyError::NoTemplateAvailable(intent))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraftResult {
    pub subject: String,
    pub content: String,
    pub case_number: String,
    pub intent: Intent,
    pub template_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placeholders {
    pub customer_name: Option<String>,
    pub order_id: Option<String>,
    pub customer_email: Option<String>,
}

// Lead-ins match in any case. After "i'm", "i am" or "this is" only
// capitalized words count as a name, so "I am unable to" yields nothing.
static NAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["my name is", "i'm", "i am", "this is"]
        .iter()
        .map(|lead| {
            Regex::new(&format!(
                r"\b(?i:{})\s+([A-Z][a-z]+(?: [A-Z][a-z]+){{0,2}})",
                regex::escape(lead)
            ))
            .expect("name pattern must compile")
        })
        .collect()
});

// "my name is" may be followed by a name in any case, as long as the name
// runs up to punctuation or the end of the line.
static SPELLED_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)\bmy name is\s+([a-z]+(?: [a-z]+){0,2})\s*(?:[.,;:!?]|$)")
        .expect("spelled name pattern must compile")
});

static ORDER_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\border(?:\s+(?:number|no\.?|id))?\s*[#:-]?\s*(\d+)",
        r"#(\d{3,})",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("order pattern must compile"))
    .collect()
});

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
        .expect("email pattern must compile")
});

static TOKEN_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").expect("token pattern must compile"));

fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns
        .iter()
        .find_map(|pattern| pattern.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|found| found.as_str().to_string())
}

fn capitalize_words(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn extract_placeholders(content: &str) -> Placeholders {
    let normalized = content.replace(['\u{2018}', '\u{2019}'], "'");
    let customer_name = first_capture(&NAME_PATTERNS, &normalized).or_else(|| {
        SPELLED_NAME_PATTERN
            .captures(&normalized)
            .and_then(|caps| caps.get(1))
            .map(|found| capitalize_words(found.as_str()))
    });
    Placeholders {
        customer_name,
        order_id: first_capture(&ORDER_PATTERNS, &normalized),
        customer_email: EMAIL_PATTERN
            .find(&normalized)
            .map(|found| found.as_str().to_string()),
    }
}

/// A fresh `CASE-XXXXXXXXXXXX` identifier. Called once per email, at creation.
pub fn new_case_number() -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!(
        "{CASE_NUMBER_PREFIX}{}",
        token[..CASE_TOKEN_LEN].to_ascii_uppercase()
    )
}

pub fn builtin_template(intent: Intent) -> ReplyTemplate {
    let (subject, body) = match intent {
        Intent::Billing => (BILLING_SUBJECT, BILLING_BODY),
        Intent::Support => (SUPPORT_SUBJECT, SUPPORT_BODY),
        Intent::Bug => (BUG_SUBJECT, BUG_BODY),
        Intent::Feature => (FEATURE_SUBJECT, FEATURE_BODY),
    };
    ReplyTemplate {
        id: None,
        subject: subject.to_string(),
        body: body.to_string(),
    }
}

struct Substitutions<'a> {
    email: &'a Email,
    placeholders: &'a Placeholders,
}

impl Substitutions<'_> {
    fn resolve(&self, token: &str) -> Option<Cow<'_, str>> {
        let value = match token {
            "greeting" => match &self.placeholders.customer_name {
                Some(name) => Cow::Owned(format!("Dear {name},")),
                None => Cow::Borrowed(FALLBACK_GREETING),
            },
            "customer_name" => Cow::Borrowed(
                self.placeholders
                    .customer_name
                    .as_deref()
                    .unwrap_or(FALLBACK_CUSTOMER_NAME),
            ),
            "case_number" => Cow::Borrowed(self.email.case_number.as_str()),
            "original_subject" => {
                let subject = self.email.subject.trim();
                Cow::Borrowed(if subject.is_empty() {
                    FALLBACK_SUBJECT
                } else {
                    subject
                })
            }
            "order_id" => Cow::Borrowed(
                self.placeholders
                    .order_id
                    .as_deref()
                    .unwrap_or(FALLBACK_ORDER_ID),
            ),
            "order_reference" => match &self.placeholders.order_id {
                Some(order_id) => Cow::Owned(format!("order #{order_id} and ")),
                None => Cow::Borrowed(""),
            },
            "sender" => Cow::Borrowed(self.email.sender.as_str()),
            "customer_email" => Cow::Borrowed(
                self.placeholders
                    .customer_email
                    .as_deref()
                    .unwrap_or(self.email.sender.as_str()),
            ),
            _ => return None,
        };
        Some(value)
    }

    fn apply(&self, pattern: &str) -> String {
        TOKEN_PATTERN
            .replace_all(pattern, |caps: &Captures| match self.resolve(&caps[1]) {
                Some(value) => value.into_owned(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }
}

fn select_template<L>(lookup: &mut L, intent: Intent) -> ReplyTemplate
where
    L: TemplateLookup + ?Sized,
{
    match lookup.find_template(intent) {
        Ok(template) => template,
        Err(ReplyError::NoTemplateAvailable(_)) => {
            debug!(%intent, "no stored template, using built-in");
            builtin_template(intent)
        }
        Err(err) => {
            warn!(%intent, error = %err, "template lookup failed, using built-in");
            builtin_template(intent)
        }
    }
}

/// Builds a reply for `email`.
///
/// An email without a stored intent is classified first; a stored intent
/// outside the known categories falls back to the support template. The
/// case number is the one already on the record.
pub fn generate_draft<L>(email: &Email, lookup: &mut L) -> DraftResult
where
    L: TemplateLookup + ?Sized,
{
    let intent = match (&email.intent, email.resolved_intent()) {
        (_, Some(intent)) => intent,
        (Some(unknown), None) => {
            warn!(email_id = %email.id, intent = %unknown, "unrecognised intent on email");
            FALLBACK_INTENT
        }
        (None, None) => classifier::classify(&email.subject, &email.content).intent,
    };

    let template = select_template(lookup, intent);
    let placeholders = extract_placeholders(&email.content);
    let substitutions = Substitutions {
        email,
        placeholders: &placeholders,
    };

    DraftResult {
        subject: substitutions.apply(&template.subject),
        content: substitutions.apply(&template.body),
        case_number: email.case_number.clone(),
        intent,
        template_id: template.id,
    }
}

const BILLING_SUBJECT: &str = "Re: {original_subject} - Case #{case_number}";
const BILLING_BODY: &str = "{greeting}

Thank you for contacting us regarding your billing inquiry.

We have received your message and created case #{case_number} to track your request.

Next steps:
1. Our billing team will review your account details
2. We will investigate the matter within 1-2 business days
3. You will receive a detailed response with resolution options

If you have any additional information related to {order_reference}your inquiry, please reply to this email with your case number.

Best regards,
Customer Support Team";

const SUPPORT_SUBJECT: &str = "Re: {original_subject} - Case #{case_number}";
const SUPPORT_BODY: &str = "{greeting}

Thank you for reaching out to our support team.

We have received your request and created case #{case_number} for tracking purposes.

Next steps:
1. Our support specialists will review your question
2. We will provide detailed guidance within 24 hours
3. If additional information is needed, we will contact you promptly

If your question concerns {order_reference}your account, please keep your case number handy when you reply.

Thank you for your patience.

Best regards,
Customer Support Team";

const BUG_SUBJECT: &str = "Re: {original_subject} - Bug Report #{case_number}";
const BUG_BODY: &str = "{greeting}

Thank you for reporting this issue to us.

We have logged this as bug report #{case_number} and our technical team has been notified.

Next steps:
1. Our engineering team will investigate the reported issue affecting {order_reference}your account
2. We will attempt to reproduce the problem in our test environment
3. You will receive updates on the progress and estimated resolution time within 48 hours

Your detailed report helps us improve our product. We appreciate your patience as we work on a solution.

Technical Reference: #{case_number}

Best regards,
Technical Support Team";

const FEATURE_SUBJECT: &str = "Re: {original_subject} - Feature Request #{case_number}";
const FEATURE_BODY: &str = "{greeting}

Thank you for your feature suggestion!

We have recorded your request as feature #{case_number} for our product team's review.

Next steps:
1. Our product team will evaluate the suggested feature
2. We will assess feasibility and alignment with our roadmap
3. You will be notified if this feature is scheduled for development

We value customer feedback and continuously work to improve our product based on user needs.

Feature Reference: #{case_number}

Best regards,
Product Team";
