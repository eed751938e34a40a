//! Email templates
//!
//! Templates are referenced by name on the queued item and rendered at send
//! time. Placeholders use `{{name}}`; values are HTML-escaped in the html body.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::NotificationError;

/// Templates known to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailTemplate {
    /// Passenger: claim submitted to the airline
    ClaimFiled,
    /// Passenger: service fee refunded
    RefundIssued,
    /// Operator: claims past the filing SLA
    OverdueClaimsAlert,
    /// Operator: monitoring claims due for follow-up with one airline
    FollowUpReminder,
    /// Operator: filing attempts that failed this run
    FilingFailureAlert,
}

struct TemplateBody {
    subject: &'static str,
    text: &'static str,
    html: &'static str,
}

/// A fully rendered template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

impl EmailTemplate {
    pub fn name(&self) -> &'static str {
        match self {
            EmailTemplate::ClaimFiled => "claim_filed",
            EmailTemplate::RefundIssued => "refund_issued",
            EmailTemplate::OverdueClaimsAlert => "overdue_claims_alert",
            EmailTemplate::FollowUpReminder => "follow_up_reminder",
            EmailTemplate::FilingFailureAlert => "filing_failure_alert",
        }
    }

    /// Variables that must be supplied
    pub fn required_variables(&self) -> &'static [&'static str] {
        match self {
            EmailTemplate::ClaimFiled => &[
                "passenger_name", "claim_id", "airline_name", "airline_reference", "flight_number",
            ],
            EmailTemplate::RefundIssued => &["passenger_name", "claim_id", "amount", "reason"],
            EmailTemplate::OverdueClaimsAlert => &["count", "deadline_days", "claim_list"],
            EmailTemplate::FollowUpReminder => &["airline_name", "count", "claim_list"],
            EmailTemplate::FilingFailureAlert => &["failed_count", "details"],
        }
    }

    fn body(&self) -> TemplateBody {
        match self {
            EmailTemplate::ClaimFiled => TemplateBody {
                subject: "Your claim {{claim_id}} has been filed with {{airline_name}}",
                text: "Hi {{passenger_name}},\n\nWe have filed your compensation claim for flight {{flight_number}} with {{airline_name}}.\nAirline reference: {{airline_reference}}\n\nWe will keep following up until the airline responds.",
                html: "<p>Hi {{passenger_name}},</p><p>We have filed your compensation claim for flight <strong>{{flight_number}}</strong> with {{airline_name}}.</p><p>Airline reference: <code>{{airline_reference}}</code></p><p>We will keep following up until the airline responds.</p>",
            },
            EmailTemplate::RefundIssued => TemplateBody {
                subject: "Refund issued for claim {{claim_id}}",
                text: "Hi {{passenger_name}},\n\nWe have refunded {{amount}} for claim {{claim_id}}.\nReason: {{reason}}\n\nThe refund may take 5-10 business days to appear.",
                html: "<p>Hi {{passenger_name}},</p><p>We have refunded <strong>{{amount}}</strong> for claim {{claim_id}}.</p><p>Reason: {{reason}}</p><p>The refund may take 5-10 business days to appear.</p>",
            },
            EmailTemplate::OverdueClaimsAlert => TemplateBody {
                subject: "{{count}} claim(s) past the {{deadline_days}}-day filing deadline",
                text: "The following claims have not been filed within {{deadline_days}} days:\n\n{{claim_list}}",
                html: "<p>The following claims have not been filed within {{deadline_days}} days:</p><pre>{{claim_list}}</pre>",
            },
            EmailTemplate::FollowUpReminder => TemplateBody {
                subject: "Follow up with {{airline_name}} on {{count}} claim(s)",
                text: "These claims with {{airline_name}} are due for follow-up:\n\n{{claim_list}}",
                html: "<p>These claims with {{airline_name}} are due for follow-up:</p><pre>{{claim_list}}</pre>",
            },
            EmailTemplate::FilingFailureAlert => TemplateBody {
                subject: "Automatic filing failed for {{failed_count}} claim(s)",
                text: "The last filing run could not submit these claims:\n\n{{details}}",
                html: "<p>The last filing run could not submit these claims:</p><pre>{{details}}</pre>",
            },
        }
    }

    /// Checks that every required variable is present
    pub fn validate(&self, variables: &BTreeMap<String, String>) -> Result<(), NotificationError> {
        for required in self.required_variables() {
            if !variables.contains_key(*required) {
                return Err(NotificationError::MissingVariable {
                    template: self.name().to_string(),
                    variable: (*required).to_string(),
                });
            }
        }
        Ok(())
    }

    /// Renders subject, text and html bodies
    pub fn render(&self, variables: &BTreeMap<String, String>) -> Result<RenderedEmail, NotificationError> {
        self.validate(variables)?;
        let body = self.body();
        Ok(RenderedEmail {
            subject: substitute(body.subject, variables, false),
            text: substitute(body.text, variables, false),
            html: substitute(body.html, variables, true),
        })
    }
}

fn substitute(template: &str, variables: &BTreeMap<String, String>, escape: bool) -> String {
    let mut out = template.to_string();
    for (key, value) in variables {
        let placeholder = format!("{{{{{}}}}}", key);
        if out.contains(&placeholder) {
            let value = if escape { escape_html(value) } else { value.clone() };
            out = out.replace(&placeholder, &value);
        }
    }
    out
}

/// Escapes text for inclusion in an HTML body
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_render_refund_issued() {
        let rendered = EmailTemplate::RefundIssued
            .render(&vars(&[
                ("passenger_name", "Ada"),
                ("claim_id", "CLM001"),
                ("amount", "€ 49.00"),
                ("reason", "claim_not_filed_deadline"),
            ]))
            .unwrap();

        assert_eq!(rendered.subject, "Refund issued for claim CLM001");
        assert!(rendered.text.contains("€ 49.00"));
        assert!(!rendered.html.contains("{{"));
    }

    #[test]
    fn test_missing_variable_rejected() {
        let err = EmailTemplate::FollowUpReminder
            .render(&vars(&[("airline_name", "Lufthansa"), ("count", "1")]))
            .unwrap_err();

        assert!(matches!(
            err,
            NotificationError::MissingVariable { ref variable, .. } if variable == "claim_list"
        ));
    }

    #[test]
    fn test_html_values_are_escaped() {
        let rendered = EmailTemplate::FilingFailureAlert
            .render(&vars(&[("failed_count", "1"), ("details", "<script>")]))
            .unwrap();

        assert!(rendered.html.contains("&lt;script&gt;"));
        assert!(rendered.text.contains("<script>"));
    }
}
