//! Bodies of the emails carrying generated documents.

use super::content::escape;
use super::model::Language;
use super::templates::{LearnerContext, SessionContext, format_date};

/// Subject, plain text and HTML of an outgoing message.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub subject: String,
    pub text: String,
    pub html: String,
}

fn greeting(language: Language, learner: &LearnerContext) -> String {
    match language {
        Language::Fr => format!("Bonjour {},", learner.full_name()),
        Language::En => format!("Hello {},", learner.full_name()),
    }
}

fn session_lines(ctx: &SessionContext) -> Vec<(&'static str, String)> {
    let lang = ctx.language;
    let (formation, session, dates, location) = match lang {
        Language::Fr => ("Formation", "Session", "Dates", "Lieu"),
        Language::En => ("Training", "Session", "Dates", "Location"),
    };
    let between = match lang {
        Language::Fr => "au",
        Language::En => "to",
    };

    let mut lines = vec![
        (formation, ctx.formation.name.clone()),
        (session, ctx.session.name.clone()),
        (
            dates,
            format!(
                "{} {} {}",
                format_date(ctx.session.start_date, lang),
                between,
                format_date(ctx.session.end_date, lang)
            ),
        ),
    ];
    if let Some(place) = ctx.session.location.as_deref().filter(|l| !l.trim().is_empty()) {
        lines.push((location, place.to_string()));
    }
    lines
}

fn render(ctx: &SessionContext, subject: String, intro: &str, learner: &LearnerContext) -> EmailMessage {
    let lines = session_lines(ctx);
    let closing = match ctx.language {
        Language::Fr => "Cordialement,",
        Language::En => "Best regards,",
    };
    let hello = greeting(ctx.language, learner);
    let signature = &ctx.organization.name;

    let mut text = format!("{hello}\n\n{intro}\n\n");
    for (label, value) in &lines {
        text.push_str(&format!("{label} : {value}\n"));
    }
    text.push_str(&format!("\n{closing}\n{signature}\n"));

    let mut html = format!("<p>{}</p>\n<p>{}</p>\n<ul>\n", escape(&hello), escape(intro));
    for (label, value) in &lines {
        html.push_str(&format!(
            "  <li><strong>{}</strong> : {}</li>\n",
            escape(label),
            escape(value)
        ));
    }
    html.push_str(&format!(
        "</ul>\n<p>{}<br>{}</p>\n",
        escape(closing),
        escape(signature)
    ));

    EmailMessage {
        subject,
        text,
        html,
    }
}

pub fn convocation_email(ctx: &SessionContext, learner: &LearnerContext) -> EmailMessage {
    let intro = match ctx.language {
        Language::Fr => "Veuillez trouver ci-joint votre convocation à la formation suivante :",
        Language::En => "Please find attached your invitation to the following training:",
    };
    render(
        ctx,
        format!("Convocation - {}", ctx.session.name),
        intro,
        learner,
    )
}

pub fn contract_email(ctx: &SessionContext, learner: &LearnerContext) -> EmailMessage {
    let (subject, intro) = match ctx.language {
        Language::Fr => (
            format!("Contrat de formation - {}", ctx.formation.name),
            "Veuillez trouver ci-joint votre contrat de formation professionnelle :",
        ),
        Language::En => (
            format!("Training contract - {}", ctx.formation.name),
            "Please find attached your professional training contract:",
        ),
    };
    render(ctx, subject, intro, learner)
}

#[cfg(test)]
mod tests {
    use super::super::templates::fixtures;
    use super::*;

    #[test]
    fn test_convocation_email_lists_session_details() {
        let ctx = fixtures::session_context(Language::Fr);
        let learner = fixtures::learner(&ctx);

        let message = convocation_email(&ctx, &learner);

        assert_eq!(message.subject, "Convocation - Excel avancé - mars");
        assert!(message.text.starts_with("Bonjour Awa Koné,"));
        assert!(message.text.contains("Dates : 10/03/2025 au 12/03/2025"));
        assert!(message.text.contains("Lieu : Salle B"));
        assert!(message.text.ends_with("Centre Formation Plus\n"));
        assert!(message.html.contains("<li><strong>Formation</strong> : Excel avancé</li>"));
    }

    #[test]
    fn test_contract_email_subject_names_formation() {
        let ctx = fixtures::session_context(Language::Fr);
        let learner = fixtures::learner(&ctx);

        let message = contract_email(&ctx, &learner);
        assert_eq!(message.subject, "Contrat de formation - Excel avancé");
    }

    #[test]
    fn test_missing_location_is_omitted() {
        let mut ctx = fixtures::session_context(Language::En);
        ctx.session.location = None;
        let learner = fixtures::learner(&ctx);

        let message = convocation_email(&ctx, &learner);
        assert!(!message.text.contains("Location"));
        assert!(message.text.contains("Dates : 03/10/2025 to 03/12/2025"));
    }
}
