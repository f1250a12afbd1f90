//! Emails carrying signing links.

use chrono::{DateTime, Utc};

use crate::modules::documents::content::escape;
use crate::modules::documents::emails::EmailMessage;
use crate::modules::documents::templates::{SessionContext, format_date};

use super::model::{Language, SignatureDocument, SignatureRequest};

fn document_title(document: SignatureDocument, language: Language) -> &'static str {
    match (document, language) {
        (SignatureDocument::Convention, Language::Fr) => "Convention de formation",
        (SignatureDocument::Convention, Language::En) => "Training agreement",
        (SignatureDocument::Contract, Language::Fr) => "Contrat de formation",
        (SignatureDocument::Contract, Language::En) => "Training contract",
    }
}

/// Subject used when the sender does not provide one.
pub fn default_subject(ctx: &SessionContext, document: SignatureDocument) -> String {
    let title = document_title(document, ctx.language);
    match ctx.language {
        Language::Fr => format!("Demande de signature : {} - {}", title, ctx.formation.name),
        Language::En => format!("Signature request: {} - {}", title, ctx.formation.name),
    }
}

/// Public address of the signing page.
pub fn signing_url(frontend_url: &str, token: &str) -> String {
    format!("{}/signature/{}", frontend_url.trim_end_matches('/'), token)
}

fn deadline(expires_at: DateTime<Utc>, language: Language) -> String {
    let date = format_date(expires_at.date_naive(), language);
    match language {
        Language::Fr => format!("Ce lien est valable jusqu'au {date}."),
        Language::En => format!("This link is valid until {date}."),
    }
}

fn render(
    ctx: &SessionContext,
    request: &SignatureRequest,
    subject: String,
    intro: String,
    url: &str,
) -> EmailMessage {
    let lang = ctx.language;
    let (hello, action, closing) = match lang {
        Language::Fr => (
            format!("Bonjour {},", request.recipient_name),
            "Signer le document",
            "Cordialement,",
        ),
        Language::En => (
            format!("Hello {},", request.recipient_name),
            "Sign the document",
            "Best regards,",
        ),
    };
    let deadline = deadline(request.expires_at, lang);
    let note = request.message.as_deref().filter(|m| !m.trim().is_empty());
    let signature = &ctx.organization.name;

    let mut text = format!("{hello}\n\n{intro}\n\n");
    if let Some(note) = note {
        text.push_str(&format!("{note}\n\n"));
    }
    text.push_str(&format!("{action} : {url}\n{deadline}\n\n{closing}\n{signature}\n"));

    let mut html = format!("<p>{}</p>\n<p>{}</p>\n", escape(&hello), escape(&intro));
    if let Some(note) = note {
        html.push_str(&format!("<p>{}</p>\n", escape(note)));
    }
    html.push_str(&format!(
        "<p><a href=\"{}\">{}</a></p>\n<p>{}</p>\n<p>{}<br>{}</p>\n",
        escape(url),
        escape(action),
        escape(&deadline),
        escape(closing),
        escape(signature)
    ));

    EmailMessage {
        subject,
        text,
        html,
    }
}

pub fn request_email(ctx: &SessionContext, request: &SignatureRequest, url: &str) -> EmailMessage {
    let title = document_title(request.document, ctx.language);
    let intro = match ctx.language {
        Language::Fr => format!(
            "{} vous invite à signer le document « {} » pour la session {}.",
            ctx.organization.name, title, ctx.session.name
        ),
        Language::En => format!(
            "{} invites you to sign the document \"{}\" for the session {}.",
            ctx.organization.name, title, ctx.session.name
        ),
    };
    render(ctx, request, request.subject.clone(), intro, url)
}

pub fn reminder_email(ctx: &SessionContext, request: &SignatureRequest, url: &str) -> EmailMessage {
    let title = document_title(request.document, ctx.language);
    let (subject, intro) = match ctx.language {
        Language::Fr => (
            format!("Rappel : {}", request.subject),
            format!(
                "Le document « {} » pour la session {} attend toujours votre signature.",
                title, ctx.session.name
            ),
        ),
        Language::En => (
            format!("Reminder: {}", request.subject),
            format!(
                "The document \"{}\" for the session {} is still awaiting your signature.",
                title, ctx.session.name
            ),
        ),
    };
    render(ctx, request, subject, intro, url)
}
