//! Download and archive entry names.

use super::model::{DocumentJobKind, DocumentKind};

/// Replaces whitespace runs with `_` and strips path separators.
pub fn sanitize(part: &str) -> String {
    part.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| !matches!(c, '/' | '\\'))
        .collect()
}

pub fn learner_file_name(prefix: &str, last_name: &str, first_name: &str) -> String {
    format!("{prefix}_{}_{}.pdf", sanitize(last_name), sanitize(first_name))
}

/// File name for a session-level document. `subject` is the session,
/// program or organization name depending on the kind.
pub fn session_file_name(kind: DocumentKind, subject: &str) -> String {
    let prefix = match kind {
        DocumentKind::Convention => "convention",
        DocumentKind::Program => "programme",
        DocumentKind::Terms => "cgv",
        DocumentKind::PrivacyPolicy => "politique_confidentialite",
        DocumentKind::SessionReport => "rapport_session",
        DocumentKind::Contract => "contrat",
        DocumentKind::Convocation => "convocation",
        DocumentKind::AttendanceCertificate => "attestation",
    };
    format!("{prefix}_{}.pdf", sanitize(subject))
}

pub fn enrollment_file_name(kind: DocumentKind, last_name: &str, first_name: &str) -> String {
    let prefix = match kind {
        DocumentKind::Contract => "contrat",
        DocumentKind::AttendanceCertificate => "attestation",
        _ => "convocation",
    };
    learner_file_name(prefix, last_name, first_name)
}

pub const GENERAL_CONVENTION_ENTRY: &str = "convention_generale.pdf";

pub fn archive_file_name(kind: DocumentJobKind, session_name: &str) -> String {
    format!("{}_{}.zip", kind.archive_prefix(), sanitize(session_name))
}

pub fn with_extension(file_name: &str, extension: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, _)) => format!("{stem}.{extension}"),
        None => format!("{file_name}.{extension}"),
    }
}

/// `Content-Disposition` value with an ASCII fallback and the UTF-8 name.
pub fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut encoded = String::with_capacity(file_name.len() * 3);
    for byte in file_name.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }

    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learner_names() {
        assert_eq!(
            enrollment_file_name(DocumentKind::Contract, "Dupont", "Marie Claire"),
            "contrat_Dupont_Marie_Claire.pdf"
        );
        assert_eq!(
            enrollment_file_name(DocumentKind::Convocation, "N'Guessan", "Awa"),
            "convocation_N'Guessan_Awa.pdf"
        );
        assert_eq!(
            enrollment_file_name(DocumentKind::AttendanceCertificate, "Koné", "Ali"),
            "attestation_Koné_Ali.pdf"
        );
    }

    #[test]
    fn test_session_names_strip_separators() {
        assert_eq!(
            session_file_name(DocumentKind::Convention, "Session  Mars / 2025"),
            "convention_Session_Mars__2025.pdf"
        );
        assert_eq!(
            session_file_name(DocumentKind::PrivacyPolicy, "Centre Alpha"),
            "politique_confidentialite_Centre_Alpha.pdf"
        );
        assert_eq!(session_file_name(DocumentKind::Terms, "Alpha"), "cgv_Alpha.pdf");
    }

    #[test]
    fn test_archive_names() {
        assert_eq!(
            archive_file_name(DocumentJobKind::ConventionsContracts, "Session Mars"),
            "conventions_contrats_Session_Mars.zip"
        );
        assert_eq!(
            archive_file_name(DocumentJobKind::Convocations, "Session Mars"),
            "convocations_Session_Mars.zip"
        );
    }

    #[test]
    fn test_content_disposition_encodes_non_ascii() {
        assert_eq!(
            content_disposition("attestation_Koné.pdf"),
            "attachment; filename=\"attestation_Kon_.pdf\"; filename*=UTF-8''attestation_Kon%C3%A9.pdf"
        );
    }

    #[test]
    fn test_with_extension() {
        assert_eq!(with_extension("contrat_a_b.pdf", "html"), "contrat_a_b.html");
    }
}
