//! Content of each document kind, in French or English.

use chrono::{NaiveDate, NaiveTime};
use trainhub_models::enrollments::Enrollment;
use trainhub_models::formations::Formation;
use trainhub_models::organizations::Organization;
use trainhub_models::programs::Program;
use trainhub_models::reports::SessionReport;
use trainhub_models::sessions::Session;
use trainhub_models::students::Student;

use super::content::DocumentContent;
use super::model::Language;

/// Everything known about a session when rendering its documents.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub language: Language,
    pub organization: Organization,
    pub session: Session,
    pub formation: Formation,
    pub programs: Vec<Program>,
    pub trainer_name: Option<String>,
    pub learner_count: i64,
    pub issue_date: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct LearnerContext {
    pub student: Student,
    pub enrollment: Enrollment,
    /// Attendance rate in percent, when attendance was recorded
    pub attendance_rate: Option<i64>,
}

impl LearnerContext {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.student.first_name, self.student.last_name)
    }
}

fn tr(language: Language, fr: &'static str, en: &'static str) -> &'static str {
    match language {
        Language::Fr => fr,
        Language::En => en,
    }
}

pub fn format_date(date: NaiveDate, language: Language) -> String {
    match language {
        Language::Fr => date.format("%d/%m/%Y").to_string(),
        Language::En => date.format("%m/%d/%Y").to_string(),
    }
}

fn format_time(time: Option<NaiveTime>) -> String {
    time.map(|t| t.format("%H:%M").to_string())
        .unwrap_or_default()
}

/// Groups thousands and keeps cents only when there are some.
pub fn format_amount(amount: f64, currency: &str, language: Language) -> String {
    let separator = tr(language, " ", ",");
    let rounded = (amount * 100.0).round() / 100.0;
    let whole = rounded.trunc().abs() as u64;
    let cents = ((rounded.abs() - whole as f64) * 100.0).round() as u64;

    let digits = whole.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push_str(separator);
        }
        grouped.push(c);
    }

    let sign = if rounded < 0.0 { "-" } else { "" };
    if cents > 0 {
        let decimal = tr(language, ",", ".");
        format!("{sign}{grouped}{decimal}{cents:02} {currency}")
    } else {
        format!("{sign}{grouped} {currency}")
    }
}

fn issuer_line(org: &Organization) -> String {
    let mut parts = vec![org.name.clone()];
    parts.extend(
        [&org.address, &org.city, &org.phone, &org.email]
            .into_iter()
            .flatten()
            .filter(|v| !v.trim().is_empty())
            .cloned(),
    );
    parts.join(" | ")
}

fn schedule(ctx: &SessionContext) -> String {
    let lang = ctx.language;
    let s = &ctx.session;
    let dates = format!(
        "{} {} {} {}",
        tr(lang, "Du", "From"),
        format_date(s.start_date, lang),
        tr(lang, "au", "to"),
        format_date(s.end_date, lang)
    );
    match (s.start_time, s.end_time) {
        (Some(_), Some(_)) => format!(
            "{dates}, {} {} {}",
            format_time(s.start_time),
            tr(lang, "à", "to"),
            format_time(s.end_time)
        ),
        _ => dates,
    }
}

fn price(ctx: &SessionContext) -> f64 {
    ctx.session.price.unwrap_or(ctx.formation.price)
}

fn done_at(ctx: &SessionContext) -> String {
    let lang = ctx.language;
    let place = ctx
        .organization
        .city
        .clone()
        .unwrap_or_else(|| ctx.organization.name.clone());
    format!(
        "{} {}, {} {}",
        tr(lang, "Fait à", "Done at"),
        place,
        tr(lang, "le", "on"),
        format_date(ctx.issue_date, lang)
    )
}

fn formation_fields(doc: &mut DocumentContent, ctx: &SessionContext) {
    let lang = ctx.language;
    let f = &ctx.formation;
    doc.fields([
        (tr(lang, "Formation", "Training"), f.name.clone()),
        (tr(lang, "Code", "Code"), f.code.clone().unwrap_or_default()),
        (tr(lang, "Session", "Session"), ctx.session.name.clone()),
        (tr(lang, "Dates", "Dates"), schedule(ctx)),
        (
            tr(lang, "Durée", "Duration"),
            f.duration_hours
                .map(|h| format!("{h} {}", tr(lang, "heures", "hours")))
                .unwrap_or_default(),
        ),
        (
            tr(lang, "Lieu", "Location"),
            ctx.session.location.clone().unwrap_or_default(),
        ),
        (
            tr(lang, "Formateur", "Trainer"),
            ctx.trainer_name.clone().unwrap_or_default(),
        ),
    ]);
}

fn program_outline(doc: &mut DocumentContent, program: &Program) {
    if let Some(description) = program.description.as_deref().filter(|d| !d.trim().is_empty()) {
        doc.paragraph(description);
    }
    doc.bullets(program.content.iter().map(|module| {
        let mut line = module.title.clone();
        if let Some(hours) = module.duration_hours {
            line.push_str(&format!(" ({hours} h)"));
        }
        if let Some(description) = module.description.as_deref().filter(|d| !d.trim().is_empty()) {
            line.push_str(&format!(": {description}"));
        }
        line
    }));
}

/// Training agreement between the organization and the client for the
/// whole session.
pub fn convention(ctx: &SessionContext) -> DocumentContent {
    let lang = ctx.language;
    let org = &ctx.organization;
    let mut doc = DocumentContent::new(
        tr(lang, "CONVENTION DE FORMATION PROFESSIONNELLE", "PROFESSIONAL TRAINING AGREEMENT"),
        issuer_line(org),
    )
    .subtitle(tr(
        lang,
        "Article L. 6353-1 du Code du Travail",
        "Article L. 6353-1 of the French Labour Code",
    ));

    doc.heading(tr(lang, "Entre les soussignés", "Between the undersigned"));
    doc.fields([
        (tr(lang, "Organisme de formation", "Training organization"), org.name.clone()),
        (tr(lang, "Adresse", "Address"), org.address.clone().unwrap_or_default()),
        (tr(lang, "SIRET", "Registration number"), org.siret.clone().unwrap_or_default()),
        (
            tr(lang, "Représenté par", "Represented by"),
            org.director_name.clone().unwrap_or_default(),
        ),
    ]);

    doc.heading(tr(lang, "1. Objet de la convention", "1. Purpose of the agreement"));
    doc.paragraph(tr(
        lang,
        "L'organisme de formation s'engage à organiser l'action de formation décrite ci-dessous.",
        "The training organization undertakes to deliver the training described below.",
    ));
    formation_fields(&mut doc, ctx);

    doc.heading(tr(lang, "2. Effectif formé", "2. Number of learners"));
    let mut headcount = format!(
        "{}: {}",
        tr(lang, "Nombre de stagiaires inscrits", "Enrolled learners"),
        ctx.learner_count
    );
    if let Some(max) = ctx.session.capacity_max.filter(|m| *m > 0) {
        headcount.push_str(&format!(" / {max} {}", tr(lang, "places", "seats")));
    }
    doc.paragraph(headcount);

    doc.heading(tr(lang, "3. Prix de la formation", "3. Training price"));
    doc.paragraph(format!(
        "{}: {}",
        tr(lang, "Coût par stagiaire", "Cost per learner"),
        format_amount(price(ctx), &ctx.session.currency, lang)
    ));

    if let Some(objectives) = ctx.formation.objectives.as_deref().filter(|o| !o.trim().is_empty()) {
        doc.heading(tr(lang, "4. Objectifs pédagogiques", "4. Learning objectives"));
        doc.paragraph(objectives);
    }

    doc.heading(tr(lang, "5. Dédit ou abandon", "5. Withdrawal"));
    doc.paragraph(tr(
        lang,
        "En cas d'abandon en cours de formation, seules les heures effectivement suivies sont dues.",
        "If a learner withdraws during the training, only the hours actually attended are due.",
    ));

    doc.heading(tr(lang, "6. Différends éventuels", "6. Disputes"));
    doc.paragraph(tr(
        lang,
        "Si une contestation ne peut être réglée à l'amiable, le tribunal compétent du siège de l'organisme sera saisi.",
        "Any dispute that cannot be settled amicably will be brought before the court of the organization's registered office.",
    ));

    for program in &ctx.programs {
        doc.heading(format!("{}: {}", tr(lang, "Annexe - Programme", "Annex - Program"), program.name));
        program_outline(&mut doc, program);
    }

    doc.spacer().paragraph(done_at(ctx));
    doc.signatures([
        tr(lang, "Pour l'organisme de formation", "For the training organization"),
        tr(lang, "Pour le client", "For the client"),
    ]);
    doc
}

/// Individual training contract between the organization and one learner.
pub fn contract(ctx: &SessionContext, learner: &LearnerContext) -> DocumentContent {
    let lang = ctx.language;
    let org = &ctx.organization;
    let student = &learner.student;
    let mut doc = DocumentContent::new(
        tr(lang, "CONTRAT DE FORMATION PROFESSIONNELLE", "PROFESSIONAL TRAINING CONTRACT"),
        issuer_line(org),
    )
    .subtitle(tr(
        lang,
        "Articles L. 6353-3 à L. 6353-7 du Code du Travail",
        "Articles L. 6353-3 to L. 6353-7 of the French Labour Code",
    ));

    doc.heading(tr(lang, "Entre les soussignés", "Between the undersigned"));
    doc.fields([
        (tr(lang, "Organisme de formation", "Training organization"), org.name.clone()),
        (tr(lang, "SIRET", "Registration number"), org.siret.clone().unwrap_or_default()),
        (tr(lang, "Stagiaire", "Learner"), learner.full_name()),
        (
            tr(lang, "Email", "Email"),
            student.email.as_ref().map(|e| e.as_str().to_string()).unwrap_or_default(),
        ),
        (tr(lang, "Téléphone", "Phone"), student.phone.clone().unwrap_or_default()),
        (tr(lang, "Adresse", "Address"), student.address.clone().unwrap_or_default()),
        (tr(lang, "Entreprise", "Company"), student.company_name.clone().unwrap_or_default()),
    ]);

    doc.heading(tr(lang, "Article 1 - Objet", "Article 1 - Purpose"));
    doc.paragraph(tr(
        lang,
        "Le présent contrat a pour objet la participation du stagiaire à l'action de formation suivante.",
        "This contract covers the learner's participation in the following training.",
    ));
    formation_fields(&mut doc, ctx);

    doc.heading(tr(lang, "Article 2 - Prix et modalités de règlement", "Article 2 - Price and payment"));
    doc.fields([
        (
            tr(lang, "Montant total", "Total amount"),
            format_amount(learner.enrollment.total_amount, &ctx.session.currency, lang),
        ),
        (
            tr(lang, "Déjà réglé", "Already paid"),
            format_amount(learner.enrollment.paid_amount, &ctx.session.currency, lang),
        ),
        (
            tr(lang, "Reste à payer", "Remaining"),
            format_amount(learner.enrollment.remaining_amount(), &ctx.session.currency, lang),
        ),
    ]);

    doc.heading(tr(lang, "Article 3 - Délai de rétractation", "Article 3 - Cooling-off period"));
    doc.paragraph(tr(
        lang,
        "Le stagiaire dispose d'un délai de dix jours à compter de la signature pour se rétracter par lettre recommandée.",
        "The learner may withdraw within ten days of signing by registered letter.",
    ));

    doc.heading(tr(lang, "Article 4 - Interruption du stage", "Article 4 - Interruption"));
    doc.paragraph(tr(
        lang,
        "En cas de force majeure dûment reconnue, seules les prestations effectivement dispensées sont dues au prorata.",
        "In case of duly recognised force majeure, only the services actually delivered are due, pro rata.",
    ));

    doc.spacer().paragraph(done_at(ctx));
    doc.signatures([
        tr(lang, "L'organisme de formation", "The training organization"),
        tr(lang, "Le stagiaire", "The learner"),
    ]);
    doc
}

/// Invitation sent to a learner before the session starts.
pub fn convocation(ctx: &SessionContext, learner: &LearnerContext) -> DocumentContent {
    let lang = ctx.language;
    let mut doc = DocumentContent::new(
        tr(lang, "CONVOCATION À UNE FORMATION", "TRAINING INVITATION"),
        issuer_line(&ctx.organization),
    );

    doc.paragraph(learner.full_name());
    doc.paragraph(tr(lang, "Madame, Monsieur,", "Dear Sir/Madam,"));
    doc.paragraph(tr(
        lang,
        "Nous vous informons que vous êtes convoqué(e) à la session de formation suivante :",
        "We inform you that you are invited to the following training session:",
    ));
    formation_fields(&mut doc, ctx);

    if let Some(program) = ctx.programs.first() {
        doc.fields([(tr(lang, "Programme", "Program"), program.name.clone())]);
    }

    let mut contact = vec![tr(
        lang,
        "Pour toute information complémentaire, vous pouvez nous contacter",
        "For any additional information, you can contact us",
    )
    .to_string()];
    contact.extend(ctx.organization.phone.clone());
    contact.extend(ctx.organization.email.clone());
    doc.paragraph(contact.join(" : "));
    doc.paragraph(tr(
        lang,
        "Nous vous prions d'agréer, Madame, Monsieur, l'expression de nos salutations distinguées.",
        "Yours sincerely,",
    ));

    doc.spacer().paragraph(done_at(ctx));
    doc.signatures([tr(lang, "Signature et cachet", "Signature and stamp")]);
    doc
}

pub fn program(ctx: &SessionContext, program: &Program) -> DocumentContent {
    let lang = ctx.language;
    let f = &ctx.formation;
    let mut doc = DocumentContent::new(
        tr(lang, "PROGRAMME DE FORMATION", "TRAINING PROGRAM"),
        issuer_line(&ctx.organization),
    )
    .subtitle(program.name.clone());

    doc.fields([
        (tr(lang, "Formation", "Training"), f.name.clone()),
        (tr(lang, "Code", "Code"), program.code.clone().or_else(|| f.code.clone()).unwrap_or_default()),
        (
            tr(lang, "Durée", "Duration"),
            f.duration_hours
                .map(|h| format!("{h} {}", tr(lang, "heures", "hours")))
                .unwrap_or_default(),
        ),
        (
            tr(lang, "Public concerné", "Target audience"),
            f.target_audience.clone().unwrap_or_default(),
        ),
        (tr(lang, "Prérequis", "Prerequisites"), f.prerequisites.clone().unwrap_or_default()),
    ]);

    if let Some(objectives) = f.objectives.as_deref().filter(|o| !o.trim().is_empty()) {
        doc.heading(tr(lang, "Objectifs pédagogiques", "Learning objectives"));
        doc.paragraph(objectives);
    }

    doc.heading(tr(lang, "Contenu de la formation", "Training content"));
    program_outline(&mut doc, program);

    doc.spacer().paragraph(done_at(ctx));
    doc
}

pub fn terms(ctx: &SessionContext) -> DocumentContent {
    let lang = ctx.language;
    let org = &ctx.organization;
    let mut doc = DocumentContent::new(
        tr(lang, "CONDITIONS GÉNÉRALES DE VENTE", "GENERAL TERMS AND CONDITIONS"),
        issuer_line(org),
    );

    let articles: [(&str, &str, &str, &str); 5] = [
        (
            "Article 1 - Objet",
            "Les présentes conditions s'appliquent à toutes les formations proposées par l'organisme.",
            "Article 1 - Scope",
            "These terms apply to every training offered by the organization.",
        ),
        (
            "Article 2 - Inscription",
            "Toute inscription est ferme à réception du contrat ou de la convention signé.",
            "Article 2 - Registration",
            "A registration is final once the signed contract or agreement is received.",
        ),
        (
            "Article 3 - Prix",
            "Les prix sont indiqués dans la devise de l'organisme et s'entendent nets de taxes sauf mention contraire.",
            "Article 3 - Prices",
            "Prices are stated in the organization's currency and are net of taxes unless stated otherwise.",
        ),
        (
            "Article 4 - Modalités de paiement",
            "Le règlement est dû selon l'échéancier prévu au contrat. Les paiements partiels sont acceptés.",
            "Article 4 - Payment",
            "Payment is due according to the schedule in the contract. Partial payments are accepted.",
        ),
        (
            "Article 5 - Annulation",
            "Toute annulation doit être notifiée par écrit. Une formation commencée est due en totalité.",
            "Article 5 - Cancellation",
            "Any cancellation must be notified in writing. A training that has started is due in full.",
        ),
    ];

    for (fr_title, fr_body, en_title, en_body) in articles {
        doc.heading(tr(lang, fr_title, en_title));
        doc.paragraph(tr(lang, fr_body, en_body));
    }

    doc.spacer().paragraph(done_at(ctx));
    doc
}

pub fn privacy_policy(ctx: &SessionContext) -> DocumentContent {
    let lang = ctx.language;
    let org = &ctx.organization;
    let mut doc = DocumentContent::new(
        tr(lang, "POLITIQUE DE CONFIDENTIALITÉ", "PRIVACY POLICY"),
        issuer_line(org),
    );

    doc.heading(tr(lang, "Responsable du traitement", "Data controller"));
    doc.fields([
        (tr(lang, "Organisme", "Organization"), org.name.clone()),
        (tr(lang, "Contact", "Contact"), org.email.clone().unwrap_or_default()),
    ]);

    doc.heading(tr(lang, "Données collectées", "Data collected"));
    doc.bullets([
        tr(lang, "Identité : nom, prénom, date de naissance", "Identity: name, date of birth"),
        tr(lang, "Coordonnées : email, téléphone, adresse", "Contact details: email, phone, address"),
        tr(
            lang,
            "Suivi pédagogique : présences, évaluations, progression",
            "Training records: attendance, assessments, progress",
        ),
        tr(lang, "Données de facturation", "Billing data"),
    ]);

    doc.heading(tr(lang, "Finalités", "Purposes"));
    doc.paragraph(tr(
        lang,
        "Les données sont utilisées pour la gestion administrative, pédagogique et financière des formations.",
        "Data is used for the administrative, educational and financial management of trainings.",
    ));

    doc.heading(tr(lang, "Vos droits", "Your rights"));
    doc.paragraph(tr(
        lang,
        "Vous disposez d'un droit d'accès, de rectification et d'effacement de vos données en contactant l'organisme.",
        "You may access, correct or erase your data by contacting the organization.",
    ));

    doc.spacer().paragraph(done_at(ctx));
    doc
}

pub fn session_report(ctx: &SessionContext, report: &SessionReport) -> DocumentContent {
    let lang = ctx.language;
    let currency = &ctx.session.currency;
    let mut doc = DocumentContent::new(
        tr(lang, "RAPPORT DE SESSION", "SESSION REPORT"),
        issuer_line(&ctx.organization),
    )
    .subtitle(ctx.session.name.clone());

    formation_fields(&mut doc, ctx);

    doc.heading(tr(lang, "Inscriptions", "Enrollments"));
    doc.fields([
        (tr(lang, "Total", "Total"), report.enrollments.total.to_string()),
        (tr(lang, "Actives", "Active"), report.enrollments.active.to_string()),
        (tr(lang, "Terminées", "Completed"), report.enrollments.completed.to_string()),
    ]);

    doc.heading(tr(lang, "Résultats", "Results"));
    doc.fields([
        (
            tr(lang, "Taux de présence", "Attendance rate"),
            format!("{} %", report.attendance_rate),
        ),
        (
            tr(lang, "Moyenne générale", "Average grade"),
            report
                .average_grade
                .map(|g| format!("{g:.2} / 20"))
                .unwrap_or_default(),
        ),
    ]);

    doc.heading(tr(lang, "Finances", "Finances"));
    doc.fields([
        (
            tr(lang, "Chiffre d'affaires", "Revenue"),
            format_amount(report.finances.total_revenue, currency, lang),
        ),
        (
            tr(lang, "Encaissé", "Collected"),
            format_amount(report.finances.paid_amount, currency, lang),
        ),
        (
            tr(lang, "Reste à encaisser", "Outstanding"),
            format_amount(report.finances.remaining, currency, lang),
        ),
    ]);

    if !report.students.is_empty() {
        doc.heading(tr(lang, "Stagiaires", "Learners"));
        doc.bullets(report.students.iter().map(|row| {
            let grade = row
                .average_grade
                .map(|g| format!("{g:.1}/20"))
                .unwrap_or_else(|| "-".to_string());
            format!(
                "{} {} | {} {} % | {} {} | {} {} / {}",
                row.last_name,
                row.first_name,
                tr(lang, "présence", "attendance"),
                row.attendance_rate,
                tr(lang, "moyenne", "average"),
                grade,
                tr(lang, "payé", "paid"),
                format_amount(row.paid_amount, currency, lang),
                format_amount(row.total_amount, currency, lang),
            )
        }));
    }

    doc.spacer().paragraph(done_at(ctx));
    doc
}

pub fn attendance_certificate(ctx: &SessionContext, learner: &LearnerContext) -> DocumentContent {
    let lang = ctx.language;
    let org = &ctx.organization;
    let mut doc = DocumentContent::new(
        tr(lang, "ATTESTATION DE FORMATION", "CERTIFICATE OF ATTENDANCE"),
        issuer_line(org),
    );

    let signatory = org
        .director_name
        .clone()
        .unwrap_or_else(|| org.name.clone());
    doc.paragraph(format!(
        "{} {}, {} {}, {}",
        tr(lang, "Je soussigné(e)", "I, the undersigned,"),
        signatory,
        tr(lang, "représentant", "representing"),
        org.name,
        tr(lang, "atteste que", "certify that"),
    ));
    doc.paragraph(learner.full_name());
    doc.paragraph(tr(
        lang,
        "a suivi l'action de formation suivante :",
        "attended the following training:",
    ));
    formation_fields(&mut doc, ctx);

    if let Some(rate) = learner.attendance_rate {
        doc.fields([(tr(lang, "Assiduité", "Attendance"), format!("{rate} %"))]);
    }

    doc.spacer().paragraph(done_at(ctx));
    doc.signatures([tr(lang, "Signature et cachet", "Signature and stamp")]);
    doc
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{NaiveDate, NaiveTime, Utc};
    use trainhub_models::enrollments::{EnrollmentStatus, PaymentStatus};
    use trainhub_models::sessions::SessionStatus;
    use trainhub_models::students::StudentStatus;
    use trainhub_models::value_types::Email;
    use trainhub_models::{
        EnrollmentId, FormationId, OrganizationId, SessionId, StudentId,
    };

    use super::*;

    pub fn session_context(language: Language) -> SessionContext {
        let organization_id = OrganizationId::new();
        let formation_id = FormationId::new();

        SessionContext {
            language,
            organization: Organization {
                id: organization_id,
                name: "Centre Formation Plus".to_string(),
                address: Some("12 rue des Jardins".to_string()),
                city: Some("Abidjan".to_string()),
                phone: Some("+225 27 22 00 00".to_string()),
                email: Some("contact@formationplus.ci".to_string()),
                siret: None,
                vat_number: None,
                director_name: Some("Fatou Diallo".to_string()),
                currency: "XOF".to_string(),
                logo_url: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            session: Session {
                id: SessionId::new(),
                organization_id,
                formation_id,
                name: "Excel avancé - mars".to_string(),
                code: Some("XL-03".to_string()),
                start_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2025, 3, 12).unwrap(),
                start_time: NaiveTime::from_hms_opt(9, 0, 0),
                end_time: NaiveTime::from_hms_opt(17, 0, 0),
                location: Some("Salle B".to_string()),
                capacity_max: Some(12),
                teacher_id: None,
                manager1_id: None,
                manager2_id: None,
                inter_entreprise: false,
                sous_traitance: false,
                timezone: "Africa/Abidjan".to_string(),
                price: Some(250000.0),
                currency: "XOF".to_string(),
                status: SessionStatus::Planned,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            formation: Formation {
                id: formation_id,
                organization_id,
                name: "Excel avancé".to_string(),
                code: Some("XL".to_string()),
                description: None,
                duration_hours: Some(21),
                price: 250000.0,
                currency: "XOF".to_string(),
                objectives: Some("Maîtriser les tableaux croisés dynamiques".to_string()),
                prerequisites: None,
                target_audience: None,
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            programs: Vec::new(),
            trainer_name: Some("Koffi Mensah".to_string()),
            learner_count: 8,
            issue_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        }
    }

    pub fn learner(ctx: &SessionContext) -> LearnerContext {
        let student_id = StudentId::new();
        LearnerContext {
            student: Student {
                id: student_id,
                organization_id: ctx.organization.id,
                first_name: "Awa".to_string(),
                last_name: "Koné".to_string(),
                email: Some(Email::new_unchecked("awa.kone@example.com")),
                phone: None,
                address: None,
                date_of_birth: None,
                student_number: None,
                company_name: None,
                status: StudentStatus::Active,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            enrollment: Enrollment {
                id: EnrollmentId::new(),
                organization_id: ctx.organization.id,
                session_id: ctx.session.id,
                student_id,
                enrollment_date: NaiveDate::from_ymd_opt(2025, 2, 20).unwrap(),
                status: EnrollmentStatus::Confirmed,
                payment_status: PaymentStatus::Partial,
                total_amount: 250000.0,
                paid_amount: 100000.0,
                notes: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            attendance_rate: Some(92),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(150000.0, "XOF", Language::Fr), "150 000 XOF");
        assert_eq!(format_amount(1234.5, "EUR", Language::Fr), "1 234,50 EUR");
        assert_eq!(format_amount(1234.5, "EUR", Language::En), "1,234.50 EUR");
        assert_eq!(format_amount(0.0, "XOF", Language::Fr), "0 XOF");
        assert_eq!(format_amount(999.0, "XOF", Language::Fr), "999 XOF");
    }

    #[test]
    fn test_convocation_names_learner_and_session() {
        let ctx = fixtures::session_context(Language::Fr);
        let learner = fixtures::learner(&ctx);

        let html = convocation(&ctx, &learner).to_html();
        assert!(html.contains("CONVOCATION À UNE FORMATION"));
        assert!(html.contains("Awa Koné"));
        assert!(html.contains("Excel avancé"));
    }

    #[test]
    fn test_documents_follow_language() {
        let ctx = fixtures::session_context(Language::En);
        let learner = fixtures::learner(&ctx);

        assert!(contract(&ctx, &learner).to_html().contains("Awa Koné"));
        assert!(attendance_certificate(&ctx, &learner).to_html().contains("92 %"));
        assert!(convention(&ctx).to_html().contains("Centre Formation Plus"));
    }

    #[test]
    fn test_format_date_by_language() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        assert_eq!(format_date(date, Language::Fr), "04/03/2025");
        assert_eq!(format_date(date, Language::En), "03/04/2025");
    }
}
