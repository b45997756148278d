use chrono::NaiveDate;

use crate::{
    model::auto_reply::{GeneratedReplies, SubstituteContact},
    utils::dates::format_date,
};

const SIGNATURE_SEPARATOR: &str = "────────────────────";

pub struct ReplyContext<'a> {
    pub user_name: &'a str,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub substitute: Option<&'a SubstituteContact>,
    pub signature: Option<&'a str>,
}

/// Renders the internal and external out-of-office texts.
///
/// Both audiences currently receive the same text.
pub fn generate_replies(ctx: &ReplyContext<'_>) -> GeneratedReplies {
    let body = render(ctx);
    GeneratedReplies {
        internal: body.clone(),
        external: body,
    }
}

fn render(ctx: &ReplyContext<'_>) -> String {
    let mut text = format!(
        "Guten Tag,\n\nvielen Dank für Ihre Nachricht.\n\nIch bin vom {} bis {} abwesend und habe in dieser Zeit keinen Zugriff auf meine E-Mails.",
        format_date(ctx.start_date),
        format_date(ctx.end_date)
    );

    match ctx.substitute.filter(|s| !s.email.trim().is_empty()) {
        Some(substitute) => {
            let name = if substitute.name.trim().is_empty() {
                "Vertretung"
            } else {
                substitute.name.trim()
            };
            text.push_str(&format!(
                "\n\nBei dringenden Angelegenheiten wenden Sie sich bitte an meine Vertretung:\n\n{}\nE-Mail: {}",
                name,
                substitute.email.trim()
            ));
            if let Some(phone) = substitute.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
                text.push_str(&format!("\nTel.: {phone}"));
            }
        }
        None => text.push_str("\n\nBei dringenden Angelegenheiten wenden Sie sich bitte an mein Team."),
    }

    text.push_str("\n\nIch werde Ihre E-Mail nach meiner Rückkehr bearbeiten.");
    text.push_str("\n\nMit freundlichen Grüßen\n");
    text.push_str(ctx.user_name);

    if let Some(signature) = ctx.signature.filter(|s| !s.trim().is_empty()) {
        text.push('\n');
        text.push_str(SIGNATURE_SEPARATOR);
        text.push('\n');
        text.push_str(signature);
    }

    text
}

/// Plain-text signature block from directory attributes.
pub fn user_signature(
    name: &str,
    email: &str,
    job_title: Option<&str>,
    department: Option<&str>,
    phone: Option<&str>,
) -> String {
    let mut signature = name.to_string();
    for line in [job_title, department].into_iter().flatten() {
        signature.push('\n');
        signature.push_str(line);
    }
    signature.push_str("\n\nE-Mail: ");
    signature.push_str(email);
    if let Some(phone) = phone {
        signature.push_str("\nTel.: ");
        signature.push_str(phone);
    }
    signature
}
