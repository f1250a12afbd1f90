//! Format-neutral document structure.
//!
//! Every generated document is assembled as a [`DocumentContent`] and then
//! rendered either to HTML (email bodies, previews) or to PDF.

use std::fmt::Write;

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Section heading
    Heading(String),
    Paragraph(String),
    /// Label/value rows, rendered as a two-column table
    Fields(Vec<(String, String)>),
    Bullets(Vec<String>),
    /// One signature box per party, side by side
    Signatures(Vec<String>),
    Spacer,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentContent {
    pub title: String,
    pub subtitle: Option<String>,
    /// Issuer shown in the page header
    pub issuer: String,
    pub blocks: Vec<Block>,
}

impl DocumentContent {
    pub fn new(title: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            issuer: issuer.into(),
            blocks: Vec::new(),
        }
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn heading(&mut self, text: impl Into<String>) -> &mut Self {
        self.blocks.push(Block::Heading(text.into()));
        self
    }

    pub fn paragraph(&mut self, text: impl Into<String>) -> &mut Self {
        self.blocks.push(Block::Paragraph(text.into()));
        self
    }

    /// Adds label/value rows, dropping rows whose value is empty.
    pub fn fields<L, V>(&mut self, rows: impl IntoIterator<Item = (L, V)>) -> &mut Self
    where
        L: Into<String>,
        V: Into<String>,
    {
        let rows: Vec<(String, String)> = rows
            .into_iter()
            .map(|(l, v)| (l.into(), v.into()))
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();
        if !rows.is_empty() {
            self.blocks.push(Block::Fields(rows));
        }
        self
    }

    pub fn bullets<S: Into<String>>(&mut self, items: impl IntoIterator<Item = S>) -> &mut Self {
        let items: Vec<String> = items.into_iter().map(Into::into).collect();
        if !items.is_empty() {
            self.blocks.push(Block::Bullets(items));
        }
        self
    }

    pub fn signatures<S: Into<String>>(&mut self, parties: impl IntoIterator<Item = S>) -> &mut Self {
        self.blocks
            .push(Block::Signatures(parties.into_iter().map(Into::into).collect()));
        self
    }

    pub fn spacer(&mut self) -> &mut Self {
        self.blocks.push(Block::Spacer);
        self
    }

    pub fn to_html(&self) -> String {
        let mut html = String::with_capacity(4096);
        html.push_str(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\">\
             <style>body{font-family:Helvetica,Arial,sans-serif;font-size:11pt;color:#1a1a1a;max-width:760px;margin:24px auto}\
             h1{font-size:16pt;text-align:center;margin-bottom:4px}h2{font-size:12pt;margin:22px 0 8px}\
             .subtitle{text-align:center;color:#555}.issuer{font-weight:bold;margin-bottom:24px}\
             table{border-collapse:collapse;width:100%}td{padding:4px 6px;vertical-align:top}\
             td.label{font-weight:bold;width:35%}.signatures{display:flex;gap:24px;margin-top:32px}\
             .signatures div{flex:1;border-top:1px solid #999;padding-top:6px;min-height:80px}</style>",
        );
        let _ = write!(html, "<title>{}</title></head><body>", escape(&self.title));
        let _ = write!(html, "<div class=\"issuer\">{}</div>", escape(&self.issuer));
        let _ = write!(html, "<h1>{}</h1>", escape(&self.title));
        if let Some(subtitle) = &self.subtitle {
            let _ = write!(html, "<p class=\"subtitle\">{}</p>", escape(subtitle));
        }

        for block in &self.blocks {
            match block {
                Block::Heading(text) => {
                    let _ = write!(html, "<h2>{}</h2>", escape(text));
                }
                Block::Paragraph(text) => {
                    let _ = write!(html, "<p>{}</p>", escape(text).replace('\n', "<br>"));
                }
                Block::Fields(rows) => {
                    html.push_str("<table>");
                    for (label, value) in rows {
                        let _ = write!(
                            html,
                            "<tr><td class=\"label\">{}</td><td>{}</td></tr>",
                            escape(label),
                            escape(value)
                        );
                    }
                    html.push_str("</table>");
                }
                Block::Bullets(items) => {
                    html.push_str("<ul>");
                    for item in items {
                        let _ = write!(html, "<li>{}</li>", escape(item));
                    }
                    html.push_str("</ul>");
                }
                Block::Signatures(parties) => {
                    html.push_str("<div class=\"signatures\">");
                    for party in parties {
                        let _ = write!(html, "<div>{}</div>", escape(party));
                    }
                    html.push_str("</div>");
                }
                Block::Spacer => html.push_str("<br>"),
            }
        }

        html.push_str("</body></html>");
        html
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_field_values_are_dropped() {
        let mut doc = DocumentContent::new("Convocation", "Org");
        doc.fields([("Lieu", ""), ("Dates", "01/03/2025")]);
        assert_eq!(
            doc.blocks,
            vec![Block::Fields(vec![("Dates".into(), "01/03/2025".into())])]
        );

        doc.fields([("Lieu", "  ")]);
        assert_eq!(doc.blocks.len(), 1);
    }

    #[test]
    fn test_html_escapes_user_content() {
        let mut doc = DocumentContent::new("Contrat", "A & B <Formation>");
        doc.paragraph("line one\nline <two>");
        let html = doc.to_html();

        assert!(html.contains("A &amp; B &lt;Formation&gt;"));
        assert!(html.contains("line one<br>line &lt;two&gt;"));
        assert!(!html.contains("<Formation>"));
    }
}
