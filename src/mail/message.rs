use std::io::Write;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::mail::encoding::{encode_header_text, encode_quoted_printable};
use crate::mail::{Address, BuildError, Headers};

pub const TEXT_PLAIN: &str = r#"text/plain; charset="utf-8""#;
pub const TEXT_HTML: &str = r#"text/html; charset="utf-8""#;

/// One body entity: its own headers plus already transfer-encoded bytes.
#[derive(Debug, Clone)]
pub struct Part {
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Part {
    pub fn new(content_type: &str, transfer_encoding: &str, body: Vec<u8>) -> Self {
        let mut headers = Headers::new();
        headers.set("Content-Type", content_type);
        headers.set("Content-Transfer-Encoding", transfer_encoding);
        Self { headers, body }
    }
}

/// An outgoing message. Built, serialized once, then dropped.
#[derive(Debug, Clone)]
pub struct Message {
    headers: Headers,
    parts: Vec<Part>,
}

impl Message {
    pub fn new(from: &Address, subject: &str, to: &[Address]) -> Self {
        let mut headers = Headers::new();
        headers.set("From", from.to_string());
        headers.set(
            "To",
            to.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        );
        headers.set("Subject", encode_header_text(subject));
        Self {
            headers,
            parts: Vec::new(),
        }
    }

    pub fn set_date(&mut self, date: DateTime<Utc>) {
        self.headers.set("Date", date.to_rfc2822());
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn add_part(&mut self, part: Part) {
        self.parts.push(part);
    }

    pub fn add_quoted_printable(&mut self, content_type: &str, body: &[u8]) {
        let encoded = encode_quoted_printable(body);
        self.add_part(Part::new(content_type, "quoted-printable", encoded.into_bytes()));
    }

    pub fn add_plain(&mut self, text: &str) {
        self.add_quoted_printable(TEXT_PLAIN, text.as_bytes());
    }

    pub fn add_html(&mut self, html: &str) {
        self.add_quoted_printable(TEXT_HTML, html.as_bytes());
    }

    /// Serializes the message with CRLF header lines.
    ///
    /// A single part is flattened into the top-level entity. Several parts
    /// become a `multipart/mixed` body in insertion order.
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), BuildError> {
        let mut headers = self.headers.clone();
        headers.set("MIME-Version", "1.0");

        match self.parts.as_slice() {
            [] => Err(BuildError::NoParts),
            [part] => {
                headers.merge(&part.headers);
                if !headers.contains("Content-Type") {
                    headers.set("Content-Type", TEXT_PLAIN);
                }
                headers.write_to(w)?;
                w.write_all(&part.body)?;
                Ok(())
            }
            parts => {
                let boundary = format!("vmail-{}", Uuid::new_v4().simple());
                headers.set(
                    "Content-Type",
                    format!("multipart/mixed; boundary=\"{}\"", boundary),
                );
                headers.write_to(w)?;

                for part in parts {
                    write!(w, "--{}\r\n", boundary)?;
                    part.headers.write_to(w)?;
                    w.write_all(&part.body)?;
                    w.write_all(b"\r\n")?;
                }
                write!(w, "--{}--\r\n", boundary)?;
                Ok(())
            }
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, BuildError> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use mail_parser::{MessageParser, MimeHeaders};

    use super::*;

    fn addresses() -> (Address, Vec<Address>) {
        let from = Address::parse_dest(r#""From" <from@localhost>"#).unwrap();
        let to = vec![
            Address::parse_dest("to@localhost").unwrap(),
            Address::parse_dest("Other <to@localhost>").unwrap(),
        ];
        (from, to)
    }

    fn header_line<'a>(raw: &'a str, name: &str) -> Option<&'a str> {
        let prefix = format!("{}: ", name);
        raw.split("\r\n\r\n")
            .next()?
            .split("\r\n")
            .find_map(|line| line.strip_prefix(prefix.as_str()))
    }

    #[test]
    fn test_single_part_round_trip() {
        let (from, to) = addresses();
        let mut msg = Message::new(&from, "test subject", &to);
        msg.add_plain("test body with Ümlötß\n");

        let bytes = msg.to_bytes().unwrap();
        let raw = String::from_utf8(bytes.clone()).unwrap();

        assert_eq!(header_line(&raw, "From"), Some(r#""From" <from@localhost>"#));
        assert_eq!(
            header_line(&raw, "To"),
            Some(r#"to@localhost, "Other" <to@localhost>"#)
        );
        assert_eq!(header_line(&raw, "Subject"), Some("test subject"));
        assert_eq!(header_line(&raw, "MIME-Version"), Some("1.0"));
        assert_eq!(
            header_line(&raw, "Content-Type"),
            Some(r#"text/plain; charset="utf-8""#)
        );
        assert_eq!(
            header_line(&raw, "Content-Transfer-Encoding"),
            Some("quoted-printable")
        );

        let (_, body) = raw.split_once("\r\n\r\n").unwrap();
        assert_eq!(body, "test body with =C3=9Cml=C3=B6t=C3=9F\r\n");

        let parsed = MessageParser::default().parse(&bytes).unwrap();
        assert_eq!(parsed.subject(), Some("test subject"));
        let ct = parsed.content_type().unwrap();
        assert_eq!(ct.ctype(), "text");
        assert_eq!(ct.subtype(), Some("plain"));
        assert_eq!(ct.attribute("charset"), Some("utf-8"));
        assert_eq!(
            parsed.body_text(0).as_deref().map(str::trim_end),
            Some("test body with Ümlötß")
        );
    }

    #[test]
    fn test_non_ascii_subject_is_encoded_word() {
        let (from, to) = addresses();
        let mut msg = Message::new(&from, "Grüße", &to);
        msg.add_plain("x");

        let bytes = msg.to_bytes().unwrap();
        let raw = String::from_utf8(bytes.clone()).unwrap();
        let subject = header_line(&raw, "Subject").unwrap();
        assert!(subject.starts_with("=?utf-8?q?"));

        let parsed = MessageParser::default().parse(&bytes).unwrap();
        assert_eq!(parsed.subject(), Some("Grüße"));
    }

    #[test]
    fn test_long_subject_folds_and_decodes() {
        let (from, to) = addresses();
        let subject = "Ünïcödé ".repeat(12).trim_end().to_string();
        let mut msg = Message::new(&from, &subject, &to);
        msg.add_plain("x");

        let bytes = msg.to_bytes().unwrap();
        let parsed = MessageParser::default().parse(&bytes).unwrap();
        assert_eq!(parsed.subject(), Some(subject.as_str()));
    }

    #[test]
    fn test_no_parts_is_an_error() {
        let (from, to) = addresses();
        let msg = Message::new(&from, "empty", &to);
        assert!(matches!(msg.to_bytes(), Err(BuildError::NoParts)));
    }

    #[test]
    fn test_default_content_type_for_bare_part() {
        let (from, to) = addresses();
        let mut msg = Message::new(&from, "bare", &to);
        let mut part = Part::new(TEXT_HTML, "7bit", b"hello".to_vec());
        part.headers = Headers::new();
        msg.add_part(part);

        let raw = String::from_utf8(msg.to_bytes().unwrap()).unwrap();
        assert_eq!(header_line(&raw, "Content-Type"), Some(TEXT_PLAIN));
        assert!(raw.ends_with("\r\n\r\nhello"));
    }

    #[test]
    fn test_date_header() {
        let (from, to) = addresses();
        let mut msg = Message::new(&from, "dated", &to);
        msg.set_date(Utc.with_ymd_and_hms(2013, 3, 1, 12, 30, 0).unwrap());
        msg.add_html("<p>hi</p>");

        let raw = String::from_utf8(msg.to_bytes().unwrap()).unwrap();
        let date = header_line(&raw, "Date").unwrap();
        assert_eq!(
            DateTime::parse_from_rfc2822(date).unwrap(),
            Utc.with_ymd_and_hms(2013, 3, 1, 12, 30, 0).unwrap()
        );
        assert_eq!(header_line(&raw, "Content-Type"), Some(TEXT_HTML));
    }

    #[test]
    fn test_multipart_mixed() {
        let (from, to) = addresses();
        let mut msg = Message::new(&from, "two parts", &to);
        msg.add_plain("plain body\n");
        msg.add_html("<p>html body</p>\n");

        let bytes = msg.to_bytes().unwrap();
        let raw = String::from_utf8(bytes.clone()).unwrap();
        let ct = header_line(&raw, "Content-Type").unwrap();
        assert!(ct.starts_with("multipart/mixed; boundary="));
        assert!(header_line(&raw, "Content-Transfer-Encoding").is_none());

        let parsed = MessageParser::default().parse(&bytes).unwrap();
        assert_eq!(parsed.parts.len(), 3);
        assert_eq!(
            parsed.parts[1].text_contents().map(str::trim_end),
            Some("plain body")
        );
        assert_eq!(
            parsed.parts[2].text_contents().map(str::trim_end),
            Some("<p>html body</p>")
        );
    }
}
