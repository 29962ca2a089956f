use crate::metadata::{Field, FieldValue, MetadataRecord};
use thiserror::Error;

pub const DEFAULT_TEMPLATE: &str = "{YYYY}-{MM}-{DD}_{hh}-{mm}-{ss}_{Height}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Literal(String),
    Token(Field),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("format string is empty")]
    Empty,
    #[error("unbalanced braces in format string")]
    UnbalancedBraces,
    #[error("unknown tag in format string: {{{0}}}")]
    UnknownToken(String),
}

/// A parsed format string. Parsing happens once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    parts: Vec<TemplatePart>,
}

impl Template {
    pub fn parse(input: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            source: input.to_string(),
            parts: parse_template(input)?,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn parts(&self) -> &[TemplatePart] {
        &self.parts
    }

    pub fn has_sequence(&self) -> bool {
        self.parts
            .iter()
            .any(|part| matches!(part, TemplatePart::Token(Field::Sequence)))
    }

    pub fn render(&self, record: &MetadataRecord) -> String {
        render_template(&self.parts, record)
    }
}

pub fn validate_template(input: &str) -> Result<(), TemplateError> {
    parse_template(input).map(|_| ())
}

pub fn parse_template(input: &str) -> Result<Vec<TemplatePart>, TemplateError> {
    if input.is_empty() {
        return Err(TemplateError::Empty);
    }

    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '{' => {
                if !literal.is_empty() {
                    parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
                }
                let mut token = String::new();
                let mut found_close = false;
                for next in chars.by_ref() {
                    if next == '}' {
                        found_close = true;
                        break;
                    }
                    if next == '{' {
                        return Err(TemplateError::UnbalancedBraces);
                    }
                    token.push(next);
                }
                if !found_close || token.is_empty() {
                    return Err(TemplateError::UnbalancedBraces);
                }
                parts.push(TemplatePart::Token(parse_token(&token)?));
            }
            '}' => return Err(TemplateError::UnbalancedBraces),
            _ => literal.push(ch),
        }
    }

    if !literal.is_empty() {
        parts.push(TemplatePart::Literal(literal));
    }

    Ok(parts)
}

pub fn render_template(parts: &[TemplatePart], record: &MetadataRecord) -> String {
    let mut output = String::new();
    for part in parts {
        match part {
            TemplatePart::Literal(s) => output.push_str(s),
            TemplatePart::Token(field) => {
                if let Some(value) = record.get(*field) {
                    output.push_str(&format_value(*field, value, record.sequence_width()));
                }
            }
        }
    }
    output
}

fn parse_token(token: &str) -> Result<Field, TemplateError> {
    match token {
        "YYYY" => Ok(Field::Year),
        "MM" => Ok(Field::Month),
        "DD" => Ok(Field::Day),
        "hh" => Ok(Field::Hour),
        "mm" => Ok(Field::Minute),
        "ss" => Ok(Field::Second),
        "Seq" => Ok(Field::Sequence),
        "Artist" => Ok(Field::Artist),
        "Make" => Ok(Field::Make),
        "Model" => Ok(Field::Model),
        "Height" => Ok(Field::Height),
        "Folder" => Ok(Field::Folder),
        other => Err(TemplateError::UnknownToken(other.to_string())),
    }
}

fn format_value(field: Field, value: &FieldValue, sequence_width: usize) -> String {
    match (field, value) {
        (Field::Year, FieldValue::Int(n)) => format!("{:04}", n),
        (
            Field::Month | Field::Day | Field::Hour | Field::Minute | Field::Second,
            FieldValue::Int(n),
        ) => format!("{:02}", n),
        (Field::Sequence, FieldValue::Int(n)) => format!("{:0width$}", n, width = sequence_width),
        (Field::Height, FieldValue::Int(n)) => format!("{}px", n),
        (_, FieldValue::Int(n)) => n.to_string(),
        (_, FieldValue::Text(s)) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{MetadataSource, PartialMetadata};
    use chrono::NaiveDate;

    fn record() -> MetadataRecord {
        let date = NaiveDate::from_ymd_opt(2014, 5, 9)
            .and_then(|d| d.and_hms_opt(8, 3, 7))
            .expect("valid date");
        MetadataRecord::build(
            PartialMetadata {
                source: Some(MetadataSource::Exif),
                date: Some(date),
                make: Some("PENTAX".to_string()),
                model: Some("PENTAX K-x".to_string()),
                height: Some(3008),
                ..PartialMetadata::default()
            },
            date,
            "Wedding_Shoot",
        )
    }

    #[test]
    fn parse_template_ok() {
        let parsed = parse_template("{YYYY}-{MM}-{DD}-{Folder}-{Seq}").expect("must parse");
        assert_eq!(parsed.len(), 9);
        assert_eq!(parsed[0], TemplatePart::Token(Field::Year));
        assert_eq!(parsed[1], TemplatePart::Literal("-".to_string()));
    }

    #[test]
    fn parse_template_invalid_unknown() {
        let err = parse_template("{YYYY}_{Bogus}").expect_err("must fail");
        assert_eq!(err, TemplateError::UnknownToken("Bogus".to_string()));
    }

    #[test]
    fn parse_template_tokens_are_case_sensitive() {
        assert!(matches!(
            parse_template("{yyyy}"),
            Err(TemplateError::UnknownToken(_))
        ));
        assert_eq!(
            parse_template("{mm}").expect("must parse"),
            vec![TemplatePart::Token(Field::Minute)]
        );
    }

    #[test]
    fn parse_template_invalid_brace() {
        assert_eq!(parse_template("{YYYY"), Err(TemplateError::UnbalancedBraces));
        assert_eq!(parse_template("YYYY}"), Err(TemplateError::UnbalancedBraces));
        assert_eq!(parse_template("{}"), Err(TemplateError::UnbalancedBraces));
        assert_eq!(parse_template(""), Err(TemplateError::Empty));
    }

    #[test]
    fn render_default_template_pads_fields() {
        let template = Template::parse(DEFAULT_TEMPLATE).expect("must parse");
        assert_eq!(template.render(&record()), "2014-05-09_08-03-07_3008px");
        assert!(!template.has_sequence());
    }

    #[test]
    fn render_sequence_uses_record_width() {
        let template = Template::parse("{YYYY}-{MM}-{DD}-{Folder}-{Seq}").expect("must parse");
        assert!(template.has_sequence());
        let rendered = template.render(&record().with_sequence(2, 3));
        assert_eq!(rendered, "2014-05-09-Wedding_Shoot-002");
    }

    #[test]
    fn render_copies_model_verbatim_and_blanks_missing_artist() {
        let template = Template::parse("{YYYY}{DD}{MM}_{Model}_{Artist}_Beach").expect("must parse");
        assert_eq!(template.render(&record()), "20140905_PENTAX K-x__Beach");
    }

    #[test]
    fn render_is_deterministic() {
        let template = Template::parse("{YYYY}{MM}{DD}{hh}{mm}{ss}_{Make}").expect("must parse");
        let r = record();
        assert_eq!(template.render(&r), template.render(&r));
    }
}
