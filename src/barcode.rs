//! Plate identifiers derived from image file names.
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the barcode is cut out of a file stem.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum BarcodeRule {
    /// Drop a trailing `<sep>YYYY-MM-DD...` capture timestamp.
    #[default]
    StripTimestamp,
    /// Keep the first `len` characters.
    Prefix { len: usize },
    /// Use the whole stem.
    Stem,
}

impl BarcodeRule {
    pub fn apply(&self, stem: &str) -> String {
        match self {
            BarcodeRule::StripTimestamp => strip_timestamp(stem).to_string(),
            BarcodeRule::Prefix { len } => stem.chars().take(*len).collect(),
            BarcodeRule::Stem => stem.to_string(),
        }
    }
}

/// Labels attached to every record of one image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SampleLabel {
    pub barcode: String,
    pub filename: String,
}

impl SampleLabel {
    pub fn from_path(path: &Path, rule: &BarcodeRule) -> Self {
        let filename = file_stem(path);
        Self {
            barcode: rule.apply(&filename),
            filename,
        }
    }
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Cut at the first non-digit that is followed by `digits-digits-digits`.
fn strip_timestamp(stem: &str) -> &str {
    for (pos, c) in stem.char_indices() {
        if c.is_ascii_digit() {
            continue;
        }
        if starts_with_date(&stem[pos + c.len_utf8()..]) {
            return &stem[..pos];
        }
    }
    stem
}

fn starts_with_date(s: &str) -> bool {
    let mut rest = s;
    for group in 0..3 {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            return false;
        }
        rest = &rest[digits..];
        if group < 2 {
            match rest.strip_prefix('-') {
                Some(r) => rest = r,
                None => return false,
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_suffix_is_removed() {
        let rule = BarcodeRule::StripTimestamp;
        assert_eq!(
            rule.apply("K000343_027_001_2017-09-23_13-00-00"),
            "K000343_027_001"
        );
        assert_eq!(rule.apply("plateA-2020-1-5"), "plateA");
        assert_eq!(rule.apply("no_date_here"), "no_date_here");
        assert_eq!(rule.apply("12-34"), "12-34");
    }

    #[test]
    fn prefix_and_stem_rules() {
        assert_eq!(
            BarcodeRule::Prefix { len: 15 }.apply("K000343_027_001_2017-09-23"),
            "K000343_027_001"
        );
        assert_eq!(BarcodeRule::Prefix { len: 40 }.apply("short"), "short");
        assert_eq!(BarcodeRule::Stem.apply("abc_2017-09-23"), "abc_2017-09-23");
    }

    #[test]
    fn label_uses_the_stem() {
        let label = SampleLabel::from_path(
            Path::new("/data/P1_2019-01-02_10-00-00.jpg"),
            &BarcodeRule::default(),
        );
        assert_eq!(label.filename, "P1_2019-01-02_10-00-00");
        assert_eq!(label.barcode, "P1");
    }

    #[test]
    fn rule_is_tagged_in_json() {
        let rule: BarcodeRule = serde_json::from_str(r#"{ "rule": "prefix", "len": 15 }"#).unwrap();
        assert_eq!(rule, BarcodeRule::Prefix { len: 15 });
    }
}
