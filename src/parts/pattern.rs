use crate::error::{Error, Result};
use regex::Regex;

/// Compiled part-name pattern
///
/// The pattern is a glob over a single file name: `*` matches any run of
/// characters, `?` matches exactly one, everything else is literal. It must
/// match the whole name.
#[derive(Clone, Debug)]
pub struct PartPattern {
    glob: String,
    regex: Regex,
}

impl PartPattern {
    /// Compile a glob such as `archive.zip.*`
    pub fn new(glob: &str) -> Result<Self> {
        let mut expr = String::with_capacity(glob.len() + 8);
        expr.push('^');
        for ch in glob.chars() {
            match ch {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                other => expr.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| Error::Config {
            message: format!("invalid part pattern '{}': {}", glob, e),
            key: Some("part_pattern".to_string()),
        })?;

        Ok(Self {
            glob: glob.to_string(),
            regex,
        })
    }

    /// Whether `name` matches the pattern
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// The glob this pattern was compiled from
    pub fn as_str(&self) -> &str {
        &self.glob
    }
}
