use regex::Regex;

use crate::license::catalog::{Signature, CATALOG};

/// Confidence a catalog license must reach before it is reported.
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// One license found in a piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleMatch {
    pub name: String,
    pub confidence: f64,
    pub offset: usize,
    pub extent: usize,
}

/// Identifies licenses in text. Implementations must be pure: the same text
/// always yields the same matches, ordered by offset.
pub trait LicenseOracle: Send + Sync {
    fn matches(&self, text: &str) -> Vec<OracleMatch>;
}

struct CompiledLicense {
    name: &'static str,
    /// Each element is satisfied by any one of its alternatives.
    elements: Vec<Vec<Regex>>,
    excludes: Vec<Regex>,
}

/// Matches license texts by their signature phrases.
///
/// Phrases tolerate re-wrapping, punctuation and comment gutters between
/// words. Confidence is the fraction of a license's signature elements found
/// in the text. `SPDX-License-Identifier` tags are reported verbatim with
/// full confidence.
pub struct PhraseOracle {
    licenses: Vec<CompiledLicense>,
    spdx_tag: Regex,
    threshold: f64,
}

impl PhraseOracle {
    pub fn new() -> Result<Self, regex::Error> {
        Self::with_threshold(DEFAULT_THRESHOLD)
    }

    pub fn with_threshold(threshold: f64) -> Result<Self, regex::Error> {
        let licenses = CATALOG
            .iter()
            .map(compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            licenses,
            spdx_tag: Regex::new(r"(?i)spdx-license-identifier:[ \t]*([A-Za-z0-9.+() \-]+)")?,
            threshold,
        })
    }
}

impl LicenseOracle for PhraseOracle {
    fn matches(&self, text: &str) -> Vec<OracleMatch> {
        let mut found = Vec::new();

        for caps in self.spdx_tag.captures_iter(text) {
            let (Some(whole), Some(expr)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let name = expr.as_str().trim().trim_end_matches('-').trim();
            if name.is_empty() {
                continue;
            }
            found.push(OracleMatch {
                name: name.to_string(),
                confidence: 1.0,
                offset: whole.start(),
                extent: whole.len(),
            });
        }

        for license in &self.licenses {
            if license.excludes.iter().any(|re| re.is_match(text)) {
                continue;
            }

            let hits: Vec<(usize, usize)> = license
                .elements
                .iter()
                .filter_map(|alternatives| {
                    alternatives
                        .iter()
                        .filter_map(|re| re.find(text))
                        .map(|m| (m.start(), m.end()))
                        .min()
                })
                .collect();

            let confidence = hits.len() as f64 / license.elements.len() as f64;
            if hits.is_empty() || confidence < self.threshold {
                continue;
            }

            let start = hits.iter().map(|h| h.0).min().unwrap_or(0);
            let end = hits.iter().map(|h| h.1).max().unwrap_or(start);
            found.push(OracleMatch {
                name: license.name.to_string(),
                confidence,
                offset: start,
                extent: end - start,
            });
        }

        found.sort_by(|a, b| a.offset.cmp(&b.offset).then_with(|| a.name.cmp(&b.name)));
        found
    }
}

fn compile(sig: &Signature) -> Result<CompiledLicense, regex::Error> {
    let elements = sig
        .elements
        .iter()
        .map(|alts| alts.iter().map(|p| phrase_regex(p)).collect::<Result<Vec<_>, _>>())
        .collect::<Result<Vec<Vec<_>>, _>>()?;
    let excludes = sig
        .excludes
        .iter()
        .map(|p| phrase_regex(p))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CompiledLicense {
        name: sig.name,
        elements,
        excludes,
    })
}

/// Case-insensitive regex for `phrase` that accepts any run of
/// non-alphanumeric characters between words.
fn phrase_regex(phrase: &str) -> Result<Regex, regex::Error> {
    let words: Vec<String> = phrase
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .map(regex::escape)
        .collect();
    Regex::new(&format!(r"(?i){}", words.join(r"[^\p{L}\p{N}]+")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::fixtures::{APACHE_NOTICE, GPL_3_NOTICE, MIT};

    const BSD_2: &str = "Redistribution and use in source and binary forms, with or without
modification, are permitted provided that the following conditions are met:

1. Redistributions of source code must retain the above copyright notice, this
   list of conditions and the following disclaimer.
2. Redistributions in binary form must reproduce the above copyright notice,
   this list of conditions and the following disclaimer in the documentation
   and/or other materials provided with the distribution.

THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS \"AS IS\"
AND ANY EXPRESS OR IMPLIED WARRANTIES ARE DISCLAIMED.
";

    const BSD_3_EXTRA: &str = "
3. Neither the name of the copyright holder nor the names of its
   contributors may be used to endorse or promote products derived from
   this software without specific prior written permission.
";

    fn names(text: &str) -> Vec<String> {
        PhraseOracle::new()
            .unwrap()
            .matches(text)
            .into_iter()
            .map(|m| m.name)
            .collect()
    }

    #[test]
    fn test_mit() {
        let found = PhraseOracle::new().unwrap().matches(MIT);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "MIT");
        assert_eq!(found[0].confidence, 1.0);
        assert!(found[0].offset > 0);
        assert!(found[0].offset + found[0].extent <= MIT.len());
    }

    #[test]
    fn test_apache_notice() {
        assert_eq!(names(APACHE_NOTICE), vec!["Apache-2.0"]);
    }

    #[test]
    fn test_bsd_two_and_three_clause_are_distinct() {
        assert_eq!(names(BSD_2), vec!["BSD-2-Clause"]);
        let bsd3 = format!("{BSD_2}{BSD_3_EXTRA}");
        assert_eq!(names(&bsd3), vec!["BSD-3-Clause"]);
    }

    #[test]
    fn test_gpl_family_is_distinguished() {
        let lgpl21 = "This library is free software; you can redistribute it and/or
modify it under the terms of the GNU Lesser General Public
License as published by the Free Software Foundation; either
version 2.1 of the License, or (at your option) any later version.";
        let agpl_title = "GNU AFFERO GENERAL PUBLIC LICENSE
Version 3, 19 November 2007

Copyright (C) 2007 Free Software Foundation, Inc.";
        assert_eq!(names(GPL_3_NOTICE), vec!["GPL-3.0"]);
        assert_eq!(names(lgpl21), vec!["LGPL-2.1"]);
        assert_eq!(names(agpl_title), vec!["AGPL-3.0"]);
    }

    #[test]
    fn test_comment_gutter_is_tolerated() {
        let commented: String = MIT.lines().map(|l| format!(" * {l}\n")).collect();
        assert_eq!(names(&commented), vec!["MIT"]);
    }

    #[test]
    fn test_dual_license_ordered_by_offset() {
        let dual = format!("{MIT}\n---\n{APACHE_NOTICE}");
        assert_eq!(names(&dual), vec!["MIT", "Apache-2.0"]);
    }

    #[test]
    fn test_spdx_tag() {
        let found = PhraseOracle::new()
            .unwrap()
            .matches("// SPDX-License-Identifier: MIT OR Apache-2.0\n");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "MIT OR Apache-2.0");
        assert_eq!(found[0].offset, 3);
    }

    #[test]
    fn test_partial_signature_below_threshold() {
        let partial = "Permission is hereby granted, free of charge, to any person obtaining a copy";
        assert!(names(partial).is_empty());
        let lenient = PhraseOracle::with_threshold(0.3).unwrap();
        assert_eq!(lenient.matches(partial)[0].name, "MIT");
    }

    #[test]
    fn test_plain_prose_has_no_match() {
        assert!(names("This crate parses TOML files quickly.").is_empty());
    }
}
