use crate::models::LicenseRisk;

/// Risk tier of a detected license name.
///
/// Names come either from the phrase catalog or verbatim from an
/// `SPDX-License-Identifier` tag, so SPDX expressions are handled too:
/// `OR` takes the most permissive side, `AND` the most restrictive, and a
/// `WITH` exception is evaluated as its base license.
pub fn classify(license: &str) -> LicenseRisk {
    let trimmed = license.trim().trim_start_matches('(').trim_end_matches(')');

    if trimmed.contains(" OR ") {
        return trimmed
            .split(" OR ")
            .map(classify)
            .min()
            .unwrap_or(LicenseRisk::Unknown);
    }

    if trimmed.contains(" AND ") {
        let risks: Vec<LicenseRisk> = trimmed.split(" AND ").map(classify).collect();
        if risks.contains(&LicenseRisk::Unknown) {
            return LicenseRisk::Unknown;
        }
        return risks.into_iter().max().unwrap_or(LicenseRisk::Unknown);
    }

    let base = trimmed.split(" WITH ").next().unwrap_or(trimmed).trim();
    classify_id(base)
}

fn classify_id(id: &str) -> LicenseRisk {
    let id = id
        .trim_end_matches("-only")
        .trim_end_matches("-or-later")
        .trim_end_matches('+');

    match id {
        "MIT" | "MIT-0" | "ISC" | "0BSD" | "BSD-2-Clause" | "BSD-3-Clause" | "Apache-2.0"
        | "Unlicense" | "CC0-1.0" | "Zlib" | "BSL-1.0" | "Python-2.0" => LicenseRisk::Permissive,

        "LGPL-2.0" | "LGPL-2.1" | "LGPL-3.0" | "MPL-2.0" | "EPL-1.0" | "EPL-2.0"
        | "CDDL-1.0" => LicenseRisk::WeakCopyleft,

        "GPL-2.0" | "GPL-3.0" | "AGPL-3.0" => LicenseRisk::StrongCopyleft,

        _ => LicenseRisk::Unknown,
    }
}
