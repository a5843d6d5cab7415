//! Signature phrases of the licenses [`PhraseOracle`](super::oracle::PhraseOracle)
//! knows about.
//!
//! Phrases are written in lower case with punctuation dropped; matching is
//! case-insensitive and ignores anything between words that is not a letter
//! or digit. Titles and "how to apply" notices are the most reliable
//! signatures for the GNU family because their full texts cross-reference
//! each other.

pub struct Signature {
    pub name: &'static str,
    /// All elements should be present; each accepts any of its alternatives.
    pub elements: &'static [&'static [&'static str]],
    /// Any of these rules the license out entirely.
    pub excludes: &'static [&'static str],
}

const BSD_REDISTRIBUTION: &str = "redistribution and use in source and binary forms with or without modification are permitted provided that the following conditions are met";
const BSD_SOURCE: &str = "redistributions of source code must retain the above copyright notice";
const BSD_BINARY: &str = "redistributions in binary form must reproduce the above copyright notice";
const BSD_ENDORSE: &str = "endorse or promote products derived from this software";

pub const CATALOG: &[Signature] = &[
    Signature {
        name: "MIT",
        elements: &[
            &["permission is hereby granted free of charge to any person obtaining a copy"],
            &["the above copyright notice and this permission notice shall be included in all copies or substantial portions of the software"],
            &["the software is provided as is without warranty of any kind"],
        ],
        excludes: &[],
    },
    Signature {
        name: "ISC",
        elements: &[
            &["permission to use copy modify"],
            &["distribute this software for any purpose with or without fee is hereby granted"],
            &["the software is provided as is and the author disclaims all warranties"],
        ],
        excludes: &[],
    },
    Signature {
        name: "BSD-2-Clause",
        elements: &[
            &[BSD_REDISTRIBUTION],
            &[BSD_SOURCE],
            &[BSD_BINARY],
            &["this software is provided by the copyright holders and contributors as is"],
        ],
        excludes: &[BSD_ENDORSE],
    },
    Signature {
        name: "BSD-3-Clause",
        elements: &[&[BSD_REDISTRIBUTION], &[BSD_SOURCE], &[BSD_BINARY], &[BSD_ENDORSE]],
        excludes: &[],
    },
    Signature {
        name: "Apache-2.0",
        elements: &[
            &["apache license"],
            &["version 2.0"],
            &["www.apache.org/licenses"],
        ],
        excludes: &[],
    },
    Signature {
        name: "GPL-2.0",
        elements: &[
            &[
                "gnu general public license version 2 june 1991",
                "terms of the gnu general public license as published by the free software foundation either version 2 of the license",
            ],
            &["free software foundation"],
        ],
        excludes: &[],
    },
    Signature {
        name: "GPL-3.0",
        elements: &[
            &[
                "gnu general public license version 3 29 june 2007",
                "terms of the gnu general public license as published by the free software foundation either version 3 of the license",
            ],
            &["free software foundation"],
        ],
        excludes: &[],
    },
    Signature {
        name: "LGPL-2.1",
        elements: &[
            &[
                "gnu lesser general public license version 2.1 february 1999",
                "terms of the gnu lesser general public license as published by the free software foundation either version 2.1 of the license",
            ],
            &["free software foundation"],
        ],
        excludes: &[],
    },
    Signature {
        name: "LGPL-3.0",
        elements: &[
            &[
                "gnu lesser general public license version 3 29 june 2007",
                "terms of the gnu lesser general public license as published by the free software foundation either version 3 of the license",
            ],
            &["free software foundation"],
        ],
        excludes: &[],
    },
    Signature {
        name: "AGPL-3.0",
        elements: &[
            &[
                "gnu affero general public license version 3 19 november 2007",
                "terms of the gnu affero general public license as published by the free software foundation either version 3 of the license",
            ],
            &["free software foundation"],
        ],
        excludes: &[],
    },
    Signature {
        name: "MPL-2.0",
        elements: &[
            &["mozilla public license version 2.0", "mozilla public license v 2.0"],
            &["mozilla.org/mpl/2.0"],
        ],
        excludes: &[],
    },
    Signature {
        name: "EPL-2.0",
        elements: &[
            &["eclipse public license v 2.0", "eclipse public license version 2.0"],
            &["eclipse.org/legal/epl-2.0"],
        ],
        excludes: &[],
    },
    Signature {
        name: "Unlicense",
        elements: &[
            &["this is free and unencumbered software released into the public domain"],
            &["unlicense.org"],
        ],
        excludes: &[],
    },
    Signature {
        name: "CC0-1.0",
        elements: &[&["creative commons legal code"], &["cc0 1.0 universal"]],
        excludes: &[],
    },
    Signature {
        name: "Zlib",
        elements: &[
            &["this software is provided as is without any express or implied warranty"],
            &["the origin of this software must not be misrepresented"],
            &["altered source versions must be plainly marked as such"],
        ],
        excludes: &[],
    },
];
