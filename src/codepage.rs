//! # Code-Page Table
//!
//! A table file stores character data in a single-byte code page, identified
//! by a tag byte at header offset 29. This module maps the tag byte, the
//! human-facing page number and the translator for every supported page:
//!
//! | Tag  | Page  | Name                      |
//! |------|-------|---------------------------|
//! | 0x01 | 437   | US MS-DOS                 |
//! | 0x02 | 850   | International MS-DOS      |
//! | 0x03 | 1252  | Windows ANSI              |
//! | 0x04 | 10000 | Standard Macintosh        |
//! | 0x64 | 852   | Eastern European MS-DOS   |
//! | 0x65 | 866   | Russian MS-DOS            |
//! | 0x66 | 865   | Nordic MS-DOS             |
//! | 0x7D | 1255  | Hebrew Windows            |
//! | 0x7E | 1256  | Arabic Windows            |
//! | 0x96 | 10007 | Russian Macintosh         |
//! | 0xC8 | 1250  | Eastern European Windows  |
//! | 0xC9 | 1251  | Russian Windows           |
//! | 0xCA | 1254  | Turkish Windows           |
//! | 0xCB | 1253  | Greek Windows             |
//!
//! Page 0 means "unset": character fields pass through untranslated. Pages
//! outside the table are treated as unknown, and installing one is a no-op so
//! that legacy files declaring unsupported pages stay readable.
//!
//! The Windows and Macintosh pages ride on `encoding_rs`; the DOS OEM pages
//! are not in the WHATWG set, so those use the `oem_cp` tables behind plain
//! function pointers.

use encoding_rs::Encoding;
use eyre::Result;

use crate::error::Error;

/// Single-byte translator between raw field bytes and Unicode strings.
#[derive(Clone, Copy)]
pub(crate) enum Translator {
    /// WHATWG single-byte encoding (Windows and Macintosh pages).
    Ansi(&'static Encoding),
    /// DOS OEM page backed by static decode/encode tables.
    Oem {
        decode: fn(&[u8]) -> String,
        encode: fn(&str) -> Option<Vec<u8>>,
    },
}

impl Translator {
    /// Decodes raw field bytes. Bytes without a mapping are an error.
    pub(crate) fn decode(&self, raw: &[u8]) -> Result<String> {
        match self {
            Translator::Ansi(enc) => {
                let (text, had_errors) = enc.decode_without_bom_handling(raw);
                if had_errors {
                    return Err(Error::Translate {
                        value: String::from_utf8_lossy(raw).into_owned(),
                    }
                    .into());
                }
                Ok(text.into_owned())
            }
            Translator::Oem { decode, .. } => Ok(decode(raw)),
        }
    }

    /// Encodes a string into the page. Unmappable characters are an error.
    pub(crate) fn encode(&self, text: &str) -> Result<Vec<u8>> {
        let unmappable = || Error::Translate {
            value: text.to_owned(),
        };
        match self {
            Translator::Ansi(enc) => {
                let (bytes, _, had_errors) = enc.encode(text);
                if had_errors {
                    return Err(unmappable().into());
                }
                Ok(bytes.into_owned())
            }
            Translator::Oem { encode, .. } => encode(text).ok_or_else(|| unmappable().into()),
        }
    }
}

struct CodePage {
    code: u8,
    page: u32,
    translator: Translator,
}

fn decode_cp437(raw: &[u8]) -> String {
    oem_cp::decode_string_complete_table(raw, &oem_cp::code_table::DECODING_TABLE_CP437)
}

fn encode_cp437(text: &str) -> Option<Vec<u8>> {
    oem_cp::encode_string_checked(text, &oem_cp::code_table::ENCODING_TABLE_CP437)
}

fn decode_cp850(raw: &[u8]) -> String {
    oem_cp::decode_string_complete_table(raw, &oem_cp::code_table::DECODING_TABLE_CP850)
}

fn encode_cp850(text: &str) -> Option<Vec<u8>> {
    oem_cp::encode_string_checked(text, &oem_cp::code_table::ENCODING_TABLE_CP850)
}

fn decode_cp852(raw: &[u8]) -> String {
    oem_cp::decode_string_complete_table(raw, &oem_cp::code_table::DECODING_TABLE_CP852)
}

fn encode_cp852(text: &str) -> Option<Vec<u8>> {
    oem_cp::encode_string_checked(text, &oem_cp::code_table::ENCODING_TABLE_CP852)
}

fn decode_cp865(raw: &[u8]) -> String {
    oem_cp::decode_string_complete_table(raw, &oem_cp::code_table::DECODING_TABLE_CP865)
}

fn encode_cp865(text: &str) -> Option<Vec<u8>> {
    oem_cp::encode_string_checked(text, &oem_cp::code_table::ENCODING_TABLE_CP865)
}

static CODE_PAGES: &[CodePage] = &[
    CodePage {
        code: 0x01,
        page: 437,
        translator: Translator::Oem {
            decode: decode_cp437,
            encode: encode_cp437,
        },
    },
    CodePage {
        code: 0x02,
        page: 850,
        translator: Translator::Oem {
            decode: decode_cp850,
            encode: encode_cp850,
        },
    },
    CodePage {
        code: 0x03,
        page: 1252,
        translator: Translator::Ansi(&encoding_rs::WINDOWS_1252_INIT),
    },
    CodePage {
        code: 0x04,
        page: 10000,
        translator: Translator::Ansi(&encoding_rs::MACINTOSH_INIT),
    },
    CodePage {
        code: 0x64,
        page: 852,
        translator: Translator::Oem {
            decode: decode_cp852,
            encode: encode_cp852,
        },
    },
    CodePage {
        code: 0x65,
        page: 866,
        translator: Translator::Ansi(&encoding_rs::IBM866_INIT),
    },
    CodePage {
        code: 0x66,
        page: 865,
        translator: Translator::Oem {
            decode: decode_cp865,
            encode: encode_cp865,
        },
    },
    CodePage {
        code: 0x7D,
        page: 1255,
        translator: Translator::Ansi(&encoding_rs::WINDOWS_1255_INIT),
    },
    CodePage {
        code: 0x7E,
        page: 1256,
        translator: Translator::Ansi(&encoding_rs::WINDOWS_1256_INIT),
    },
    CodePage {
        code: 0x96,
        page: 10007,
        translator: Translator::Ansi(&encoding_rs::X_MAC_CYRILLIC_INIT),
    },
    CodePage {
        code: 0xC8,
        page: 1250,
        translator: Translator::Ansi(&encoding_rs::WINDOWS_1250_INIT),
    },
    CodePage {
        code: 0xC9,
        page: 1251,
        translator: Translator::Ansi(&encoding_rs::WINDOWS_1251_INIT),
    },
    CodePage {
        code: 0xCA,
        page: 1254,
        translator: Translator::Ansi(&encoding_rs::WINDOWS_1254_INIT),
    },
    CodePage {
        code: 0xCB,
        page: 1253,
        translator: Translator::Ansi(&encoding_rs::WINDOWS_1253_INIT),
    },
];

/// Returns the translator for a page number, or `None` for unknown pages.
pub(crate) fn translator_by_page(page: u32) -> Option<&'static Translator> {
    CODE_PAGES
        .iter()
        .find(|cp| cp.page == page)
        .map(|cp| &cp.translator)
}

/// Returns the header tag byte for a page number, 0 if unknown.
pub(crate) fn code_by_page(page: u32) -> u8 {
    CODE_PAGES
        .iter()
        .find(|cp| cp.page == page)
        .map_or(0, |cp| cp.code)
}

/// Returns the page number for a header tag byte, 0 if unknown.
pub(crate) fn page_by_code(code: u8) -> u32 {
    CODE_PAGES
        .iter()
        .find(|cp| cp.code == code)
        .map_or(0, |cp| cp.page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_and_code_lookups_are_inverse() {
        for cp in CODE_PAGES {
            assert_eq!(code_by_page(cp.page), cp.code);
            assert_eq!(page_by_code(cp.code), cp.page);
        }
    }

    #[test]
    fn unknown_page_yields_zero_and_none() {
        assert_eq!(code_by_page(936), 0);
        assert_eq!(page_by_code(0x7B), 0);
        assert!(translator_by_page(936).is_none());
        assert!(translator_by_page(0).is_none());
    }

    #[test]
    fn cp866_round_trips_cyrillic() {
        let tr = translator_by_page(866).unwrap();
        let raw = tr.encode("Мышь").unwrap();
        assert_eq!(raw, [0x8C, 0xEB, 0xE8, 0xEC]);
        assert_eq!(tr.decode(&raw).unwrap(), "Мышь");
    }

    #[test]
    fn cp1252_round_trips_latin1_supplement() {
        let tr = translator_by_page(1252).unwrap();
        let raw = tr.encode("café").unwrap();
        assert_eq!(raw, [b'c', b'a', b'f', 0xE9]);
        assert_eq!(tr.decode(&raw).unwrap(), "café");
    }

    #[test]
    fn cp437_round_trips_box_drawing() {
        let tr = translator_by_page(437).unwrap();
        let raw = tr.encode("│").unwrap();
        assert_eq!(raw, [0xB3]);
        assert_eq!(tr.decode(&raw).unwrap(), "│");
    }

    #[test]
    fn unmappable_character_is_a_translate_error() {
        let tr = translator_by_page(866).unwrap();
        let err = tr.encode("漢").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::Translate { .. })
        ));
    }
}
