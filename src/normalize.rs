use unicode_normalization::UnicodeNormalization;

/// Canonical lookup key for raw spreadsheet identifiers: trimmed, uppercased,
/// diacritics stripped (NFD decomposition, combining marks removed).
///
/// Every catalog map and every raw-cell comparison must go through this;
/// a lookup that bypasses it turns a valid row into a false mismatch.
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_uppercase()
}

fn is_combining_mark(c: char) -> bool {
    // Combining Diacritical Marks block covers everything NFD produces for
    // Latin script input; the supplements are included for completeness.
    matches!(c,
        '\u{0300}'..='\u{036F}'
        | '\u{1AB0}'..='\u{1AFF}'
        | '\u{1DC0}'..='\u{1DFF}'
        | '\u{20D0}'..='\u{20FF}'
        | '\u{FE20}'..='\u{FE2F}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trims_and_uppercases() {
        assert_eq!(normalize("  pr-100 "), "PR-100");
        assert_eq!(normalize("clave"), "CLAVE");
    }

    #[test]
    fn test_strips_diacritics() {
        assert_eq!(normalize("CLAVE DE ARTÍCULO"), "CLAVE DE ARTICULO");
        assert_eq!(normalize("Construcción"), "CONSTRUCCION");
        assert_eq!(normalize("Nómina José Peña"), "NOMINA JOSE PENA");
    }

    #[test]
    fn test_idempotent() {
        for s in ["  Árbol ", "PR-100", "ñ", "", "aBc dEf", "ÁÉÍÓÚü"] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_total_on_odd_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("123"), "123");
    }
}
