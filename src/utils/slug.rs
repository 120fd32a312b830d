//! URL slugs for company pages.

fn transliterate(c: char) -> Option<&'static str> {
    let latin = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "yo",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "sch",
        'ъ' => "",
        'ы' => "y",
        'ь' => "",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        _ => return None,
    };
    Some(latin)
}

/// Lowercases, transliterates Cyrillic, and collapses everything outside `[a-z0-9]` into single dashes.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.chars().flat_map(char::to_lowercase) {
        let piece: String = match transliterate(c) {
            Some(latin) => latin.to_string(),
            None if c.is_ascii_alphanumeric() => c.to_string(),
            None => {
                pending_dash = true;
                continue;
            }
        };
        if piece.is_empty() {
            continue;
        }
        if pending_dash && !out.is_empty() {
            out.push('-');
        }
        pending_dash = false;
        out.push_str(&piece);
    }

    out
}

/// Slug that stays unique because it carries the row id.
pub fn company_slug(name: &str, id: i32) -> String {
    let base = slugify(name);
    if base.is_empty() {
        format!("company-{}", id)
    } else {
        format!("{}-{}", base, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transliterates_cyrillic() {
        assert_eq!(slugify("Яндекс"), "yandeks");
        assert_eq!(slugify("Сбер Банк"), "sber-bank");
        assert_eq!(slugify("Щука и Ёж"), "schuka-i-yozh");
    }

    #[test]
    fn collapses_and_trims_separators() {
        assert_eq!(slugify("  Acme,  Inc.  "), "acme-inc");
        assert_eq!(slugify("--Foo__Bar--"), "foo-bar");
        assert_eq!(slugify("Объект №1"), "obekt-1");
    }

    #[test]
    fn company_slug_appends_id() {
        assert_eq!(company_slug("Тинькофф", 42), "tinkoff-42");
        assert_eq!(company_slug("!!!", 7), "company-7");
    }
}
