/// Derives a URL slug from a CMS title.
///
/// German umlauts are transliterated, French/Italian accents are folded to
/// ASCII and every other run of characters outside `[a-z0-9]` collapses into
/// one `-`.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_dash = false;

    for ch in title.chars().flat_map(char::to_lowercase) {
        let folded = fold_char(ch);
        let replacement = match folded {
            Some(ascii) => ascii,
            None if ch.is_ascii_alphanumeric() => {
                push_with_dash(&mut out, &mut pending_dash, ch.encode_utf8(&mut [0; 4]));
                continue;
            }
            None => {
                pending_dash = true;
                continue;
            }
        };
        push_with_dash(&mut out, &mut pending_dash, replacement);
    }

    out
}

fn push_with_dash(out: &mut String, pending_dash: &mut bool, piece: &str) {
    if *pending_dash && !out.is_empty() {
        out.push('-');
    }
    *pending_dash = false;
    out.push_str(piece);
}

fn fold_char(ch: char) -> Option<&'static str> {
    let folded = match ch {
        'ä' | 'æ' => "ae",
        'ö' | 'œ' => "oe",
        'ü' => "ue",
        'ß' => "ss",
        'à' | 'á' | 'â' | 'ã' | 'å' => "a",
        'ç' => "c",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'ñ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ø' => "o",
        'ù' | 'ú' | 'û' => "u",
        'ý' | 'ÿ' => "y",
        _ => return None,
    };
    Some(folded)
}
