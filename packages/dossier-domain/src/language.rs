use whatlang::Lang;

/// Detects the query language as a web-search hint. Conservative: short or
/// ambiguous input returns `None` so the configured default applies.
pub fn detect_language(input: &str) -> Option<&'static str> {
	let letters = input.chars().filter(|ch| ch.is_alphabetic()).count();

	if letters < 12 {
		return None;
	}

	let info = whatlang::detect(input)?;

	if !info.is_reliable() {
		return None;
	}

	iso_639_1(info.lang())
}

fn iso_639_1(lang: Lang) -> Option<&'static str> {
	match lang {
		Lang::Dan => Some("da"),
		Lang::Deu => Some("de"),
		Lang::Eng => Some("en"),
		Lang::Fra => Some("fr"),
		Lang::Ita => Some("it"),
		Lang::Nld => Some("nl"),
		Lang::Pol => Some("pl"),
		Lang::Por => Some("pt"),
		Lang::Spa => Some("es"),
		Lang::Swe => Some("sv"),
		_ => None,
	}
}
