use annotate_snippets::{
	display_list::{DisplayList, FormatOptions},
	snippet::{Annotation, AnnotationType, Slice, Snippet, SourceAnnotation},
};
use std::fmt::Display;
use std::ops::Range;

/// Диапазон байт во входной строке.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct GlobalSpan(pub Range<usize>);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Spanned<T> {
	pub span: GlobalSpan,
	pub inner: T,
}

impl<T> Spanned<T> {
	pub fn new(t: T, span: GlobalSpan) -> Self {
		Spanned {
			span,
			inner: t,
		}
	}
}

/// Позиция символа по позиции байта. Позиции за концом строки прижимаются к её длине.
pub fn char_position(string: &str, byte_pos: usize) -> usize {
	string
		.char_indices()
		.take_while(|(index, _)| *index < byte_pos)
		.count()
}

impl<T: Display> Spanned<T> {
	/// Отчёт об ошибке с подчёркнутым местом во входной строке.
	pub fn error_snippet(&self, string: &str) -> String {
		let text = self.inner.to_string();
		let length = string.chars().count();
		let start = char_position(string, self.span.0.start).min(length);
		let end = char_position(string, self.span.0.end).min(length).max(start);
		let range = match (start, end) {
			(start, end) if start < end => Some((start, end)),
			(start, _) if start < length => Some((start, start + 1)),
			_ if length > 0 => Some((length - 1, length)),
			_ => None,
		};

		let snippet = Snippet {
			title: Some(Annotation {
				label: Some(&text),
				id: None,
				annotation_type: AnnotationType::Error,
			}),
			footer: vec![],
			slices: vec![
				Slice {
					source: string,
					line_start: 1,
					origin: None,
					fold: false,
					annotations: range.into_iter().map(|range| SourceAnnotation {
						label: "",
						annotation_type: AnnotationType::Error,
						range,
					}).collect(),
				},
			],
			opt: FormatOptions {
				color: false,
				..Default::default()
			},
		};
		DisplayList::from(snippet).to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn char_positions_count_multibyte_symbols_once() {
		let string = "∧ a b";
		assert_eq!(char_position(string, 0), 0);
		assert_eq!(char_position(string, "∧".len()), 1);
		assert_eq!(char_position(string, string.len()), 5);
	}

	#[test]
	fn snippet_contains_the_message() {
		let error = Spanned::new("unexpected `)`", GlobalSpan(4..5));
		let report = error.error_snippet("∧ a ) b");
		assert!(report.contains("unexpected `)`"));
	}
}
